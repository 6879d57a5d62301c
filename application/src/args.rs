//! [`Args`] definitions.

use clap::Parser;

/// Parking-slot reservation server.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to the configuration file.
    #[arg(short, long, env = "CONF_PATH", default_value = "config.toml")]
    pub config: String,

    /// Only migrates the database and seeds the parking slots, without
    /// serving any requests.
    #[arg(long)]
    pub migrate_only: bool,
}

impl Args {
    /// Parses command line arguments.
    ///
    /// # Errors
    ///
    /// Errors if failed to parse command line arguments.
    pub fn parse() -> Result<Self, clap::Error> {
        <Self as Parser>::try_parse()
    }
}

#[cfg(test)]
mod spec {
    use clap::Parser as _;

    use super::Args;

    #[test]
    fn parses_flags() {
        let args = Args::try_parse_from([
            "parking",
            "-c",
            "prod.toml",
            "--migrate-only",
        ])
        .unwrap();

        assert_eq!(args.config, "prod.toml");
        assert!(args.migrate_only);
    }
}
