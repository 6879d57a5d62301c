//! [`Config`]-related definitions.

use std::{collections::HashMap, time};

use common::Currency;
use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::Deserialize;
use service::{domain::vehicle, infra::notifier::twilio};
use smart_default::SmartDefault;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: Server,

    /// Service configuration.
    pub service: Service,

    /// Postgres configuration.
    pub postgres: Postgres,

    /// Administrator access configuration.
    pub admin: Admin,

    /// Notifier configuration.
    pub notifier: Notifier,

    /// Log configuration.
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    /// Host to bind the server to.
    #[default("0.0.0.0".to_owned())]
    pub host: String,

    /// Port to bind the server to.
    #[default(8080)]
    pub port: u16,

    /// [CORS] configuration.
    ///
    /// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
    pub cors: Cors,
}

/// [CORS] configuration.
///
/// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Cors {
    /// List of allowed origins.
    #[default(vec!["*".to_owned()])]
    pub origins: Vec<String>,
}

/// Administrator access configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Admin {
    /// Key to be provided as a `Bearer` token by the administrator.
    ///
    /// Empty key disables administrator access at all.
    #[default(SecretString::from(String::new()))]
    #[serde(deserialize_with = "secret")]
    pub api_key: SecretString,
}

/// Deserializes a [`SecretString`] out of a plain string.
fn secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: serde::Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

/// Service configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Service {
    /// Parking slots configuration.
    pub slots: Slots,

    /// Release tokens configuration.
    pub tokens: Tokens,

    /// Release links configuration.
    pub links: Links,

    /// Billing configuration.
    pub billing: Billing,

    /// Service tasks configuration.
    pub tasks: Tasks,
}

impl From<Service> for service::Config {
    fn from(value: Service) -> Self {
        let Service {
            slots: _,
            tokens: Tokens { ttl },
            links: Links { base_url },
            billing:
                Billing {
                    currency,
                    floor,
                    default_rate,
                    rates,
                },
            tasks: Tasks {
                clean_expired_tokens,
            },
        } = value;

        Self {
            tariff: service::domain::Tariff {
                currency,
                floor,
                default_rate,
                rates: rates
                    .into_iter()
                    .map(|(category, rate)| (category.0, rate))
                    .collect(),
            },
            release_token_ttl: ttl,
            release_link_base: base_url,
            clean_expired_tokens: clean_expired_tokens.enabled.then_some(
                service::task::clean_expired_tokens::Config {
                    interval: clean_expired_tokens.interval,
                    retention: clean_expired_tokens.retention,
                },
            ),
        }
    }
}

/// Parking slots configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Slots {
    /// Number of slots in the parking lot.
    ///
    /// Slots are only ever added on startup, never removed.
    #[default(10)]
    pub count: u16,
}

/// Release tokens configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Tokens {
    /// Time-to-live of a minted release token.
    #[default(time::Duration::from_secs(2 * 60 * 60))]
    #[serde(with = "humantime_serde")]
    pub ttl: time::Duration,
}

/// Release links configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Links {
    /// Public base URL the release links are built upon.
    #[default("http://localhost:8080".to_owned())]
    pub base_url: String,
}

/// Billing configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Billing {
    /// Currency of all the rates.
    #[default(Currency::Inr)]
    pub currency: Currency,

    /// Minimum billed duration of a single parking.
    #[default(time::Duration::from_secs(15 * 60))]
    #[serde(with = "humantime_serde")]
    pub floor: time::Duration,

    /// Hourly rate of a vehicle category missing in the `rates`.
    #[default(Decimal::TEN)]
    pub default_rate: Decimal,

    /// Hourly rates per vehicle category.
    #[default(HashMap::from([
        (Category::new("2-wheeler"), Decimal::from(5)),
        (Category::new("4-wheeler"), Decimal::TEN),
        (Category::new("bicycle"), Decimal::TWO),
    ]))]
    pub rates: HashMap<Category, Decimal>,
}

/// Vehicle category as a key of the [`Billing::rates`].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Category(vehicle::Category);

impl Category {
    /// Creates a new [`Category`] out of a well-known valid `category`.
    fn new(category: &str) -> Self {
        #[expect(unsafe_code, reason = "well-known valid categories")]
        let category = unsafe { vehicle::Category::new_unchecked(category) };
        Self(category)
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        vehicle::Category::new(raw.clone()).map(Self).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "`{raw}` is not a valid vehicle category",
            ))
        })
    }
}

/// Service tasks configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Tasks {
    /// `CleanExpiredTokens` task configuration.
    pub clean_expired_tokens: CleanExpiredTokens,
}

/// `CleanExpiredTokens` task configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct CleanExpiredTokens {
    /// Indicator whether the task should run at all.
    #[default(true)]
    pub enabled: bool,

    /// Task execution interval.
    #[default(time::Duration::from_secs(60 * 60))]
    #[serde(with = "humantime_serde")]
    pub interval: time::Duration,

    /// Period an expired release token is kept for.
    #[default(time::Duration::from_secs(7 * 24 * 60 * 60))]
    #[serde(with = "humantime_serde")]
    pub retention: time::Duration,
}

/// Notifier configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Notifier {
    /// Kind of the notifier to deliver notifications with.
    pub kind: NotifierKind,

    /// Twilio notifier configuration.
    pub twilio: Twilio,
}

/// Kind of a notifier.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    /// Notifications are written into the log only.
    #[default]
    Log,

    /// Notifications are delivered via Twilio.
    Twilio,
}

/// Twilio notifier configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Twilio {
    /// Base URL of the Twilio REST API.
    #[default("https://api.twilio.com".to_owned())]
    pub api_url: String,

    /// Twilio account SID.
    pub account_sid: String,

    /// Twilio account auth token.
    #[default(SecretString::from(String::new()))]
    #[serde(deserialize_with = "secret")]
    pub auth_token: SecretString,

    /// Phone number the messages are sent from.
    pub from: String,

    /// Channel to deliver messages through.
    pub channel: TwilioChannel,

    /// Country code prepended to the phone numbers without a `+` prefix.
    #[default("+91".to_owned())]
    pub default_country_code: String,

    /// Timeout of a single request to the Twilio REST API.
    #[default(time::Duration::from_secs(10))]
    #[serde(with = "humantime_serde")]
    pub timeout: time::Duration,
}

impl From<Twilio> for twilio::Config {
    fn from(value: Twilio) -> Self {
        let Twilio {
            api_url,
            account_sid,
            auth_token,
            from,
            channel,
            default_country_code,
            timeout,
        } = value;

        Self {
            api_url,
            account_sid,
            auth_token,
            from,
            channel: match channel {
                TwilioChannel::Sms => twilio::Channel::Sms,
                TwilioChannel::Whatsapp => twilio::Channel::WhatsApp,
            },
            default_country_code,
            timeout,
        }
    }
}

/// Channel Twilio delivers messages through.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TwilioChannel {
    /// Plain SMS.
    #[default]
    Sms,

    /// WhatsApp message.
    Whatsapp,
}

/// Postgres configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Postgres {
    /// Host to connect to.
    #[default("127.0.0.1".to_owned())]
    pub host: String,

    /// Port to connect to.
    #[default(5432)]
    pub port: u16,

    /// User to connect as.
    #[default("postgres".to_owned())]
    pub user: String,

    /// Password to connect with.
    #[default("postgres".to_owned())]
    pub password: String,

    /// Database name to connect to.
    #[default("postgres".to_owned())]
    pub dbname: String,
}

impl From<Postgres> for service::infra::postgres::Config {
    fn from(value: Postgres) -> Self {
        let Postgres {
            host,
            port,
            user,
            password,
            dbname,
        } = value;

        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            dbname: Some(dbname),
            ..Self::default()
        }
    }
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use config::{builder::DefaultState, ConfigBuilder, FileFormat};
    use rust_decimal::Decimal;
    use service::{domain::vehicle, infra::notifier::twilio};

    use super::{Config, NotifierKind, TwilioChannel};

    fn parse(toml: &str) -> Config {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn defaults_to_log_notifier_and_ten_slots() {
        let conf = parse("");

        assert_eq!(conf.service.slots.count, 10);
        assert_eq!(conf.notifier.kind, NotifierKind::Log);
        assert_eq!(conf.server.port, 8080);

        let service = service::Config::from(conf.service);
        assert_eq!(service.release_token_ttl, Duration::from_secs(2 * 3600));
        assert_eq!(service.tariff.floor, Duration::from_secs(15 * 60));
        assert!(service.clean_expired_tokens.is_some());
    }

    #[test]
    fn reads_billing_rates() {
        let conf = parse(
            r#"
            [service.billing]
            currency = "USD"
            floor = "30m"
            default_rate = 3
            rates = { "4-Wheeler" = "7.5", bicycle = 1 }

            [service.tasks.clean_expired_tokens]
            enabled = false
            "#,
        );

        let service = service::Config::from(conf.service);
        let tariff = &service.tariff;
        assert_eq!(tariff.currency, common::Currency::Usd);
        assert_eq!(tariff.floor, Duration::from_secs(30 * 60));
        assert_eq!(tariff.default_rate, Decimal::from(3));
        assert_eq!(
            tariff.rate(&vehicle::Category::new("4-wheeler").unwrap()).amount,
            Decimal::new(75, 1),
        );
        assert_eq!(tariff.rates.len(), 2);
        assert!(service.clean_expired_tokens.is_none());
    }

    #[test]
    fn reads_twilio_notifier() {
        let conf = parse(
            r#"
            [notifier]
            kind = "twilio"

            [notifier.twilio]
            account_sid = "AC123"
            from = "+14155238886"
            channel = "whatsapp"
            "#,
        );

        assert_eq!(conf.notifier.kind, NotifierKind::Twilio);
        assert_eq!(conf.notifier.twilio.channel, TwilioChannel::Whatsapp);
        let twilio = twilio::Config::from(conf.notifier.twilio);
        assert_eq!(twilio.account_sid, "AC123");
        assert_eq!(twilio.default_country_code, "+91");
    }
}
