//! [Twilio] [`Notifier`] implementation.
//!
//! [Twilio]: https://www.twilio.com/docs/messaging/api/message-resource

use std::time::Duration;

use derive_more::{Display, Error as StdError, From};
use reqwest::Client;
use secrecy::{ExposeSecret as _, SecretString};
use smart_default::SmartDefault;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{user, Notification},
    infra::Notifier,
};

/// Configuration of the [`Twilio`] [`Notifier`].
#[derive(Clone, Debug, SmartDefault)]
pub struct Config {
    /// Base URL of the Twilio REST API.
    #[default("https://api.twilio.com".into())]
    pub api_url: String,

    /// Twilio account SID.
    pub account_sid: String,

    /// Twilio account auth token.
    #[default(SecretString::from(String::new()))]
    pub auth_token: SecretString,

    /// Phone number the messages are sent from.
    pub from: String,

    /// [`Channel`] to deliver messages through.
    pub channel: Channel,

    /// Country code prepended to the phone numbers missing a `+` prefix.
    #[default("+91".into())]
    pub default_country_code: String,

    /// Timeout of a single request to the Twilio REST API.
    #[default(Duration::from_secs(10))]
    pub timeout: Duration,
}

/// Channel [`Twilio`] delivers messages through.
#[derive(Clone, Copy, Debug, Default, Display, Eq, PartialEq)]
pub enum Channel {
    /// Plain SMS.
    #[default]
    #[display("SMS")]
    Sms,

    /// WhatsApp message.
    #[display("WhatsApp")]
    WhatsApp,
}

impl Channel {
    /// Returns the address of the provided phone `number` in this
    /// [`Channel`].
    fn address(self, number: &str) -> String {
        match self {
            Self::Sms => number.to_owned(),
            Self::WhatsApp if number.starts_with("whatsapp:") => {
                number.to_owned()
            }
            Self::WhatsApp => format!("whatsapp:{number}"),
        }
    }
}

/// [`Notifier`] sending [`Notification`]s via [Twilio] Messages API.
///
/// [Twilio]: https://www.twilio.com/docs/messaging/api/message-resource
#[derive(Clone, Debug)]
pub struct Twilio {
    /// HTTP client to call the Twilio REST API with.
    client: Client,

    /// [`Config`] of this [`Twilio`] [`Notifier`].
    config: Config,
}

impl Twilio {
    /// Creates a new [`Twilio`] [`Notifier`] with the provided [`Config`].
    ///
    /// # Errors
    ///
    /// If failed to build the HTTP client.
    pub fn new(config: Config) -> Result<Self, Traced<Error>> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(tracerr::from_and_wrap!())?;
        Ok(Self { client, config })
    }

    /// Returns the address to deliver a message to the provided
    /// [`user::Phone`].
    fn recipient(&self, phone: &user::Phone) -> String {
        let digits = phone.digits();
        let number = if phone.is_international() {
            digits
        } else {
            format!("{}{digits}", self.config.default_country_code)
        };
        self.config.channel.address(&number)
    }

    /// Returns the address the messages are sent from.
    fn sender(&self) -> String {
        self.config.channel.address(&self.config.from)
    }

    /// Returns the URL of the Messages resource of the configured account.
    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_url.trim_end_matches('/'),
            self.config.account_sid,
        )
    }
}

impl Notifier<Notification> for Twilio {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        notification: Notification,
    ) -> Result<Self::Ok, Self::Err> {
        let to = self.recipient(&notification.phone);
        let from = self.sender();
        let body = notification.text();

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(
                &self.config.account_sid,
                Some(self.config.auth_token.expose_secret()),
            )
            .form(&[("To", to.as_str()), ("From", &from), ("Body", &body)])
            .send()
            .await
            .map_err(tracerr::from_and_wrap!())?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(tracerr::new!(Error::Rejected {
                status: status.as_u16(),
                body,
            }));
        }

        log::info!(
            "{} about `Vehicle(id: {})` sent to {to}",
            self.config.channel,
            notification.vehicle_id,
        );
        Ok(())
    }
}

/// Error of [`Twilio`] [`Notifier`].
#[derive(Debug, Display, StdError, From)]
pub enum Error {
    /// HTTP request to the Twilio REST API failed.
    #[display("Twilio request failed: {_0}")]
    #[from]
    Request(reqwest::Error),

    /// Twilio REST API rejected the message.
    #[display("Twilio rejected the message with `{status}` status: {body}")]
    Rejected {
        /// HTTP status of the response.
        status: u16,

        /// Body of the response.
        body: String,
    },
}

#[cfg(test)]
mod spec {
    use crate::domain::user;

    use super::{Channel, Config, Twilio};

    fn twilio(channel: Channel) -> Twilio {
        Twilio::new(Config {
            account_sid: "AC123".into(),
            from: "+14155238886".into(),
            channel,
            ..Config::default()
        })
        .unwrap()
    }

    #[test]
    fn prefixes_local_numbers_with_country_code() {
        let sms = twilio(Channel::Sms);

        assert_eq!(
            sms.recipient(&user::Phone::new("987 654 3210").unwrap()),
            "+919876543210",
        );
        assert_eq!(
            sms.recipient(&user::Phone::new("+1 415 523 8886").unwrap()),
            "+14155238886",
        );
    }

    #[test]
    fn addresses_whatsapp() {
        let wa = twilio(Channel::WhatsApp);

        assert_eq!(
            wa.recipient(&user::Phone::new("9876543210").unwrap()),
            "whatsapp:+919876543210",
        );
        assert_eq!(wa.sender(), "whatsapp:+14155238886");
        assert_eq!(twilio(Channel::Sms).sender(), "+14155238886");
    }

    #[test]
    fn builds_messages_url() {
        assert_eq!(
            twilio(Channel::Sms).messages_url(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json",
        );
    }
}
