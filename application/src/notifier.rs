//! [`Notifier`] definitions.

use derive_more::{Display, Error, From};
use service::{
    domain::Notification,
    infra::{
        notifier::{twilio, Log, Twilio},
        Notifier as _,
    },
};
use tracerr::Traced;

use crate::config;

/// [`service::infra::Notifier`] chosen by the configuration.
#[derive(Clone, Debug, From)]
pub enum Notifier {
    /// Notifications are written into the log only.
    Log(Log),

    /// Notifications are delivered via Twilio.
    Twilio(Twilio),
}

impl Notifier {
    /// Creates a new [`Notifier`] out of the provided [`config::Notifier`].
    ///
    /// # Errors
    ///
    /// If failed to initialize the [`Twilio`] client.
    pub fn new(conf: config::Notifier) -> Result<Self, Traced<twilio::Error>> {
        Ok(match conf.kind {
            config::NotifierKind::Log => Log.into(),
            config::NotifierKind::Twilio => Twilio::new(conf.twilio.into())
                .map_err(tracerr::wrap!())?
                .into(),
        })
    }
}

impl service::infra::Notifier<Notification> for Notifier {
    type Ok = ();
    type Err = DeliveryError;

    async fn execute(
        &self,
        notification: Notification,
    ) -> Result<Self::Ok, Self::Err> {
        match self {
            Self::Log(log) => match log.execute(notification).await {
                Ok(()) => Ok(()),
                Err(never) => match never {},
            },
            Self::Twilio(twilio) => {
                twilio.execute(notification).await.map_err(Into::into)
            }
        }
    }
}

/// Error of a [`Notification`] delivery.
#[derive(Debug, Display, Error, From)]
pub enum DeliveryError {
    /// [`Twilio`] failed to deliver.
    #[display("`Twilio` failed to deliver: {_0}")]
    Twilio(Traced<twilio::Error>),
}

#[cfg(test)]
mod spec {
    use crate::config;

    use super::Notifier;

    #[test]
    fn picks_configured_kind() {
        let log = Notifier::new(config::Notifier::default()).unwrap();
        assert!(matches!(log, Notifier::Log(_)));

        let twilio = Notifier::new(config::Notifier {
            kind: config::NotifierKind::Twilio,
            ..config::Notifier::default()
        })
        .unwrap();
        assert!(matches!(twilio, Notifier::Twilio(_)));
    }
}
