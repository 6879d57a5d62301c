//! [`Notifier`]-related implementations.

mod log;
#[cfg(feature = "twilio")]
pub mod twilio;

#[cfg(doc)]
use crate::domain::Notification;

pub use self::log::Log;
#[cfg(feature = "twilio")]
pub use self::twilio::Twilio;

/// Delivery of [`Notification`]s to their recipients.
pub use common::Handler as Notifier;
