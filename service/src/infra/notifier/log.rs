//! [`Log`] [`Notifier`] implementation.

use std::convert::Infallible;

use tracing as log;

use crate::{domain::Notification, infra::Notifier};

/// [`Notifier`] writing [`Notification`]s into the log instead of delivering
/// them.
#[derive(Clone, Copy, Debug, Default)]
pub struct Log;

impl Notifier<Notification> for Log {
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        notification: Notification,
    ) -> Result<Self::Ok, Self::Err> {
        log::info!(
            phone = %notification.phone,
            vehicle_id = %notification.vehicle_id,
            slot_id = %notification.slot_id,
            "{}",
            notification.text(),
        );
        Ok(())
    }
}
