//! [`DispatchNotifications`] [`Task`].

use std::{convert::Infallible, fmt};

use common::operations::{Perform, Start};
use tokio::sync::mpsc;
use tracing as log;

use crate::{domain::Notification, infra::Notifier};

use super::Task;

/// [`Task`] for delivering [`Notification`]s emitted by the [`Service`] via
/// a [`Notifier`].
///
/// Delivery failures are logged and never reach the emitter.
///
/// [`Service`]: crate::Service
#[derive(Clone, Copy, Debug)]
pub struct DispatchNotifications<N> {
    /// [`Notifier`] delivering [`Notification`]s.
    notifier: N,
}

impl<N> DispatchNotifications<N> {
    /// Creates a new [`DispatchNotifications`] [`Task`] delivering via the
    /// provided [`Notifier`].
    #[must_use]
    pub const fn new(notifier: N) -> Self {
        Self { notifier }
    }
}

impl<N> Task<Start<mpsc::UnboundedReceiver<Notification>>>
    for DispatchNotifications<N>
where
    Self: Task<Perform<Notification>, Ok = (), Err = Infallible>,
{
    type Ok = ();
    type Err = Infallible;

    /// Delivers [`Notification`]s until all their senders are dropped.
    async fn execute(
        &self,
        Start(mut rx): Start<mpsc::UnboundedReceiver<Notification>>,
    ) -> Result<Self::Ok, Self::Err> {
        while let Some(notification) = rx.recv().await {
            self.execute(Perform(notification)).await?;
        }
        log::debug!("`task::DispatchNotifications` stopped");
        Ok(())
    }
}

impl<N> Task<Perform<Notification>> for DispatchNotifications<N>
where
    N: Notifier<Notification, Err: fmt::Display>,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Perform(notification): Perform<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        let vehicle_id = notification.vehicle_id;
        let slot_id = notification.slot_id;
        match self.notifier.execute(notification).await {
            Ok(_) => log::info!(
                "Notified about `Vehicle(id: {vehicle_id})` parked in \
                 `Slot(id: {slot_id})`",
            ),
            Err(e) => log::error!(
                "`task::DispatchNotifications` failed to notify about \
                 `Vehicle(id: {vehicle_id})`: {e}",
            ),
        }
        Ok(())
    }
}

#[cfg(test)]
mod spec {
    use std::{
        cell::RefCell,
        convert::Infallible,
        sync::{Arc, Mutex},
    };

    use common::operations::Start;
    use tokio::sync::mpsc;

    use crate::{
        domain::{slot, user, vehicle, Notification},
        infra::Notifier,
        task::Task as _,
    };

    use super::DispatchNotifications;

    #[derive(Clone, Debug, Default)]
    struct Recording(Arc<Mutex<Vec<Notification>>>);

    impl Notifier<Notification> for Recording {
        type Ok = ();
        type Err = Infallible;

        async fn execute(&self, n: Notification) -> Result<(), Infallible> {
            self.0.lock().unwrap().push(n);
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct Failing(RefCell<usize>);

    impl Notifier<Notification> for Failing {
        type Ok = ();
        type Err = &'static str;

        async fn execute(&self, _: Notification) -> Result<(), &'static str> {
            *self.0.borrow_mut() += 1;
            Err("gateway is down")
        }
    }

    fn notification(slot: i32) -> Notification {
        Notification {
            phone: user::Phone::new("987 654 3210").unwrap(),
            vehicle_id: vehicle::Id::new(),
            category: vehicle::Category::new("car").unwrap(),
            slot_id: slot::Id::new(slot).unwrap(),
            link: format!("https://parking.test/release/{slot}"),
        }
    }

    #[tokio::test]
    async fn delivers_in_order_until_closed() {
        let recording = Recording::default();
        let (tx, rx) = mpsc::unbounded_channel();
        let sent = [notification(1), notification(2)];
        for n in &sent {
            tx.send(n.clone()).unwrap();
        }
        drop(tx);

        DispatchNotifications::new(recording.clone())
            .execute(Start(rx))
            .await
            .unwrap();

        assert_eq!(*recording.0.lock().unwrap(), sent);
    }

    #[tokio::test]
    async fn survives_delivery_failures() {
        let task = DispatchNotifications::new(Failing::default());
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(notification(1)).unwrap();
        tx.send(notification(2)).unwrap();
        drop(tx);

        task.execute(Start(rx)).await.unwrap();

        assert_eq!(*task.notifier.0.borrow(), 2);
    }
}
