//! Service contains the business logic of the application.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod infra;
pub mod query;
pub mod read;
pub mod task;

use std::{error::Error, time};

use common::operations::{By, Start};
use tokio::sync::mpsc;
use tracing as log;

#[cfg(doc)]
use infra::Database;

use self::{
    domain::{release_token, Notification, ReleaseToken, Tariff, Vehicle},
    infra::Notifier,
};

pub use self::{command::Command, query::Query, task::Task};

/// [`Service`] configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// [`Tariff`] to bill parkings by.
    pub tariff: Tariff,

    /// Default time-to-live of a minted [`ReleaseToken`].
    pub release_token_ttl: time::Duration,

    /// Base URL of the links sent in [`Notification`]s.
    ///
    /// A [`ReleaseToken`] link is `{release_link_base}/release/{token_id}`.
    pub release_link_base: String,

    /// [`task::CleanExpiredTokens`] configuration, if it should run at all.
    pub clean_expired_tokens: Option<task::clean_expired_tokens::Config>,
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    database: Db,

    /// Outbox of [`Notification`]s to be delivered by the
    /// [`task::DispatchNotifications`].
    notifications: mpsc::UnboundedSender<Notification>,
}

impl<Db> Service<Db> {
    /// Creates a new [`Service`] with the provided parameters.
    ///
    /// [`Notification`]s are delivered via the provided [`Notifier`] by the
    /// returned [`task::Background`].
    pub fn new<N>(
        config: Config,
        database: Db,
        notifier: N,
    ) -> (Self, task::Background)
    where
        Self: Task<
                Start<
                    By<
                        task::CleanExpiredTokens<Self>,
                        task::clean_expired_tokens::Config,
                    >,
                >,
                Ok = (),
                Err: Error,
            > + Clone
            + 'static,
        task::DispatchNotifications<N>: Task<
                Start<mpsc::UnboundedReceiver<Notification>>,
                Ok = (),
                Err: Error,
            > + 'static,
        N: Notifier<Notification>,
    {
        let (notifications, outbox) = mpsc::unbounded_channel();
        let this = Service {
            config,
            database,
            notifications,
        };

        let mut bg = task::Background::default();
        let dispatcher = task::DispatchNotifications::new(notifier);
        bg.spawn("dispatch_notifications", async move {
            dispatcher.execute(Start(outbox)).await
        });
        if let Some(cfg) = this.config().clean_expired_tokens {
            let svc = this.clone();
            bg.spawn("clean_expired_tokens", async move {
                svc.execute(Start(By::new(cfg))).await
            });
        }

        (this, bg)
    }

    /// Returns [`Config`] of this [`Service`].
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }

    /// Returns the link to redeem the [`ReleaseToken`] with the provided ID.
    #[must_use]
    pub fn release_link(&self, token_id: release_token::Id) -> String {
        format!(
            "{}/release/{token_id}",
            self.config.release_link_base.trim_end_matches('/'),
        )
    }

    /// Emits a [`Notification`] about the provided [`ReleaseToken`] to the
    /// owner of the provided [`Vehicle`].
    fn notify(&self, vehicle: &Vehicle, token: &ReleaseToken) {
        let notification = Notification {
            phone: vehicle.phone.clone(),
            vehicle_id: vehicle.id,
            category: vehicle.category.clone(),
            slot_id: token.slot_id,
            link: self.release_link(token.id),
        };
        if self.notifications.send(notification).is_err() {
            log::warn!(
                "`Notification` about `Vehicle(id: {})` is dropped: \
                 `task::DispatchNotifications` is stopped",
                vehicle.id,
            );
        }
    }
}

#[cfg(test)]
mod testing {
    //! Fixtures for testing [`Command`]s against the [`Memory`] database.

    use std::{collections::HashMap, time::Duration};

    use common::Currency;
    use rust_decimal::Decimal;
    use tokio::sync::mpsc;

    use crate::{
        command::{
            park_vehicle::Parked, EnsureSlots, ParkVehicle, RegisterUser,
            RegisterVehicle,
        },
        domain::{slot, user, vehicle, Notification, Tariff, Vehicle},
        infra::Memory,
        Command as _, Config, Service,
    };

    /// [`Config`] billing `car`s by 50/h, `bike`s by 20/h and anything else
    /// by 10/h, with 15 minutes floor.
    pub(crate) fn config() -> Config {
        let rate = |category: &str, per_hour: i64| {
            (
                vehicle::Category::new(category).unwrap(),
                Decimal::from(per_hour),
            )
        };
        Config {
            tariff: Tariff {
                currency: Currency::Inr,
                floor: Duration::from_secs(15 * 60),
                default_rate: Decimal::from(10),
                rates: HashMap::from([rate("car", 50), rate("bike", 20)]),
            },
            release_token_ttl: Duration::from_secs(2 * 3600),
            release_link_base: "https://parking.test/".into(),
            clean_expired_tokens: None,
        }
    }

    /// Creates a [`Service`] with no background [`Task`]s, returning the
    /// receiving side of its [`Notification`]s.
    ///
    /// [`Task`]: crate::Task
    pub(crate) fn service(
        config: Config,
        database: Memory,
    ) -> (Service<Memory>, mpsc::UnboundedReceiver<Notification>) {
        let (notifications, rx) = mpsc::unbounded_channel();
        let svc = Service {
            config,
            database,
            notifications,
        };
        (svc, rx)
    }

    /// Creates a [`Service`] over a parking lot of the provided number of
    /// [`Slot`]s.
    ///
    /// [`Slot`]: crate::domain::Slot
    pub(crate) async fn lot_with(
        config: Config,
        slots: u16,
    ) -> (Service<Memory>, mpsc::UnboundedReceiver<Notification>) {
        let (svc, rx) = service(config, Memory::new());
        svc.execute(EnsureSlots {
            count: slot::PoolSize::from(slots),
        })
        .await
        .unwrap();
        (svc, rx)
    }

    /// Same as [`lot_with()`], but with the default [`config()`].
    pub(crate) async fn lot(
        slots: u16,
    ) -> (Service<Memory>, mpsc::UnboundedReceiver<Notification>) {
        lot_with(config(), slots).await
    }

    /// Registers a new [`Vehicle`] of the provided `category` owned by a new
    /// [`User`].
    ///
    /// [`User`]: crate::domain::User
    pub(crate) async fn vehicle_in(
        svc: &Service<Memory>,
        category: &str,
    ) -> Vehicle {
        let owner = svc
            .execute(RegisterUser {
                name: user::Name::new("Owner").unwrap(),
                phone: user::Phone::new("987 654 3210").unwrap(),
            })
            .await
            .unwrap();
        let plate = format!("KA01{}", &vehicle::Id::new().to_string()[..8]);
        svc.execute(RegisterVehicle {
            user_id: owner.id,
            license_plate: vehicle::LicensePlate::new(plate).unwrap(),
            category: vehicle::Category::new(category).unwrap(),
            phone: None,
        })
        .await
        .unwrap()
    }

    /// Parks the [`Vehicle`] with the provided ID.
    pub(crate) async fn park(
        svc: &Service<Memory>,
        vehicle_id: vehicle::Id,
    ) -> Parked {
        svc.execute(ParkVehicle { vehicle_id }).await.unwrap()
    }
}
