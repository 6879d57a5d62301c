//! [`Bill`]-related definitions.

use common::{DateTime, Money};
use derive_more::From;
use juniper::graphql_object;
use service::{command, domain};

use crate::{api, release, Context};

/// Fee charged for a single parking of a `Vehicle`.
#[derive(Clone, Debug, From)]
pub struct Bill(domain::Bill);

/// Fee charged for a single parking of a `Vehicle`.
#[graphql_object(context = Context)]
impl Bill {
    /// ID of the billed `Vehicle`.
    pub fn vehicle_id(&self) -> api::vehicle::Id {
        self.0.vehicle_id.into()
    }

    /// ID of the `Slot` the `Vehicle` was parked in.
    pub fn slot_id(&self) -> api::slot::Id {
        self.0.slot_id.into()
    }

    /// Category of the billed `Vehicle`.
    pub fn category(&self) -> api::vehicle::Category {
        self.0.category.clone().into()
    }

    /// `DateTime` when the `Vehicle` entered the `Slot`.
    pub fn entered_at(&self) -> DateTime {
        self.0.entered_at.coerce()
    }

    /// `DateTime` when the `Vehicle` left the `Slot`.
    pub fn exited_at(&self) -> DateTime {
        self.0.exited_at.coerce()
    }

    /// Number of started minutes the fee is charged for.
    ///
    /// Never less than the minimal billed duration of the parking lot.
    pub fn billed_minutes(&self) -> i32 {
        i32::try_from(release::minutes(self.0.billed_duration))
            .unwrap_or(i32::MAX)
    }

    /// Hourly rate applied.
    pub fn rate(&self) -> Money {
        self.0.rate
    }

    /// Charged amount.
    pub fn amount(&self) -> Money {
        self.0.amount
    }
}

/// `Vehicle` parked into a `Slot`.
#[derive(Clone, Debug, From)]
pub struct Parked(command::park_vehicle::Parked);

/// `Vehicle` parked into a `Slot`.
#[graphql_object(context = Context)]
impl Parked {
    /// The parked `Vehicle`.
    pub fn vehicle(&self) -> api::Vehicle {
        self.0.vehicle.clone().into()
    }

    /// ID of the `Slot` the `Vehicle` occupies.
    pub fn slot_id(&self) -> api::slot::Id {
        self.0.slot_id.into()
    }

    /// `ReleaseToken` the driver was notified with.
    pub fn release_token(&self) -> api::ReleaseToken {
        self.0.token.into()
    }
}

/// `User` registered with a `Vehicle` parked right away.
#[derive(Clone, Debug, From)]
pub struct Registered(command::register::Registered);

/// `User` registered with a `Vehicle` parked right away.
#[graphql_object(context = Context)]
impl Registered {
    /// The registered `User`.
    pub fn user(&self) -> api::User {
        self.0.user.clone().into()
    }

    /// The registered and parked `Vehicle`.
    pub fn parked(&self) -> Parked {
        self.0.parked.clone().into()
    }
}
