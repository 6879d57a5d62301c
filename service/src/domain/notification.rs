//! [`Notification`] definitions.

#[cfg(doc)]
use crate::domain::{ReleaseToken, Slot, User, Vehicle};
use crate::domain::{slot, user, vehicle};

/// Outbound message telling a [`User`] where their [`Vehicle`] is parked and
/// how to release it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notification {
    /// [`user::Phone`] to deliver this [`Notification`] to.
    pub phone: user::Phone,

    /// ID of the parked [`Vehicle`].
    pub vehicle_id: vehicle::Id,

    /// [`vehicle::Category`] of the parked [`Vehicle`].
    pub category: vehicle::Category,

    /// ID of the [`Slot`] the [`Vehicle`] is parked in.
    pub slot_id: slot::Id,

    /// Link redeeming the [`ReleaseToken`] of the parking.
    pub link: String,
}

impl Notification {
    /// Renders the text of this [`Notification`].
    #[must_use]
    pub fn text(&self) -> String {
        let Self {
            category,
            slot_id,
            link,
            ..
        } = self;
        format!(
            "Smart Parking: your {category} is parked in slot {slot_id}.\n\
             To free your slot, open:\n{link}",
        )
    }
}
