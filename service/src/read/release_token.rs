//! [`ReleaseToken`] read model definition.

#[cfg(doc)]
use crate::domain::{ReleaseToken, Slot, Vehicle};
use crate::domain::{release_token, slot, vehicle};

/// Selector of the outstanding [`ReleaseToken`] of a [`Vehicle`] parked in
/// a [`Slot`].
///
/// A [`ReleaseToken`] is outstanding while it's neither used nor expired.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Outstanding {
    /// ID of the [`Vehicle`] the [`ReleaseToken`] releases.
    pub vehicle_id: vehicle::Id,

    /// ID of the [`Slot`] the [`ReleaseToken`] releases.
    pub slot_id: slot::Id,
}

/// Preview of what redeeming a [`ReleaseToken`] would release.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Preview {
    /// ID of the previewed [`ReleaseToken`].
    pub token_id: release_token::Id,

    /// ID of the [`Vehicle`] to be released.
    pub vehicle_id: vehicle::Id,

    /// ID of the [`Slot`] to be freed.
    pub slot_id: slot::Id,

    /// Moment the [`ReleaseToken`] stops being redeemable.
    pub expires_at: release_token::ExpirationDateTime,
}
