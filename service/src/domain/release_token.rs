//! [`ReleaseToken`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::{Slot, Vehicle};
use crate::domain::{slot, vehicle};

/// Single-use capability to release a parked [`Vehicle`] from its [`Slot`]
/// without any other authorization.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ReleaseToken {
    /// ID of this [`ReleaseToken`].
    ///
    /// Random and unguessable, as knowing it is enough to release the
    /// [`Vehicle`].
    pub id: Id,

    /// ID of the [`Vehicle`] this [`ReleaseToken`] releases.
    pub vehicle_id: vehicle::Id,

    /// ID of the [`Slot`] this [`ReleaseToken`] releases.
    pub slot_id: slot::Id,

    /// [`DateTime`] when this [`ReleaseToken`] was minted.
    pub created_at: CreationDateTime,

    /// [`DateTime`] after which this [`ReleaseToken`] is not redeemable.
    pub expires_at: ExpirationDateTime,

    /// Indicator whether this [`ReleaseToken`] has been used already.
    ///
    /// Once set, never unset.
    pub used: bool,
}

impl ReleaseToken {
    /// Indicates whether this [`ReleaseToken`] is expired at the provided
    /// moment.
    #[must_use]
    pub fn is_expired_at(&self, now: ExpirationDateTime) -> bool {
        self.expires_at < now
    }

    /// Indicates whether this [`ReleaseToken`] is expired at the moment.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(ExpirationDateTime::now())
    }

    /// Indicates whether this [`ReleaseToken`] can be redeemed at the moment.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.check_redeemable().is_ok()
    }

    /// Checks whether this [`ReleaseToken`] can be redeemed at the moment.
    ///
    /// Expiration is reported even if this [`ReleaseToken`] is used already.
    ///
    /// # Errors
    ///
    /// With the reason this [`ReleaseToken`] cannot be redeemed.
    pub fn check_redeemable(&self) -> Result<(), Unredeemable> {
        if self.is_expired() {
            Err(Unredeemable::Expired)
        } else if self.used {
            Err(Unredeemable::AlreadyUsed)
        } else {
            Ok(())
        }
    }
}

/// Reason a [`ReleaseToken`] cannot be redeemed.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Unredeemable {
    /// [`ReleaseToken`] is past its [`ReleaseToken::expires_at`].
    #[display("expired")]
    Expired,

    /// [`ReleaseToken`] has been used already.
    #[display("already used")]
    AlreadyUsed,
}

/// ID of a [`ReleaseToken`].
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// [`DateTime`] when a [`ReleaseToken`] was minted.
pub type CreationDateTime = DateTimeOf<(ReleaseToken, unit::Creation)>;

/// [`DateTime`] when a [`ReleaseToken`] expires.
pub type ExpirationDateTime = DateTimeOf<(ReleaseToken, unit::Expiration)>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;

    use crate::domain::{slot, vehicle};

    use super::{Id, ReleaseToken, Unredeemable};

    fn token(expires_in: Duration, used: bool) -> ReleaseToken {
        let now = DateTime::now();
        ReleaseToken {
            id: Id::new(),
            vehicle_id: vehicle::Id::new(),
            slot_id: slot::Id::new(1).unwrap(),
            created_at: now.coerce(),
            expires_at: (now + expires_in).coerce(),
            used,
        }
    }

    fn expired(used: bool) -> ReleaseToken {
        let t = token(Duration::ZERO, used);
        ReleaseToken {
            expires_at: t.expires_at - Duration::from_secs(1),
            ..t
        }
    }

    #[test]
    fn expires_right_after_its_deadline() {
        let t = token(Duration::from_secs(60), false);

        assert!(!t.is_expired_at(t.expires_at - Duration::from_secs(1)));
        assert!(!t.is_expired_at(t.expires_at));
        assert!(t.is_expired_at(t.expires_at + Duration::from_micros(1)));
        assert!(t.is_expired_at(t.expires_at + Duration::from_secs(1)));
    }

    #[test]
    fn is_active_only_when_unused_and_unexpired() {
        assert!(token(Duration::from_secs(60), false).is_active());
        assert!(!token(Duration::from_secs(60), true).is_active());
        assert!(!expired(false).is_active());
    }

    #[test]
    fn reports_expiration_first() {
        assert_eq!(
            expired(true).check_redeemable(),
            Err(Unredeemable::Expired),
        );
        assert_eq!(
            token(Duration::from_secs(60), true).check_redeemable(),
            Err(Unredeemable::AlreadyUsed),
        );
        assert_eq!(
            token(Duration::from_secs(60), false).check_redeemable(),
            Ok(()),
        );
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(Id::new(), Id::new());
    }
}
