//! [`Slot`] definitions.

use std::str::FromStr;

use derive_more::{Display, From, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};

use crate::domain::vehicle;
#[cfg(doc)]
use crate::domain::Vehicle;

/// Physical parking slot.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Slot {
    /// ID of this [`Slot`].
    pub id: Id,

    /// ID of the [`Vehicle`] occupying this [`Slot`], if any.
    pub vehicle_id: Option<vehicle::Id>,
}

impl Slot {
    /// Creates a new vacant [`Slot`] with the provided [`Id`].
    #[must_use]
    pub const fn vacant(id: Id) -> Self {
        Self {
            id,
            vehicle_id: None,
        }
    }

    /// Indicates whether this [`Slot`] is occupied by some [`Vehicle`].
    #[must_use]
    pub const fn is_occupied(&self) -> bool {
        self.vehicle_id.is_some()
    }
}

/// ID of a [`Slot`].
///
/// Always positive, and stable for the whole life of the parking lot.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    Eq,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(i32);

impl Id {
    /// Creates a new [`Id`] if the given `id` is positive.
    #[must_use]
    pub const fn new(id: i32) -> Option<Self> {
        if id > 0 {
            Some(Self(id))
        } else {
            None
        }
    }
}

impl FromStr for Id {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse()
            .ok()
            .and_then(Self::new)
            .ok_or("invalid `slot::Id`")
    }
}

/// Number of [`Slot`]s in the parking lot.
#[derive(Clone, Copy, Debug, Display, Eq, From, Into, PartialEq)]
pub struct PoolSize(u16);

impl PoolSize {
    /// Returns [`Id`]s of all the [`Slot`]s in a pool of this size, in
    /// ascending order.
    pub fn ids(self) -> impl Iterator<Item = Id> {
        (1..=i32::from(self.0)).map(Id)
    }
}

#[cfg(test)]
mod spec {
    use super::{Id, PoolSize, Slot};

    #[test]
    fn id_is_positive() {
        assert!(Id::new(1).is_some());
        assert!(Id::new(0).is_none());
        assert!(Id::new(-3).is_none());

        assert_eq!("7".parse::<Id>(), Ok(Id::new(7).unwrap()));
        assert!("0".parse::<Id>().is_err());
        assert!("seven".parse::<Id>().is_err());
    }

    #[test]
    fn pool_ids_are_ascending_from_one() {
        let ids = PoolSize::from(3).ids().map(i32::from).collect::<Vec<_>>();

        assert_eq!(ids, [1, 2, 3]);
        assert_eq!(PoolSize::from(0).ids().count(), 0);
    }

    #[test]
    fn vacant_slot_is_not_occupied() {
        assert!(!Slot::vacant(Id::new(1).unwrap()).is_occupied());
    }
}
