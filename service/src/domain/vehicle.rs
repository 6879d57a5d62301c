//! [`Vehicle`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::{Slot, User};
use crate::domain::{slot, user};

/// Vehicle registered by a [`User`].
#[derive(Clone, Debug)]
pub struct Vehicle {
    /// ID of this [`Vehicle`].
    pub id: Id,

    /// [`LicensePlate`] of this [`Vehicle`].
    pub license_plate: LicensePlate,

    /// ID of the [`User`] owning this [`Vehicle`].
    pub user_id: user::Id,

    /// [`Category`] of this [`Vehicle`] the parking rate depends on.
    pub category: Category,

    /// [`user::Phone`] to notify about this [`Vehicle`] parking.
    pub phone: user::Phone,

    /// [`Parking`] of this [`Vehicle`], if it's parked at the moment.
    pub parking: Option<Parking>,

    /// [`DateTime`] when this [`Vehicle`] was registered.
    pub created_at: CreationDateTime,
}

impl Vehicle {
    /// Returns ID of the [`Slot`] this [`Vehicle`] is parked in, if any.
    #[must_use]
    pub fn slot_id(&self) -> Option<slot::Id> {
        self.parking.map(|p| p.slot_id)
    }
}

/// Parking of a [`Vehicle`] in a [`Slot`].
///
/// A [`Vehicle`] either has both the [`Slot`] and the entry time, or none of
/// them.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Parking {
    /// ID of the [`Slot`] the [`Vehicle`] occupies.
    pub slot_id: slot::Id,

    /// [`DateTime`] when the [`Vehicle`] entered the [`Slot`].
    pub entered_at: EntryDateTime,
}

/// ID of a [`Vehicle`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
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

/// License plate of a [`Vehicle`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct LicensePlate(String);

impl LicensePlate {
    /// Creates a new [`LicensePlate`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `plate` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(plate: impl Into<String>) -> Self {
        Self(plate.into())
    }

    /// Creates a new [`LicensePlate`] if the given `plate` is valid.
    ///
    /// The `plate` is upper-cased, so `ka01ab1234` and `KA01AB1234` are the
    /// same [`LicensePlate`].
    #[must_use]
    pub fn new(plate: impl Into<String>) -> Option<Self> {
        let plate = plate.into().to_uppercase();
        Self::check(&plate).then_some(Self(plate))
    }

    /// Checks whether the given `plate` is a valid [`LicensePlate`].
    fn check(plate: impl AsRef<str>) -> bool {
        let plate = plate.as_ref();
        plate.trim() == plate
            && !plate.is_empty()
            && plate.len() <= 16
            && plate
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '-')
    }
}

impl FromStr for LicensePlate {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `LicensePlate`")
    }
}

/// Category of a [`Vehicle`] (`2-wheeler`, `4-wheeler`, `bicycle`, etc).
///
/// The set of categories is open: any category missing from the rate table
/// is billed by the default rate.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Category(String);

impl Category {
    /// Creates a new [`Category`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `category` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(category: impl Into<String>) -> Self {
        Self(category.into())
    }

    /// Creates a new [`Category`] if the given `category` is valid.
    ///
    /// The `category` is lower-cased.
    #[must_use]
    pub fn new(category: impl Into<String>) -> Option<Self> {
        let category = category.into().to_lowercase();
        Self::check(&category).then_some(Self(category))
    }

    /// Checks whether the given `category` is a valid [`Category`].
    fn check(category: impl AsRef<str>) -> bool {
        let category = category.as_ref();
        category.trim() == category
            && !category.is_empty()
            && category.len() <= 32
    }
}

impl FromStr for Category {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Category`")
    }
}

/// [`DateTime`] when a [`Vehicle`] was registered.
pub type CreationDateTime = DateTimeOf<(Vehicle, unit::Creation)>;

/// [`DateTime`] when a [`Vehicle`] entered a [`Slot`].
pub type EntryDateTime = DateTimeOf<(Vehicle, unit::Entry)>;

/// [`DateTime`] when a [`Vehicle`] left a [`Slot`].
pub type ExitDateTime = DateTimeOf<(Vehicle, unit::Exit)>;

#[cfg(test)]
mod spec {
    use super::{Category, LicensePlate};

    #[test]
    fn normalizes_license_plate() {
        assert_eq!(
            AsRef::<str>::as_ref(&LicensePlate::new("ka01ab1234").unwrap()),
            "KA01AB1234",
        );
        assert!(LicensePlate::new("KA 01 AB 1234").is_some());
        assert!(LicensePlate::new("").is_none());
        assert!(LicensePlate::new(" KA01").is_none());
        assert!(LicensePlate::new("KA#01").is_none());
    }

    #[test]
    fn normalizes_category() {
        assert_eq!(Category::new("4-Wheeler"), Category::new("4-wheeler"));
        assert!(Category::new("").is_none());
        assert!(Category::new("bicycle ").is_none());
    }
}
