//! [`Slot`] read model definition.
//!
//! [`Slot`]: crate::domain::Slot

pub mod list {
    //! [`Slot`]s list definitions.

    use crate::domain::Slot;

    /// Filter of a [`Slot`]s list.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub enum Filter {
        /// All the [`Slot`]s.
        #[default]
        All,

        /// Only the [`Slot`]s occupied by some vehicle.
        Occupied,

        /// Only the vacant [`Slot`]s.
        Vacant,
    }

    impl Filter {
        /// Checks whether the provided [`Slot`] passes this [`Filter`].
        #[must_use]
        pub const fn matches(self, slot: &Slot) -> bool {
            match self {
                Self::All => true,
                Self::Occupied => slot.is_occupied(),
                Self::Vacant => !slot.is_occupied(),
            }
        }
    }
}
