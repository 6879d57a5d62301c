//! GraphQL API definitions.

pub mod bill;
mod mutation;
mod query;
pub mod release_token;
pub mod scalar;
pub mod slot;
pub mod user;
pub mod vehicle;

use crate::define_error;

pub use self::{
    bill::Bill, mutation::Mutation, query::Query,
    release_token::ReleaseToken, slot::Slot, user::User, vehicle::Vehicle,
};

/// GraphQL schema.
pub type Schema = juniper::RootNode<
    'static,
    Query,
    Mutation,
    juniper::EmptySubscription<crate::Context>,
>;

/// Creates a new [`Schema`].
#[must_use]
pub fn schema() -> Schema {
    Schema::new(Query, Mutation, juniper::EmptySubscription::new())
}

define_error! {
    enum SlotError {
        #[code = "SLOT_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Slot` with the specified ID does not exist"]
        NotExists,

        #[code = "SLOT_ALREADY_FREE"]
        #[status = CONFLICT]
        #[message = "`Slot` is not occupied by any `Vehicle`"]
        AlreadyFree,

        #[code = "SLOT_ALREADY_OCCUPIED"]
        #[status = CONFLICT]
        #[message = "`Slot` is occupied by another `Vehicle`"]
        AlreadyOccupied,

        #[code = "NO_VACANCY"]
        #[status = CONFLICT]
        #[message = "There is no vacant `Slot` in the parking lot"]
        NoVacancy,
    }
}

define_error! {
    enum VehicleError {
        #[code = "VEHICLE_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Vehicle` with the specified ID does not exist"]
        NotExists,

        #[code = "ALREADY_PARKED"]
        #[status = CONFLICT]
        #[message = "`Vehicle` is parked already"]
        AlreadyParked,

        #[code = "NOT_PARKED"]
        #[status = CONFLICT]
        #[message = "`Vehicle` is not parked"]
        NotParked,
    }
}

define_error! {
    enum UserError {
        #[code = "USER_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`User` with the specified ID does not exist"]
        NotExists,
    }
}

define_error! {
    enum TokenError {
        #[code = "TOKEN_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "Release link is invalid"]
        NotExists,

        #[code = "TOKEN_EXPIRED"]
        #[status = GONE]
        #[message = "Release link is expired"]
        Expired,

        #[code = "TOKEN_ALREADY_USED"]
        #[status = CONFLICT]
        #[message = "Release link is used already"]
        AlreadyUsed,
    }
}
