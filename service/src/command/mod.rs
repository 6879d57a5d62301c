//! [`Command`] definition.

pub mod ensure_slots;
pub mod mint_release_token;
pub mod occupy_slot;
pub mod park_vehicle;
pub mod redeem_release_token;
pub mod register;
pub mod register_user;
pub mod register_vehicle;
pub mod release_slot;
pub mod release_vehicle;
pub mod remove_vehicle;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    ensure_slots::EnsureSlots, mint_release_token::MintReleaseToken,
    occupy_slot::OccupySlot, park_vehicle::ParkVehicle,
    redeem_release_token::RedeemReleaseToken,
    register::Register, register_user::RegisterUser,
    register_vehicle::RegisterVehicle, release_slot::ReleaseSlot,
    release_vehicle::{InvariantViolation, ReleaseVehicle},
    remove_vehicle::RemoveVehicle,
};
