//! Domain definitions.

pub mod billing;
pub mod notification;
pub mod release_token;
pub mod slot;
pub mod user;
pub mod vehicle;

pub use self::{
    billing::{Bill, Tariff},
    notification::Notification,
    release_token::ReleaseToken,
    slot::Slot,
    user::User,
    vehicle::Vehicle,
};
