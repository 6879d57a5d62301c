//! Background [`Task`]s definitions.

mod background;
pub mod clean_expired_tokens;
pub mod dispatch_notifications;

pub use common::Handler as Task;

pub use self::{
    background::Background, clean_expired_tokens::CleanExpiredTokens,
    dispatch_notifications::DispatchNotifications,
};
