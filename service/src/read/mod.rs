//! Read entities definitions.

pub mod release_token;
pub mod slot;
