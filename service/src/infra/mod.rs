//! Infrastructure layer.

pub mod database;
pub mod notifier;

#[cfg(any(test, feature = "memory"))]
pub use self::database::{memory, Memory};
pub use self::{database::Database, notifier::Notifier};
#[cfg(feature = "postgres")]
pub use self::database::{postgres, Postgres};
