//! [`Query`] collection related to the multiple [`Slot`]s.

use common::operations::By;

#[cfg(doc)]
use crate::Query;
use crate::{domain::Slot, read};

use super::DatabaseQuery;

/// Queries a list of [`Slot`]s ordered by their IDs.
pub type List = DatabaseQuery<By<Vec<Slot>, read::slot::list::Filter>>;
