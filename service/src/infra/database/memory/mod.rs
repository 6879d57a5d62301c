//! In-memory [`Database`] implementation.
//!
//! Transactions are serialized: a [`Tx`] holds the whole [`State`] exclusively
//! until it's committed or dropped, so row locks are no-ops here.

mod impls;

use std::{
    collections::{BTreeMap, HashMap},
    future::Future,
    sync::Arc,
};

use derive_more::{Deref, Display, Error as StdError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracerr::Traced;

use crate::{
    domain::{
        release_token, slot, user, vehicle, ReleaseToken, Slot, User, Vehicle,
    },
    infra::database,
};
#[cfg(doc)]
use crate::infra::Database;

/// In-memory [`Database`] client.
#[derive(Clone, Debug, Default, Deref)]
pub struct Memory<C = NonTx>(C);

impl Memory {
    /// Creates a new empty [`Memory`] database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the current committed [`State`] of this [`Memory`]
    /// database.
    pub async fn snapshot(&self) -> State {
        self.0.state.lock().await.clone()
    }
}

/// Contents of a [`Memory`] database.
#[derive(Clone, Debug, Default)]
pub struct State {
    /// Stored [`Slot`]s ordered by their IDs.
    pub slots: BTreeMap<slot::Id, Slot>,

    /// Stored [`User`]s.
    pub users: HashMap<user::Id, User>,

    /// Stored [`Vehicle`]s.
    pub vehicles: HashMap<vehicle::Id, Vehicle>,

    /// Stored [`ReleaseToken`]s.
    pub release_tokens: HashMap<release_token::Id, ReleaseToken>,
}

/// Access to the [`State`] of a [`Memory`] database.
pub trait Storage {
    /// Reads the [`State`] with the provided function.
    ///
    /// # Errors
    ///
    /// If the [`State`] is not accessible anymore.
    fn read<R>(
        &self,
        f: impl FnOnce(&State) -> R,
    ) -> impl Future<Output = Result<R, Traced<database::Error>>>;

    /// Modifies the [`State`] with the provided function.
    ///
    /// # Errors
    ///
    /// If the [`State`] is not accessible anymore.
    fn write<R>(
        &self,
        f: impl FnOnce(&mut State) -> R,
    ) -> impl Future<Output = Result<R, Traced<database::Error>>>;
}

/// Non-transactional [`Memory`] client.
///
/// Every operation is applied to the committed [`State`] immediately.
#[derive(Clone, Debug, Default)]
pub struct NonTx {
    /// Committed [`State`].
    state: Arc<Mutex<State>>,
}

impl Storage for NonTx {
    async fn read<R>(
        &self,
        f: impl FnOnce(&State) -> R,
    ) -> Result<R, Traced<database::Error>> {
        Ok(f(&*self.state.lock().await))
    }

    async fn write<R>(
        &self,
        f: impl FnOnce(&mut State) -> R,
    ) -> Result<R, Traced<database::Error>> {
        Ok(f(&mut *self.state.lock().await))
    }
}

/// Transactional [`Memory`] client.
///
/// Operations are applied to a private copy of the [`State`], which replaces
/// the committed one on [`Tx::commit()`]. Dropping the last clone of an
/// uncommitted [`Tx`] discards the copy.
#[derive(Clone, Debug)]
pub struct Tx {
    /// [`Staged`] changes, or [`None`] once committed.
    staged: Arc<Mutex<Option<Staged>>>,
}

/// Uncommitted changes of a [`Tx`].
#[derive(Debug)]
struct Staged {
    /// Exclusively held committed [`State`].
    committed: OwnedMutexGuard<State>,

    /// Private copy of the [`State`] being modified.
    state: State,
}

impl Tx {
    /// Starts a new [`Tx`] over the committed [`State`] of the provided
    /// [`NonTx`] client, waiting for the other [`Tx`]s to finish first.
    async fn begin(client: &NonTx) -> Self {
        let committed = Arc::clone(&client.state).lock_owned().await;
        let state = committed.clone();
        Self {
            staged: Arc::new(Mutex::new(Some(Staged { committed, state }))),
        }
    }

    /// Commits this [`Tx`].
    ///
    /// # Errors
    ///
    /// If this [`Tx`] is committed already.
    pub async fn commit(&self) -> Result<(), Traced<database::Error>> {
        let Staged {
            mut committed,
            state,
        } = self
            .staged
            .lock()
            .await
            .take()
            .ok_or_else(|| tracerr::new!(Error::Finished))
            .map_err(tracerr::map_from)?;
        *committed = state;
        Ok(())
    }
}

impl Storage for Tx {
    async fn read<R>(
        &self,
        f: impl FnOnce(&State) -> R,
    ) -> Result<R, Traced<database::Error>> {
        self.staged
            .lock()
            .await
            .as_ref()
            .map(|s| f(&s.state))
            .ok_or_else(|| tracerr::new!(Error::Finished))
            .map_err(tracerr::map_from)
    }

    async fn write<R>(
        &self,
        f: impl FnOnce(&mut State) -> R,
    ) -> Result<R, Traced<database::Error>> {
        self.staged
            .lock()
            .await
            .as_mut()
            .map(|s| f(&mut s.state))
            .ok_or_else(|| tracerr::new!(Error::Finished))
            .map_err(tracerr::map_from)
    }
}

/// [`Memory`] database error.
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// [`Tx`] is used after being committed.
    #[display("Transaction is finished already")]
    Finished,
}
