//! Background environment for running [`Task`]s.

use std::{
    error::Error,
    future::{Future, IntoFuture},
    iter,
};

use derive_more::{Display, Error as StdError};
use futures::{
    future::{self, LocalBoxFuture},
    FutureExt as _, TryFutureExt as _,
};
use tokio::task;
use tracing as log;

#[cfg(doc)]
use crate::Task;

/// Type-erased error of a [`Task`].
type BoxError = Box<dyn Error + 'static>;

/// Background environment for running [`Task`]s of a [`Service`].
///
/// All the [`Task`]s run on the same thread, and the whole [`Background`]
/// fails as soon as any of them fails.
///
/// [`Service`]: crate::Service
#[derive(Debug, Default)]
pub struct Background {
    /// Local set of tasks.
    set: task::LocalSet,

    /// Names and handles of the spawned tasks.
    handles: Vec<(&'static str, task::JoinHandle<Result<(), BoxError>>)>,
}

impl Background {
    /// Spawns a new [`Task`] with the provided `name` inside this
    /// [`Background`] environment.
    pub fn spawn<F, E>(&mut self, name: &'static str, future: F)
    where
        F: Future<Output = Result<(), E>> + 'static,
        E: Error + 'static,
    {
        log::debug!("spawning `{name}` background task");
        let handle = self
            .set
            .spawn_local(future.map_err(BoxError::from));
        self.handles.push((name, handle));
    }

    /// Returns the number of [`Task`]s spawned in this [`Background`].
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Indicates whether no [`Task`]s were spawned in this [`Background`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl IntoFuture for Background {
    type Output = Result<(), BoxError>;
    type IntoFuture = LocalBoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        let Self { set, handles } = self;
        let tasks = handles.into_iter().map(|(name, handle)| {
            handle
                .map(move |res| {
                    let source = match res {
                        Ok(Ok(())) => {
                            log::debug!("`{name}` background task finished");
                            return Ok(());
                        }
                        Ok(Err(e)) => e,
                        Err(e) => BoxError::from(e),
                    };
                    log::error!("`{name}` background task failed: {source}");
                    Err(BoxError::from(Failed {
                        name,
                        error: source,
                    }))
                })
                .boxed_local()
        });
        let set = set.map(Ok).boxed_local();
        future::try_join_all(iter::once(set).chain(tasks))
            .map_ok(drop)
            .boxed_local()
    }
}

/// Failure of a named background [`Task`].
#[derive(Debug, Display, StdError)]
#[display("`{name}` task failed: {error}")]
struct Failed {
    /// Name the failed [`Task`] was spawned with.
    name: &'static str,

    /// Error the [`Task`] failed with.
    #[error(not(source))]
    error: BoxError,
}

#[cfg(test)]
mod spec {
    use std::{fmt, future::IntoFuture as _};

    use super::Background;

    #[derive(Debug)]
    struct Boom;

    impl fmt::Display for Boom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "boom")
        }
    }

    impl std::error::Error for Boom {}

    #[tokio::test]
    async fn completes_once_all_tasks_finish() {
        let mut bg = Background::default();
        bg.spawn("first", async { Ok::<_, Boom>(()) });
        bg.spawn("second", async { Ok::<_, Boom>(()) });

        assert_eq!(bg.len(), 2);
        assert!(bg.into_future().await.is_ok());
    }

    #[tokio::test]
    async fn fails_with_name_of_failed_task() {
        let mut bg = Background::default();
        bg.spawn("sweeper", async { Err::<(), _>(Boom) });

        let err = bg.into_future().await.unwrap_err();

        assert_eq!(err.to_string(), "`sweeper` task failed: boom");
    }

    #[tokio::test]
    async fn completes_right_away_when_empty() {
        let bg = Background::default();

        assert!(bg.is_empty());
        assert!(bg.into_future().await.is_ok());
    }
}
