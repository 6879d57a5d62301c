//! [`CleanExpiredTokens`] [`Task`].

use std::{convert::Infallible, error::Error, time};

use common::operations::{By, Delete, Perform, Start};
use tokio::time::interval;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{release_token, ReleaseToken},
    infra::{database, Database},
    Service,
};

use super::Task;

/// Configuration for [`CleanExpiredTokens`] [`Task`].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Interval between [`ReleaseToken`]s cleaning.
    pub interval: time::Duration,

    /// Period an expired [`ReleaseToken`] is kept for after its expiration.
    pub retention: time::Duration,
}

/// [`Task`] for deleting long expired [`ReleaseToken`]s.
///
/// Expired [`ReleaseToken`]s are never redeemable regardless of this
/// [`Task`], it only reclaims the storage.
#[derive(Clone, Copy, Debug)]
pub struct CleanExpiredTokens<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<Db> Task<Start<By<CleanExpiredTokens<Self>, Config>>> for Service<Db>
where
    CleanExpiredTokens<Service<Db>>:
        Task<Perform<()>, Ok = u64, Err: Error> + Send + Sync + 'static,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<CleanExpiredTokens<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = CleanExpiredTokens {
            config,
            service: self.clone(),
        };

        let mut interval = interval(task.config.interval);
        loop {
            let _ = interval.tick().await;
            match task.execute(Perform(())).await {
                Ok(0) => {}
                Ok(n) => log::info!("Deleted {n} expired `ReleaseToken`s"),
                Err(e) => {
                    log::error!("`task::CleanExpiredTokens` failed: {e}");
                }
            }
        }
    }
}

impl<Db> Task<Perform<()>> for CleanExpiredTokens<Service<Db>>
where
    Db: Database<
        Delete<By<ReleaseToken, release_token::ExpirationDateTime>>,
        Ok = u64,
        Err = Traced<database::Error>,
    >,
{
    type Ok = u64;
    type Err = ExecutionError;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        let deadline =
            release_token::ExpirationDateTime::now() - self.config.retention;
        self.service
            .database()
            .execute(Delete(By::new(deadline)))
            .await
            .map_err(tracerr::map_from_and_wrap!())
    }
}

/// Error of [`CleanExpiredTokens`] execution.
pub type ExecutionError = Traced<database::Error>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{
        operations::{Insert, Perform},
        DateTime,
    };

    use crate::{
        domain::{release_token, slot, vehicle, ReleaseToken},
        infra::{Database as _, Memory},
        task::Task as _,
        testing::{config, service},
    };

    use super::{CleanExpiredTokens, Config};

    #[tokio::test]
    async fn deletes_tokens_expired_beyond_retention() {
        let (svc, _rx) = service(config(), Memory::new());
        let now = DateTime::now();
        let token = |expires_at: DateTime| ReleaseToken {
            id: release_token::Id::new(),
            vehicle_id: vehicle::Id::new(),
            slot_id: slot::Id::new(1).unwrap(),
            created_at: (expires_at - Duration::from_secs(60)).coerce(),
            expires_at: expires_at.coerce(),
            used: false,
        };
        let stale = token(now - Duration::from_secs(2 * 3600));
        let recent = token(now - Duration::from_secs(60));
        let active = token(now + Duration::from_secs(60));
        for t in [stale, recent, active] {
            svc.database().execute(Insert(t)).await.unwrap();
        }

        let deleted = CleanExpiredTokens {
            config: Config {
                interval: Duration::from_secs(60),
                retention: Duration::from_secs(3600),
            },
            service: svc.clone(),
        }
        .execute(Perform(()))
        .await
        .unwrap();

        assert_eq!(deleted, 1);
        let tokens = svc.database().snapshot().await.release_tokens;
        assert!(!tokens.contains_key(&stale.id));
        assert!(tokens.contains_key(&recent.id));
        assert!(tokens.contains_key(&active.id));
    }
}
