//! [`Command`] for minting a [`ReleaseToken`].

use std::time::Duration;

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{release_token, slot, vehicle, ReleaseToken, Vehicle},
    infra::{database, Database},
    read::release_token::Outstanding,
    Service,
};

use super::Command;

/// [`Command`] for minting a [`ReleaseToken`] of the [`Slot`] a [`Vehicle`]
/// is parked in, and sending its link to the [`Vehicle`]'s owner.
///
/// An outstanding [`ReleaseToken`] of the same [`Vehicle`] and [`Slot`] is
/// returned instead of minting a new one.
///
/// [`Slot`]: crate::domain::Slot
#[derive(Clone, Copy, Debug)]
pub struct MintReleaseToken {
    /// ID of the parked [`Vehicle`].
    pub vehicle_id: vehicle::Id,

    /// Time-to-live of a new [`ReleaseToken`].
    ///
    /// [`Config::release_token_ttl`] is used if [`None`].
    ///
    /// [`Config::release_token_ttl`]: crate::Config::release_token_ttl
    pub ttl: Option<Duration>,
}

impl<Db> Command<MintReleaseToken> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Vehicle, vehicle::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Vehicle>, vehicle::Id>>,
            Ok = Option<Vehicle>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<ReleaseToken>, Outstanding>>,
            Ok = Option<ReleaseToken>,
            Err = Traced<database::Error>,
        > + Database<Insert<ReleaseToken>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = ReleaseToken;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: MintReleaseToken,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let MintReleaseToken { vehicle_id, ttl } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Serializes concurrent minting for the same `Vehicle`.
        tx.execute(Lock(By::<Vehicle, _>::new(vehicle_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let vehicle = tx
            .execute(Select(By::<Option<Vehicle>, _>::new(vehicle_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::VehicleNotExists(vehicle_id))
            .map_err(tracerr::wrap!())?;
        let slot_id = vehicle
            .slot_id()
            .ok_or(E::NotParked(vehicle_id))
            .map_err(tracerr::wrap!())?;

        let token = mint_in(
            &tx,
            vehicle_id,
            slot_id,
            ttl.unwrap_or(self.config().release_token_ttl),
        )
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        self.notify(&vehicle, &token);

        Ok(token)
    }
}

/// Returns the outstanding [`ReleaseToken`] of the provided [`Vehicle`] and
/// [`Slot`], or stores a new one living for the provided `ttl`, inside the
/// provided transaction.
///
/// The [`Vehicle`] is expected to be locked already.
///
/// # Errors
///
/// If any [`Database`] operation fails.
///
/// [`Slot`]: crate::domain::Slot
pub(crate) async fn mint_in<Tx>(
    tx: &Tx,
    vehicle_id: vehicle::Id,
    slot_id: slot::Id,
    ttl: Duration,
) -> Result<ReleaseToken, Traced<database::Error>>
where
    Tx: Database<
            Select<By<Option<ReleaseToken>, Outstanding>>,
            Ok = Option<ReleaseToken>,
            Err = Traced<database::Error>,
        > + Database<Insert<ReleaseToken>, Err = Traced<database::Error>>,
{
    let outstanding = tx
        .execute(Select(By::<Option<ReleaseToken>, _>::new(Outstanding {
            vehicle_id,
            slot_id,
        })))
        .await
        .map_err(tracerr::wrap!())?;
    if let Some(token) = outstanding {
        return Ok(token);
    }

    let now = DateTime::now();
    let token = ReleaseToken {
        id: release_token::Id::new(),
        vehicle_id,
        slot_id,
        created_at: now.coerce(),
        expires_at: (now + ttl).coerce(),
        used: false,
    };
    tx.execute(Insert(token))
        .await
        .map_err(tracerr::wrap!())
        .map(drop)?;

    Ok(token)
}

/// Error of [`MintReleaseToken`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Vehicle`] is not parked.
    #[display("`Vehicle(id: {_0})` is not parked")]
    NotParked(#[error(not(source))] vehicle::Id),

    /// [`Vehicle`] with the provided ID does not exist.
    #[display("`Vehicle(id: {_0})` does not exist")]
    VehicleNotExists(#[error(not(source))] vehicle::Id),
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::operations::Insert;

    use crate::{
        command::{MintReleaseToken, ReleaseVehicle},
        domain::ReleaseToken,
        infra::Database as _,
        testing::{lot, park, vehicle_in},
        Command as _,
    };

    use super::ExecutionError;

    #[tokio::test]
    async fn reuses_outstanding_token() {
        let (svc, _rx) = lot(1).await;
        let vehicle = vehicle_in(&svc, "car").await;
        let parked = park(&svc, vehicle.id).await;

        let first = svc
            .execute(MintReleaseToken {
                vehicle_id: vehicle.id,
                ttl: None,
            })
            .await
            .unwrap();
        let second = svc
            .execute(MintReleaseToken {
                vehicle_id: vehicle.id,
                ttl: Some(Duration::from_secs(60)),
            })
            .await
            .unwrap();

        assert_eq!(first.id, parked.token.id);
        assert_eq!(second.id, first.id);
        assert_eq!(svc.database().snapshot().await.release_tokens.len(), 1);
    }

    #[tokio::test]
    async fn mints_new_token_once_previous_expired() {
        let (svc, _rx) = lot(1).await;
        let vehicle = vehicle_in(&svc, "car").await;
        let parked = park(&svc, vehicle.id).await;
        svc.database()
            .execute(Insert(ReleaseToken {
                expires_at: (parked.token.created_at - Duration::from_secs(1))
                    .coerce(),
                ..parked.token
            }))
            .await
            .unwrap();

        let token = svc
            .execute(MintReleaseToken {
                vehicle_id: vehicle.id,
                ttl: Some(Duration::from_secs(60)),
            })
            .await
            .unwrap();

        assert_ne!(token.id, parked.token.id);
        assert!(token.is_active());
        assert_eq!(token.slot_id, parked.slot_id);
    }

    #[tokio::test]
    async fn notifies_owner() {
        let (svc, mut rx) = lot(1).await;
        let vehicle = vehicle_in(&svc, "car").await;
        let parked = park(&svc, vehicle.id).await;
        _ = rx.recv().await.unwrap();

        let token = svc
            .execute(MintReleaseToken {
                vehicle_id: vehicle.id,
                ttl: None,
            })
            .await
            .unwrap();

        let notification = rx.recv().await.unwrap();
        assert_eq!(notification.vehicle_id, vehicle.id);
        assert_eq!(notification.slot_id, parked.slot_id);
        assert!(notification.link.ends_with(&token.id.to_string()));
    }

    #[tokio::test]
    async fn fails_when_not_parked() {
        let (svc, _rx) = lot(1).await;
        let vehicle = vehicle_in(&svc, "car").await;
        _ = park(&svc, vehicle.id).await;
        _ = svc
            .execute(ReleaseVehicle {
                vehicle_id: vehicle.id,
            })
            .await
            .unwrap();

        let err = svc
            .execute(MintReleaseToken {
                vehicle_id: vehicle.id,
                ttl: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::NotParked(id) if *id == vehicle.id,
        ));
    }
}
