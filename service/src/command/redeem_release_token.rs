//! [`Command`] for redeeming a [`ReleaseToken`].

use common::operations::{
    By, Commit, Consume, Insert, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        release_token::{self, Unredeemable},
        slot, vehicle, Bill, ReleaseToken, Slot, Vehicle,
    },
    infra::{database, Database},
    Service,
};

use super::{
    release_vehicle::{release_in, InvariantViolation},
    Command,
};

/// [`Command`] for redeeming a [`ReleaseToken`], releasing the [`Slot`] it
/// was minted for and billing the parking.
///
/// A [`ReleaseToken`] is redeemed at most once, even if redeemed
/// concurrently.
#[derive(Clone, Copy, Debug)]
pub struct RedeemReleaseToken {
    /// ID of the [`ReleaseToken`] to redeem.
    pub token_id: release_token::Id,
}

impl<Db> Command<RedeemReleaseToken> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<ReleaseToken>, release_token::Id>>,
            Ok = Option<ReleaseToken>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Vehicle, vehicle::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Vehicle>, vehicle::Id>>,
            Ok = Option<Vehicle>,
            Err = Traced<database::Error>,
        > + Database<Lock<By<Slot, slot::Id>>, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Slot>, slot::Id>>,
            Ok = Option<Slot>,
            Err = Traced<database::Error>,
        > + Database<Update<Slot>, Err = Traced<database::Error>>
        + Database<Insert<Vehicle>, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<ReleaseToken>, release_token::Id>>,
            Ok = Option<ReleaseToken>,
            Err = Traced<database::Error>,
        > + Database<
            Consume<By<Option<ReleaseToken>, release_token::Id>>,
            Ok = Option<ReleaseToken>,
            Err = Traced<database::Error>,
        > + Database<
            Consume<By<Vec<ReleaseToken>, vehicle::Id>>,
            Err = Traced<database::Error>,
        > + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Bill;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        RedeemReleaseToken { token_id }: RedeemReleaseToken,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let token = self
            .database()
            .execute(Select(By::<Option<ReleaseToken>, _>::new(token_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::TokenNotExists(token_id))
            .map_err(tracerr::wrap!())?;
        token
            .check_redeemable()
            .map_err(|e| tracerr::new!(E::unredeemable(token_id, e)))?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::<Vehicle, _>::new(token.vehicle_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Lock(By::<Slot, _>::new(token.slot_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let consumed = tx
            .execute(Consume(By::<Option<ReleaseToken>, _>::new(token_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if consumed.is_none() {
            // Lost the race, or expired meanwhile: classify by what's stored.
            let stored = tx
                .execute(Select(By::<Option<ReleaseToken>, _>::new(token_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::TokenNotExists(token_id))
                .map_err(tracerr::wrap!())?;
            return Err(tracerr::new!(match stored.check_redeemable() {
                Err(e) => E::unredeemable(token_id, e),
                Ok(()) => E::TokenAlreadyUsed(token_id),
            }));
        }

        let mut vehicle = tx
            .execute(Select(By::<Option<Vehicle>, _>::new(token.vehicle_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::VehicleNotExists(token.vehicle_id))
            .map_err(tracerr::wrap!())?;
        if vehicle.slot_id() != Some(token.slot_id) {
            return Err(tracerr::new!(E::NotParked(
                token.vehicle_id,
                token.slot_id,
            )));
        }

        let exited_at = vehicle::ExitDateTime::now();
        let parking = release_in::<_, E>(&tx, &mut vehicle)
            .await
            .map_err(tracerr::wrap!())?
            .ok_or(E::NotParked(token.vehicle_id, token.slot_id))
            .map_err(tracerr::wrap!())?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(self.bill(&vehicle, parking, exited_at))
    }
}

/// Error of [`RedeemReleaseToken`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Vehicle`] and its [`Slot`] disagree about each other.
    #[display("{_0}")]
    #[from]
    InvariantViolation(InvariantViolation),

    /// [`Vehicle`] is not parked in the [`Slot`] of the [`ReleaseToken`].
    #[display("`Vehicle(id: {_0})` is not parked in `Slot(id: {_1})`")]
    NotParked(
        #[error(not(source))] vehicle::Id,
        #[error(not(source))] slot::Id,
    ),

    /// [`ReleaseToken`] has been used already.
    #[display("`ReleaseToken(id: {_0})` is already used")]
    TokenAlreadyUsed(#[error(not(source))] release_token::Id),

    /// [`ReleaseToken`] is expired.
    #[display("`ReleaseToken(id: {_0})` is expired")]
    TokenExpired(#[error(not(source))] release_token::Id),

    /// [`ReleaseToken`] with the provided ID does not exist.
    #[display("`ReleaseToken(id: {_0})` does not exist")]
    TokenNotExists(#[error(not(source))] release_token::Id),

    /// [`Vehicle`] of the [`ReleaseToken`] does not exist.
    #[display("`Vehicle(id: {_0})` does not exist")]
    VehicleNotExists(#[error(not(source))] vehicle::Id),
}

impl ExecutionError {
    /// Creates an [`ExecutionError`] out of the reason the [`ReleaseToken`]
    /// cannot be redeemed.
    const fn unredeemable(
        id: release_token::Id,
        reason: Unredeemable,
    ) -> Self {
        match reason {
            Unredeemable::Expired => Self::TokenExpired(id),
            Unredeemable::AlreadyUsed => Self::TokenAlreadyUsed(id),
        }
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::operations::{Insert, Update};
    use rust_decimal::Decimal;

    use crate::{
        command::{ParkVehicle, RedeemReleaseToken, ReleaseVehicle},
        domain::{release_token, ReleaseToken, Slot},
        infra::Database as _,
        testing::{lot, park, vehicle_in},
        Command as _,
    };

    use super::ExecutionError;

    #[tokio::test]
    async fn releases_slot_once() {
        let (svc, _rx) = lot(1).await;
        let vehicle = vehicle_in(&svc, "car").await;
        let parked = park(&svc, vehicle.id).await;

        let bill = svc
            .execute(RedeemReleaseToken {
                token_id: parked.token.id,
            })
            .await
            .unwrap();
        assert_eq!(bill.vehicle_id, vehicle.id);
        assert_eq!(bill.slot_id, parked.slot_id);
        assert_eq!(bill.amount.amount, Decimal::new(1250, 2));
        let released = svc.database().snapshot().await;

        let err = svc
            .execute(RedeemReleaseToken {
                token_id: parked.token.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::TokenAlreadyUsed(id) if *id == parked.token.id,
        ));
        let state = svc.database().snapshot().await;
        assert!(!state.slots[&parked.slot_id].is_occupied());
        assert!(state.vehicles[&vehicle.id].parking.is_none());
        assert_eq!(
            state.release_tokens.len(),
            released.release_tokens.len(),
        );
        assert!(state.release_tokens[&parked.token.id].used);
    }

    #[tokio::test]
    async fn redeems_once_when_redeemed_concurrently() {
        let (svc, _rx) = lot(1).await;
        let vehicle = vehicle_in(&svc, "car").await;
        let parked = park(&svc, vehicle.id).await;
        let token_id = parked.token.id;

        let (first, second) = tokio::join!(
            svc.execute(RedeemReleaseToken { token_id }),
            svc.execute(RedeemReleaseToken { token_id }),
        );

        let (bill, err) = match (first, second) {
            (Ok(bill), Err(err)) | (Err(err), Ok(bill)) => (bill, err),
            (first, second) => {
                panic!("redeemed not exactly once: {first:?}, {second:?}")
            }
        };
        assert_eq!(bill.slot_id, parked.slot_id);
        assert!(matches!(
            err.as_ref(),
            ExecutionError::TokenAlreadyUsed(id) if *id == token_id,
        ));
        let state = svc.database().snapshot().await;
        assert!(!state.slots[&parked.slot_id].is_occupied());
        assert!(state.vehicles[&vehicle.id].parking.is_none());
        assert_eq!(state.release_tokens.len(), 1);
        assert!(state.release_tokens[&token_id].used);
    }

    #[tokio::test]
    async fn rejects_expired_token() {
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

        let err = svc
            .execute(RedeemReleaseToken {
                token_id: parked.token.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::TokenExpired(id) if *id == parked.token.id,
        ));
        let state = svc.database().snapshot().await;
        assert!(state.slots[&parked.slot_id].is_occupied());
        assert!(!state.release_tokens[&parked.token.id].used);
    }

    #[tokio::test]
    async fn reports_expiration_over_usage() {
        let (svc, _rx) = lot(1).await;
        let vehicle = vehicle_in(&svc, "car").await;
        let parked = park(&svc, vehicle.id).await;
        let token = ReleaseToken {
            expires_at: (parked.token.created_at - Duration::from_secs(1))
                .coerce(),
            used: true,
            ..parked.token
        };
        svc.database()
            .execute(Insert(token))
            .await
            .unwrap();

        let err = svc
            .execute(RedeemReleaseToken { token_id: token.id })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::TokenExpired(_)));
    }

    #[tokio::test]
    async fn rejects_unknown_token() {
        let (svc, _rx) = lot(1).await;
        let id = release_token::Id::new();

        let err = svc
            .execute(RedeemReleaseToken { token_id: id })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::TokenNotExists(t) if *t == id,
        ));
    }

    #[tokio::test]
    async fn rejects_token_revoked_by_release() {
        let (svc, _rx) = lot(1).await;
        let vehicle = vehicle_in(&svc, "car").await;
        let parked = park(&svc, vehicle.id).await;
        _ = svc
            .execute(ReleaseVehicle {
                vehicle_id: vehicle.id,
            })
            .await
            .unwrap();
        let reparked = svc
            .execute(ParkVehicle {
                vehicle_id: vehicle.id,
            })
            .await
            .unwrap();

        let err = svc
            .execute(RedeemReleaseToken {
                token_id: parked.token.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::TokenAlreadyUsed(_)));
        assert_ne!(reparked.token.id, parked.token.id);
        let state = svc.database().snapshot().await;
        assert!(state.slots[&reparked.slot_id].is_occupied());
    }

    #[tokio::test]
    async fn detects_broken_back_reference() {
        let (svc, _rx) = lot(1).await;
        let vehicle = vehicle_in(&svc, "car").await;
        let parked = park(&svc, vehicle.id).await;
        svc.database()
            .execute(Update(Slot::vacant(parked.slot_id)))
            .await
            .unwrap();

        let err = svc
            .execute(RedeemReleaseToken {
                token_id: parked.token.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvariantViolation(_),
        ));
        let state = svc.database().snapshot().await;
        assert!(!state.release_tokens[&parked.token.id].used);
    }
}
