//! [`Command`] for releasing a [`Slot`].

use common::operations::{
    By, Commit, Consume, Insert, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{slot, vehicle, Bill, ReleaseToken, Slot, Vehicle},
    infra::{database, Database},
    Service,
};

use super::{
    release_vehicle::{release_in, InvariantViolation},
    Command,
};

/// [`Command`] for releasing a [`Slot`] by its ID, billing the parking of
/// the [`Vehicle`] occupying it.
#[derive(Clone, Copy, Debug)]
pub struct ReleaseSlot {
    /// ID of the [`Slot`] to be released.
    pub slot_id: slot::Id,
}

impl<Db> Command<ReleaseSlot> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Slot>, slot::Id>>,
            Ok = Option<Slot>,
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
            Consume<By<Vec<ReleaseToken>, vehicle::Id>>,
            Err = Traced<database::Error>,
        > + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Bill;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        ReleaseSlot { slot_id }: ReleaseSlot,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let vehicle_id = self
            .database()
            .execute(Select(By::<Option<Slot>, _>::new(slot_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::SlotNotExists(slot_id))
            .map_err(tracerr::wrap!())?
            .vehicle_id
            .ok_or(E::AlreadyFree(slot_id))
            .map_err(tracerr::wrap!())?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::<Vehicle, _>::new(vehicle_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        // The `Slot` may have been released while the `Vehicle` was unlocked.
        let vehicle = tx
            .execute(Select(By::<Option<Vehicle>, _>::new(vehicle_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|v| v.slot_id() == Some(slot_id));
        let Some(mut vehicle) = vehicle else {
            tx.execute(Lock(By::<Slot, _>::new(slot_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            let held = tx
                .execute(Select(By::<Option<Slot>, _>::new(slot_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .is_some_and(|s| s.vehicle_id == Some(vehicle_id));
            return Err(tracerr::new!(if held {
                E::InvariantViolation(InvariantViolation {
                    slot_id,
                    vehicle_id,
                })
            } else {
                E::AlreadyFree(slot_id)
            }));
        };

        let exited_at = vehicle::ExitDateTime::now();
        let parking = release_in::<_, E>(&tx, &mut vehicle)
            .await
            .map_err(tracerr::wrap!())?
            .ok_or(E::AlreadyFree(slot_id))
            .map_err(tracerr::wrap!())?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(self.bill(&vehicle, parking, exited_at))
    }
}

/// Error of [`ReleaseSlot`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Slot`] is not occupied.
    #[display("`Slot(id: {_0})` is already free")]
    AlreadyFree(#[error(not(source))] slot::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Slot`] and its [`Vehicle`] disagree about each other.
    #[display("{_0}")]
    #[from]
    InvariantViolation(InvariantViolation),

    /// [`Slot`] with the provided ID does not exist.
    #[display("`Slot(id: {_0})` does not exist")]
    SlotNotExists(#[error(not(source))] slot::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::ReleaseSlot,
        domain::slot,
        testing::{lot, park, vehicle_in},
        Command as _,
    };

    use super::ExecutionError;

    #[tokio::test]
    async fn releases_occupant() {
        let (svc, _rx) = lot(2).await;
        let vehicle = vehicle_in(&svc, "bike").await;
        let parked = park(&svc, vehicle.id).await;

        let bill = svc
            .execute(ReleaseSlot {
                slot_id: parked.slot_id,
            })
            .await
            .unwrap();

        assert_eq!(bill.vehicle_id, vehicle.id);
        assert_eq!(bill.category, vehicle.category);
        let state = svc.database().snapshot().await;
        assert!(state.slots.values().all(|s| !s.is_occupied()));
        assert!(state.vehicles[&vehicle.id].parking.is_none());
        assert!(state.release_tokens[&parked.token.id].used);
    }

    #[tokio::test]
    async fn fails_when_already_free() {
        let (svc, _rx) = lot(2).await;
        let id = slot::Id::new(2).unwrap();

        let err = svc.execute(ReleaseSlot { slot_id: id }).await.unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::AlreadyFree(s) if *s == id,
        ));
    }

    #[tokio::test]
    async fn fails_for_unknown_slot() {
        let (svc, _rx) = lot(2).await;
        let id = slot::Id::new(3).unwrap();

        let err = svc.execute(ReleaseSlot { slot_id: id }).await.unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::SlotNotExists(s) if *s == id,
        ));
    }
}
