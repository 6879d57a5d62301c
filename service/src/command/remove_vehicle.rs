//! [`Command`] for removing a [`Vehicle`].

use common::operations::{
    By, Commit, Consume, Delete, Insert, Lock, Select, Transact, Transacted,
    Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{slot, vehicle, ReleaseToken, Slot, Vehicle},
    infra::{database, Database},
    Service,
};

use super::{
    release_vehicle::{release_in, InvariantViolation},
    Command,
};

/// [`Command`] for removing a [`Vehicle`] along with its [`ReleaseToken`]s.
///
/// The [`Slot`] occupied by the [`Vehicle`] is released without billing.
#[derive(Clone, Copy, Debug)]
pub struct RemoveVehicle {
    /// ID of the [`Vehicle`] to be removed.
    pub vehicle_id: vehicle::Id,
}

impl<Db> Command<RemoveVehicle> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
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
        > + Database<
            Delete<By<Vehicle, vehicle::Id>>,
            Err = Traced<database::Error>,
        > + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Vehicle;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        RemoveVehicle { vehicle_id }: RemoveVehicle,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::<Vehicle, _>::new(vehicle_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut vehicle = tx
            .execute(Select(By::<Option<Vehicle>, _>::new(vehicle_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::VehicleNotExists(vehicle_id))
            .map_err(tracerr::wrap!())?;

        if let Some(parking) = release_in::<_, E>(&tx, &mut vehicle)
            .await
            .map_err(tracerr::wrap!())?
        {
            log::info!(
                "`Slot(id: {})` released unbilled on removing \
                 `Vehicle(id: {vehicle_id})`",
                parking.slot_id,
            );
        }

        tx.execute(Delete(By::<Vehicle, _>::new(vehicle_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(vehicle)
    }
}

/// Error of [`RemoveVehicle`] [`Command`] execution.
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

    /// [`Vehicle`] with the provided ID does not exist.
    #[display("`Vehicle(id: {_0})` does not exist")]
    VehicleNotExists(#[error(not(source))] vehicle::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::RemoveVehicle,
        testing::{lot, park, vehicle_in},
        Command as _,
    };

    use super::ExecutionError;

    #[tokio::test]
    async fn frees_slot_and_drops_tokens() {
        let (svc, _rx) = lot(1).await;
        let vehicle = vehicle_in(&svc, "car").await;
        _ = park(&svc, vehicle.id).await;

        let removed = svc
            .execute(RemoveVehicle {
                vehicle_id: vehicle.id,
            })
            .await
            .unwrap();

        assert_eq!(removed.id, vehicle.id);
        assert!(removed.parking.is_none());
        let state = svc.database().snapshot().await;
        assert!(!state.vehicles.contains_key(&vehicle.id));
        assert!(state.slots.values().all(|s| !s.is_occupied()));
        assert!(state.release_tokens.is_empty());
        assert!(state.users.contains_key(&vehicle.user_id));
    }

    #[tokio::test]
    async fn removes_unparked_vehicle() {
        let (svc, _rx) = lot(1).await;
        let vehicle = vehicle_in(&svc, "car").await;

        _ = svc
            .execute(RemoveVehicle {
                vehicle_id: vehicle.id,
            })
            .await
            .unwrap();

        let err = svc
            .execute(RemoveVehicle {
                vehicle_id: vehicle.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::VehicleNotExists(id) if *id == vehicle.id,
        ));
    }
}
