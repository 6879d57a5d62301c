//! [`Command`] for releasing the [`Slot`] occupied by a [`Vehicle`].

use common::operations::{
    By, Commit, Consume, Insert, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        slot,
        vehicle::{self, Parking},
        Bill, ReleaseToken, Slot, Vehicle,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for releasing the [`Slot`] occupied by a [`Vehicle`] and
/// billing its parking.
#[derive(Clone, Copy, Debug)]
pub struct ReleaseVehicle {
    /// ID of the [`Vehicle`] to release the [`Slot`] of.
    pub vehicle_id: vehicle::Id,
}

impl<Db> Command<ReleaseVehicle> for Service<Db>
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
        > + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Bill;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        ReleaseVehicle { vehicle_id }: ReleaseVehicle,
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

        let exited_at = vehicle::ExitDateTime::now();
        let parking = release_in::<_, E>(&tx, &mut vehicle)
            .await
            .map_err(tracerr::wrap!())?
            .ok_or(E::NotParked(vehicle_id))
            .map_err(tracerr::wrap!())?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(self.bill(&vehicle, parking, exited_at))
    }
}

impl<Db> Service<Db> {
    /// Bills the provided finished [`Parking`] of the [`Vehicle`] as exited
    /// at the provided moment.
    pub(crate) fn bill(
        &self,
        vehicle: &Vehicle,
        parking: Parking,
        exited_at: vehicle::ExitDateTime,
    ) -> Bill {
        self.config().tariff.bill(
            vehicle.id,
            parking.slot_id,
            vehicle.category.clone(),
            parking.entered_at,
            exited_at,
        )
    }
}

/// Releases the [`Slot`] occupied by the provided [`Vehicle`] inside the
/// provided transaction, clearing the [`Vehicle`]'s [`Parking`] and revoking
/// all its outstanding [`ReleaseToken`]s.
///
/// The [`Vehicle`] is expected to be locked already.
///
/// Returns the finished [`Parking`], or [`None`] if the [`Vehicle`] is not
/// parked.
///
/// # Errors
///
/// - [`InvariantViolation`] if the [`Slot`] doesn't refer back to the
///   [`Vehicle`].
/// - [`database::Error`] if any [`Database`] operation fails.
pub(crate) async fn release_in<Tx, E>(
    tx: &Tx,
    vehicle: &mut Vehicle,
) -> Result<Option<Parking>, Traced<E>>
where
    Tx: Database<Lock<By<Slot, slot::Id>>, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Slot>, slot::Id>>,
            Ok = Option<Slot>,
            Err = Traced<database::Error>,
        > + Database<Update<Slot>, Err = Traced<database::Error>>
        + Database<Insert<Vehicle>, Err = Traced<database::Error>>
        + Database<
            Consume<By<Vec<ReleaseToken>, vehicle::Id>>,
            Err = Traced<database::Error>,
        >,
    E: From<database::Error> + From<InvariantViolation>,
{
    let Some(parking) = vehicle.parking.take() else {
        return Ok(None);
    };
    let slot_id = parking.slot_id;

    tx.execute(Lock(By::<Slot, _>::new(slot_id)))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))
        .map(drop)?;

    let held = tx
        .execute(Select(By::<Option<Slot>, _>::new(slot_id)))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))?
        .is_some_and(|s| s.vehicle_id == Some(vehicle.id));
    if !held {
        return Err(tracerr::new!(E::from(InvariantViolation {
            slot_id,
            vehicle_id: vehicle.id,
        })));
    }

    tx.execute(Update(Slot::vacant(slot_id)))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))
        .map(drop)?;
    tx.execute(Insert(vehicle.clone()))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))
        .map(drop)?;
    tx.execute(Consume(By::<Vec<ReleaseToken>, _>::new(vehicle.id)))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))
        .map(drop)?;

    Ok(Some(parking))
}

/// [`Vehicle`] and the [`Slot`] it's parked in disagree about each other.
#[derive(Clone, Copy, Debug, Display, Error)]
#[display(
    "`Vehicle(id: {vehicle_id})` is parked in `Slot(id: {slot_id})`, \
     but the `Slot` is not held by it"
)]
pub struct InvariantViolation {
    /// ID of the [`Slot`] the [`Vehicle`] is parked in.
    #[error(not(source))]
    pub slot_id: slot::Id,

    /// ID of the parked [`Vehicle`].
    #[error(not(source))]
    pub vehicle_id: vehicle::Id,
}

/// Error of [`ReleaseVehicle`] [`Command`] execution.
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

    /// [`Vehicle`] is not parked.
    #[display("`Vehicle(id: {_0})` is not parked")]
    NotParked(#[error(not(source))] vehicle::Id),

    /// [`Vehicle`] with the provided ID does not exist.
    #[display("`Vehicle(id: {_0})` does not exist")]
    VehicleNotExists(#[error(not(source))] vehicle::Id),
}

#[cfg(test)]
mod spec {
    use common::{
        operations::{By, Select, Update},
        DateTime,
    };
    use rust_decimal::Decimal;

    use crate::{
        command::{ParkVehicle, ReleaseVehicle},
        domain::{slot, Slot},
        infra::Database as _,
        testing::{lot, park, vehicle_in},
        Command as _,
    };

    use super::ExecutionError;

    #[tokio::test]
    async fn frees_slot_and_bills_floor() {
        let (svc, _rx) = lot(1).await;
        let vehicle = vehicle_in(&svc, "car").await;
        let parked = park(&svc, vehicle.id).await;

        let bill = svc
            .execute(ReleaseVehicle {
                vehicle_id: vehicle.id,
            })
            .await
            .unwrap();

        assert_eq!(bill.slot_id, parked.slot_id);
        assert_eq!(bill.vehicle_id, vehicle.id);
        // Immediate release is billed by the floor: 15 minutes at 50/h.
        assert_eq!(bill.amount.amount, Decimal::new(1250, 2));

        let state = svc.database().snapshot().await;
        assert!(!state.slots[&parked.slot_id].is_occupied());
        assert!(state.vehicles[&vehicle.id].parking.is_none());
        assert!(state
            .release_tokens
            .values()
            .filter(|t| t.vehicle_id == vehicle.id)
            .all(|t| t.used));
    }

    #[tokio::test]
    async fn bills_moment_slot_was_freed() {
        let (svc, _rx) = lot(1).await;
        let vehicle = vehicle_in(&svc, "car").await;
        let parked = park(&svc, vehicle.id).await;

        let before = DateTime::now();
        let bill = svc
            .execute(ReleaseVehicle {
                vehicle_id: vehicle.id,
            })
            .await
            .unwrap();
        let after = DateTime::now();

        assert!(bill.exited_at >= before.coerce());
        assert!(bill.exited_at <= after.coerce());
        assert_eq!(
            bill.entered_at,
            parked.vehicle.parking.unwrap().entered_at,
        );
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
            .execute(ReleaseVehicle {
                vehicle_id: vehicle.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::NotParked(id) if *id == vehicle.id,
        ));
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
            .execute(ReleaseVehicle {
                vehicle_id: vehicle.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvariantViolation(v)
                if v.slot_id == parked.slot_id && v.vehicle_id == vehicle.id,
        ));
        let state = svc.database().snapshot().await;
        assert!(state.vehicles[&vehicle.id].parking.is_some());
    }

    #[tokio::test]
    async fn slot_is_reusable_after_release() {
        let (svc, _rx) = lot(1).await;
        let first = vehicle_in(&svc, "car").await;
        let second = vehicle_in(&svc, "bike").await;
        _ = park(&svc, first.id).await;

        _ = svc
            .execute(ReleaseVehicle {
                vehicle_id: first.id,
            })
            .await
            .unwrap();
        let parked = svc
            .execute(ParkVehicle {
                vehicle_id: second.id,
            })
            .await
            .unwrap();

        assert_eq!(parked.slot_id, slot::Id::new(1).unwrap());
        let slot = svc
            .database()
            .execute(Select(By::<Option<Slot>, _>::new(parked.slot_id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(slot.vehicle_id, Some(second.id));
    }
}
