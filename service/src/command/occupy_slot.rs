//! [`Command`] for parking a [`Vehicle`] in a specific [`Slot`].

use common::{
    operations::{
        By, Claim, Commit, Insert, Lock, Select, Transact, Transacted,
    },
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        slot,
        vehicle::{self, Parking},
        ReleaseToken, Slot, Vehicle,
    },
    infra::{database, Database},
    read::release_token::Outstanding,
    Service,
};

use super::{mint_release_token::mint_in, park_vehicle::Parked, Command};

/// [`Command`] for parking a [`Vehicle`] in the provided vacant [`Slot`],
/// bypassing the lowest-vacant-first allocation.
///
/// Otherwise behaves like [`ParkVehicle`].
///
/// [`ParkVehicle`]: super::ParkVehicle
#[derive(Clone, Copy, Debug)]
pub struct OccupySlot {
    /// ID of the [`Slot`] to occupy.
    pub slot_id: slot::Id,

    /// ID of the [`Vehicle`] to be parked.
    pub vehicle_id: vehicle::Id,
}

impl<Db> Command<OccupySlot> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Vehicle, vehicle::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Vehicle>, vehicle::Id>>,
            Ok = Option<Vehicle>,
            Err = Traced<database::Error>,
        > + Database<Claim<Slot>, Ok = bool, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Slot>, slot::Id>>,
            Ok = Option<Slot>,
            Err = Traced<database::Error>,
        > + Database<Insert<Vehicle>, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<ReleaseToken>, Outstanding>>,
            Ok = Option<ReleaseToken>,
            Err = Traced<database::Error>,
        > + Database<Insert<ReleaseToken>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Parked;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        OccupySlot {
            slot_id,
            vehicle_id,
        }: OccupySlot,
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
        if let Some(parked_in) = vehicle.slot_id() {
            return Err(tracerr::new!(E::AlreadyParked(vehicle_id, parked_in)));
        }

        let claimed = tx
            .execute(Claim(Slot {
                id: slot_id,
                vehicle_id: Some(vehicle_id),
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if !claimed {
            let exists = tx
                .execute(Select(By::<Option<Slot>, _>::new(slot_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .is_some();
            return Err(tracerr::new!(if exists {
                E::SlotAlreadyOccupied(slot_id)
            } else {
                E::SlotNotExists(slot_id)
            }));
        }

        vehicle.parking = Some(Parking {
            slot_id,
            entered_at: DateTime::now().coerce(),
        });
        tx.execute(Insert(vehicle.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let token = mint_in(
            &tx,
            vehicle_id,
            slot_id,
            self.config().release_token_ttl,
        )
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        self.notify(&vehicle, &token);

        Ok(Parked {
            vehicle,
            slot_id,
            token,
        })
    }
}

/// Error of [`OccupySlot`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Vehicle`] is parked already.
    #[display("`Vehicle(id: {_0})` is already parked in `Slot(id: {_1})`")]
    AlreadyParked(
        #[error(not(source))] vehicle::Id,
        #[error(not(source))] slot::Id,
    ),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Slot`] is occupied by another [`Vehicle`].
    #[display("`Slot(id: {_0})` is already occupied")]
    SlotAlreadyOccupied(#[error(not(source))] slot::Id),

    /// [`Slot`] with the provided ID does not exist.
    #[display("`Slot(id: {_0})` does not exist")]
    SlotNotExists(#[error(not(source))] slot::Id),

    /// [`Vehicle`] with the provided ID does not exist.
    #[display("`Vehicle(id: {_0})` does not exist")]
    VehicleNotExists(#[error(not(source))] vehicle::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{OccupySlot, ParkVehicle},
        domain::{slot, vehicle},
        testing::{lot, park, vehicle_in},
        Command as _,
    };

    use super::ExecutionError;

    #[tokio::test]
    async fn occupies_requested_slot() {
        let (svc, _rx) = lot(3).await;
        let vehicle = vehicle_in(&svc, "car").await;
        let slot_id = slot::Id::new(3).unwrap();

        let parked = svc
            .execute(OccupySlot {
                slot_id,
                vehicle_id: vehicle.id,
            })
            .await
            .unwrap();

        assert_eq!(parked.slot_id, slot_id);
        assert_eq!(parked.token.slot_id, slot_id);
        assert_eq!(parked.token.vehicle_id, vehicle.id);
        let state = svc.database().snapshot().await;
        assert_eq!(state.slots[&slot_id].vehicle_id, Some(vehicle.id));
        assert_eq!(state.vehicles[&vehicle.id].slot_id(), Some(slot_id));
        assert!(state.release_tokens[&parked.token.id].is_active());
        assert_eq!(
            state.slots.values().filter(|s| s.is_occupied()).count(),
            1,
        );
    }

    #[tokio::test]
    async fn leaves_lower_slots_to_regular_parking() {
        let (svc, _rx) = lot(2).await;
        let first = vehicle_in(&svc, "car").await;
        let second = vehicle_in(&svc, "car").await;
        _ = svc
            .execute(OccupySlot {
                slot_id: slot::Id::new(2).unwrap(),
                vehicle_id: first.id,
            })
            .await
            .unwrap();

        let parked = park(&svc, second.id).await;

        assert_eq!(parked.slot_id, slot::Id::new(1).unwrap());
    }

    #[tokio::test]
    async fn rejects_occupied_slot() {
        let (svc, _rx) = lot(2).await;
        let holder = vehicle_in(&svc, "car").await;
        let held = park(&svc, holder.id).await;
        let vehicle = vehicle_in(&svc, "bike").await;

        let err = svc
            .execute(OccupySlot {
                slot_id: held.slot_id,
                vehicle_id: vehicle.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::SlotAlreadyOccupied(id) if *id == held.slot_id,
        ));
        let state = svc.database().snapshot().await;
        assert_eq!(state.slots[&held.slot_id].vehicle_id, Some(holder.id));
        assert!(state.vehicles[&vehicle.id].parking.is_none());
        assert!(state
            .release_tokens
            .values()
            .all(|t| t.vehicle_id != vehicle.id));
    }

    #[tokio::test]
    async fn rejects_unknown_slot() {
        let (svc, _rx) = lot(2).await;
        let vehicle = vehicle_in(&svc, "car").await;
        let slot_id = slot::Id::new(7).unwrap();

        let err = svc
            .execute(OccupySlot {
                slot_id,
                vehicle_id: vehicle.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::SlotNotExists(id) if *id == slot_id,
        ));
        let state = svc.database().snapshot().await;
        assert!(state.vehicles[&vehicle.id].parking.is_none());
        assert!(!state.slots.contains_key(&slot_id));
    }

    #[tokio::test]
    async fn rejects_parked_vehicle() {
        let (svc, _rx) = lot(2).await;
        let vehicle = vehicle_in(&svc, "car").await;
        let parked = svc
            .execute(ParkVehicle {
                vehicle_id: vehicle.id,
            })
            .await
            .unwrap();
        let vacant = slot::Id::new(2).unwrap();

        let err = svc
            .execute(OccupySlot {
                slot_id: vacant,
                vehicle_id: vehicle.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::AlreadyParked(v, s)
                if *v == vehicle.id && *s == parked.slot_id,
        ));
        let state = svc.database().snapshot().await;
        assert!(!state.slots[&vacant].is_occupied());
    }

    #[tokio::test]
    async fn rejects_unknown_vehicle() {
        let (svc, _rx) = lot(1).await;
        let id = vehicle::Id::new();
        let slot_id = slot::Id::new(1).unwrap();

        let err = svc
            .execute(OccupySlot {
                slot_id,
                vehicle_id: id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::VehicleNotExists(v) if *v == id,
        ));
        let state = svc.database().snapshot().await;
        assert!(!state.slots[&slot_id].is_occupied());
    }

    #[tokio::test]
    async fn notifies_owner_with_release_link() {
        let (svc, mut rx) = lot(2).await;
        let vehicle = vehicle_in(&svc, "car").await;
        let slot_id = slot::Id::new(2).unwrap();

        let parked = svc
            .execute(OccupySlot {
                slot_id,
                vehicle_id: vehicle.id,
            })
            .await
            .unwrap();

        let notification = rx.recv().await.unwrap();
        assert_eq!(notification.vehicle_id, vehicle.id);
        assert_eq!(notification.slot_id, slot_id);
        assert_eq!(
            notification.link,
            format!("https://parking.test/release/{}", parked.token.id),
        );
    }
}
