//! [`Command`] for parking a [`Vehicle`].

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
        ReleaseToken, Vehicle,
    },
    infra::{database, Database},
    read::release_token::Outstanding,
    Service,
};

use super::{mint_release_token::mint_in, Command};

/// [`Command`] for parking a [`Vehicle`] in the lowest-numbered vacant
/// [`Slot`].
///
/// Mints a [`ReleaseToken`] of the occupied [`Slot`] and sends its link to
/// the [`Vehicle`]'s owner.
///
/// [`Slot`]: crate::domain::Slot
#[derive(Clone, Copy, Debug)]
pub struct ParkVehicle {
    /// ID of the [`Vehicle`] to be parked.
    pub vehicle_id: vehicle::Id,
}

/// Result of [`ParkVehicle`] [`Command`] execution.
#[derive(Clone, Debug)]
pub struct Parked {
    /// Parked [`Vehicle`].
    pub vehicle: Vehicle,

    /// ID of the occupied [`Slot`].
    ///
    /// [`Slot`]: crate::domain::Slot
    pub slot_id: slot::Id,

    /// [`ReleaseToken`] of the occupied [`Slot`].
    ///
    /// [`Slot`]: crate::domain::Slot
    pub token: ReleaseToken,
}

impl<Db> Command<ParkVehicle> for Service<Db>
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
            Claim<By<Option<slot::Id>, vehicle::Id>>,
            Ok = Option<slot::Id>,
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
        ParkVehicle { vehicle_id }: ParkVehicle,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid parking the same `Vehicle` twice concurrently.
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
        if let Some(slot_id) = vehicle.slot_id() {
            return Err(tracerr::new!(E::AlreadyParked(vehicle_id, slot_id)));
        }

        let slot_id = tx
            .execute(Claim(By::<Option<slot::Id>, _>::new(vehicle_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::NoVacancy)
            .map_err(tracerr::wrap!())?;

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

/// Error of [`ParkVehicle`] [`Command`] execution.
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

    /// All the [`Slot`]s are occupied.
    ///
    /// [`Slot`]: crate::domain::Slot
    #[display("No vacant `Slot`")]
    NoVacancy,

    /// [`Vehicle`] with the provided ID does not exist.
    #[display("`Vehicle(id: {_0})` does not exist")]
    VehicleNotExists(#[error(not(source))] vehicle::Id),
}

#[cfg(test)]
mod spec {
    use futures::future;

    use crate::{
        command::ParkVehicle,
        domain::{slot, vehicle},
        testing::{lot, park, vehicle_in},
        Command as _,
    };

    use super::ExecutionError;

    #[tokio::test]
    async fn occupies_lowest_vacant_slot() {
        let (svc, _rx) = lot(3).await;
        let first = vehicle_in(&svc, "car").await;
        let second = vehicle_in(&svc, "bike").await;

        let a = park(&svc, first.id).await;
        let b = park(&svc, second.id).await;

        assert_eq!(a.slot_id, slot::Id::new(1).unwrap());
        assert_eq!(b.slot_id, slot::Id::new(2).unwrap());

        let state = svc.database().snapshot().await;
        for parked in [&a, &b] {
            let slot = &state.slots[&parked.slot_id];
            let vehicle = &state.vehicles[&parked.vehicle.id];
            assert_eq!(slot.vehicle_id, Some(vehicle.id));
            assert_eq!(vehicle.slot_id(), Some(slot.id));
            assert_eq!(state.release_tokens[&parked.token.id].slot_id, slot.id);
        }
        assert!(state.slots.values().all(|s| {
            s.is_occupied() == s.vehicle_id.is_some()
                && s.vehicle_id.is_none_or(|id| {
                    state.vehicles[&id].slot_id() == Some(s.id)
                })
        }));
    }

    #[tokio::test]
    async fn fails_when_no_vacancy() {
        let (svc, _rx) = lot(2).await;
        for _ in 0..2 {
            let vehicle = vehicle_in(&svc, "car").await;
            _ = park(&svc, vehicle.id).await;
        }
        let extra = vehicle_in(&svc, "car").await;

        let err = svc
            .execute(ParkVehicle {
                vehicle_id: extra.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::NoVacancy));
        let state = svc.database().snapshot().await;
        assert!(state.vehicles[&extra.id].parking.is_none());
        assert!(state.slots.values().all(|s| s.vehicle_id != Some(extra.id)));
    }

    #[tokio::test]
    async fn fills_pool_exactly_when_parked_concurrently() {
        const SLOTS: u16 = 3;

        let (svc, _rx) = lot(SLOTS).await;
        let mut vehicles = Vec::new();
        for _ in 0..=SLOTS {
            vehicles.push(vehicle_in(&svc, "car").await);
        }

        let results = future::join_all(
            vehicles
                .iter()
                .map(|v| svc.execute(ParkVehicle { vehicle_id: v.id })),
        )
        .await;

        let parked: Vec<_> =
            results.iter().filter_map(|r| r.as_ref().ok()).collect();
        let failed: Vec<_> =
            results.iter().filter_map(|r| r.as_ref().err()).collect();
        assert_eq!(parked.len(), usize::from(SLOTS));
        assert_eq!(failed.len(), 1);
        assert!(matches!(failed[0].as_ref(), ExecutionError::NoVacancy));

        let state = svc.database().snapshot().await;
        assert!(state.slots.values().all(|s| s.is_occupied()));
        for p in &parked {
            assert_eq!(state.slots[&p.slot_id].vehicle_id, Some(p.vehicle.id));
            assert_eq!(
                state.vehicles[&p.vehicle.id].slot_id(),
                Some(p.slot_id),
            );
        }
        assert_eq!(
            state.vehicles.values().filter(|v| v.parking.is_some()).count(),
            usize::from(SLOTS),
        );
    }

    #[tokio::test]
    async fn fails_when_already_parked() {
        let (svc, _rx) = lot(2).await;
        let vehicle = vehicle_in(&svc, "car").await;
        let parked = park(&svc, vehicle.id).await;

        let err = svc
            .execute(ParkVehicle {
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
        assert_eq!(state.slots.values().filter(|s| s.is_occupied()).count(), 1);
    }

    #[tokio::test]
    async fn fails_for_unknown_vehicle() {
        let (svc, _rx) = lot(1).await;
        let id = vehicle::Id::new();

        let err = svc
            .execute(ParkVehicle { vehicle_id: id })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::VehicleNotExists(v) if *v == id,
        ));
    }

    #[tokio::test]
    async fn notifies_owner_with_release_link() {
        let (svc, mut rx) = lot(1).await;
        let vehicle = vehicle_in(&svc, "car").await;

        let parked = park(&svc, vehicle.id).await;

        let notification = rx.recv().await.unwrap();
        assert_eq!(notification.phone, vehicle.phone);
        assert_eq!(notification.vehicle_id, vehicle.id);
        assert_eq!(notification.category, vehicle.category);
        assert_eq!(notification.slot_id, parked.slot_id);
        assert_eq!(
            notification.link,
            format!("https://parking.test/release/{}", parked.token.id),
        );
    }
}
