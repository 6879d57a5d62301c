//! [`Command`] for registering and parking a [`Vehicle`] of a new [`User`]
//! in one go.

use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{user, vehicle, User, Vehicle},
    infra::database,
    Service,
};

use super::{
    park_vehicle::{self, Parked},
    register_user, register_vehicle, Command, ParkVehicle, RegisterUser,
    RegisterVehicle,
};

/// [`Command`] for registering a new [`User`] with a new [`Vehicle`] and
/// parking it right away.
///
/// Each step is committed on its own, so a failed parking (e.g. no vacancy)
/// leaves the registered [`User`] and [`Vehicle`] in place.
#[derive(Clone, Debug)]
pub struct Register {
    /// [`user::Name`] of a new [`User`].
    pub name: user::Name,

    /// [`user::Phone`] of a new [`User`].
    pub phone: user::Phone,

    /// [`vehicle::LicensePlate`] of a new [`Vehicle`].
    pub license_plate: vehicle::LicensePlate,

    /// [`vehicle::Category`] of a new [`Vehicle`].
    pub category: vehicle::Category,
}

/// Result of [`Register`] [`Command`] execution.
#[derive(Clone, Debug)]
pub struct Registered {
    /// Registered [`User`].
    pub user: User,

    /// Registered and parked [`Vehicle`] along with its parking details.
    pub parked: Parked,
}

impl<Db> Command<Register> for Service<Db>
where
    Self: Command<
            RegisterUser,
            Ok = User,
            Err = register_user::ExecutionError,
        > + Command<
            RegisterVehicle,
            Ok = Vehicle,
            Err = Traced<register_vehicle::ExecutionError>,
        > + Command<
            ParkVehicle,
            Ok = Parked,
            Err = Traced<park_vehicle::ExecutionError>,
        >,
{
    type Ok = Registered;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: Register) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let Register {
            name,
            phone,
            license_plate,
            category,
        } = cmd;

        let user = self
            .execute(RegisterUser { name, phone })
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let vehicle = self
            .execute(RegisterVehicle {
                user_id: user.id,
                license_plate,
                category,
                phone: None,
            })
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let parked = self
            .execute(ParkVehicle {
                vehicle_id: vehicle.id,
            })
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(Registered { user, parked })
    }
}

/// Error of [`Register`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`ParkVehicle`] [`Command`] failed.
    #[display("Failed to park `Vehicle`: {_0}")]
    ParkVehicle(park_vehicle::ExecutionError),

    /// [`RegisterUser`] [`Command`] failed.
    #[display("Failed to register `User`: {_0}")]
    RegisterUser(database::Error),

    /// [`RegisterVehicle`] [`Command`] failed.
    #[display("Failed to register `Vehicle`: {_0}")]
    RegisterVehicle(register_vehicle::ExecutionError),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{park_vehicle, ParkVehicle},
        domain::{user, vehicle},
        testing::lot,
        Command as _,
    };

    use super::{ExecutionError, Register};

    fn register(plate: &str) -> Register {
        Register {
            name: user::Name::new("Meera").unwrap(),
            phone: user::Phone::new("987 654 3210").unwrap(),
            license_plate: vehicle::LicensePlate::new(plate).unwrap(),
            category: vehicle::Category::new("car").unwrap(),
        }
    }

    #[tokio::test]
    async fn registers_parks_and_notifies() {
        let (svc, mut rx) = lot(1).await;

        let registered = svc.execute(register("KA01AB1234")).await.unwrap();

        let parked = &registered.parked;
        assert_eq!(parked.vehicle.user_id, registered.user.id);
        assert_eq!(parked.vehicle.slot_id(), Some(parked.slot_id));
        assert_eq!(parked.token.vehicle_id, parked.vehicle.id);
        let notification = rx.recv().await.unwrap();
        assert_eq!(notification.phone, registered.user.phone);
        assert_eq!(notification.slot_id, parked.slot_id);
    }

    #[tokio::test]
    async fn keeps_registration_on_no_vacancy() {
        let (svc, _rx) = lot(1).await;
        _ = svc.execute(register("KA01AB1234")).await.unwrap();

        let err = svc.execute(register("KA01AB9999")).await.unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::ParkVehicle(
                park_vehicle::ExecutionError::NoVacancy
            ),
        ));
        let state = svc.database().snapshot().await;
        assert_eq!(state.users.len(), 2);
        assert_eq!(state.vehicles.len(), 2);
        let waiting = state
            .vehicles
            .values()
            .find(|v| v.parking.is_none())
            .unwrap();

        _ = svc
            .execute(ParkVehicle {
                vehicle_id: waiting.id,
            })
            .await
            .unwrap_err();
    }
}
