//! [`Command`] for registering a new [`Vehicle`].

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{user, vehicle, User, Vehicle},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for registering a new [`Vehicle`] of an existing [`User`].
///
/// The registered [`Vehicle`] is not parked.
#[derive(Clone, Debug)]
pub struct RegisterVehicle {
    /// ID of the [`User`] owning a new [`Vehicle`].
    pub user_id: user::Id,

    /// [`vehicle::LicensePlate`] of a new [`Vehicle`].
    pub license_plate: vehicle::LicensePlate,

    /// [`vehicle::Category`] of a new [`Vehicle`].
    pub category: vehicle::Category,

    /// [`user::Phone`] to send notifications about a new [`Vehicle`] to.
    ///
    /// The owning [`User`]'s one is used if [`None`].
    pub phone: Option<user::Phone>,
}

impl<Db> Command<RegisterVehicle> for Service<Db>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Insert<Vehicle>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Vehicle;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: RegisterVehicle,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RegisterVehicle {
            user_id,
            license_plate,
            category,
            phone,
        } = cmd;

        let user = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())?;

        let vehicle = Vehicle {
            id: vehicle::Id::new(),
            license_plate,
            user_id: user.id,
            category,
            phone: phone.unwrap_or(user.phone),
            parking: None,
            created_at: DateTime::now().coerce(),
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Insert(vehicle.clone()))
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

/// Error of [`RegisterVehicle`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::RegisterUser,
        domain::{user, vehicle},
        infra::Memory,
        testing::{config, service},
        Command as _,
    };

    use super::{ExecutionError, RegisterVehicle};

    #[tokio::test]
    async fn defaults_phone_to_owners() {
        let (svc, _rx) = service(config(), Memory::new());
        let owner = svc
            .execute(RegisterUser {
                name: user::Name::new("Ravi").unwrap(),
                phone: user::Phone::new("987 654 3210").unwrap(),
            })
            .await
            .unwrap();

        let own = svc
            .execute(RegisterVehicle {
                user_id: owner.id,
                license_plate: vehicle::LicensePlate::new("ka01ab1234")
                    .unwrap(),
                category: vehicle::Category::new("Car").unwrap(),
                phone: None,
            })
            .await
            .unwrap();
        let other = svc
            .execute(RegisterVehicle {
                user_id: owner.id,
                license_plate: vehicle::LicensePlate::new("KA01AB9999")
                    .unwrap(),
                category: vehicle::Category::new("bike").unwrap(),
                phone: Some(user::Phone::new("+1 415 523 8886").unwrap()),
            })
            .await
            .unwrap();

        assert_eq!(own.phone, owner.phone);
        assert_eq!(own.license_plate.to_string(), "KA01AB1234");
        assert_eq!(own.category.to_string(), "car");
        assert_ne!(other.phone, owner.phone);
        let state = svc.database().snapshot().await;
        assert!(state.vehicles.values().all(|v| v.parking.is_none()));
        assert_eq!(state.vehicles.len(), 2);
    }

    #[tokio::test]
    async fn fails_for_unknown_user() {
        let (svc, _rx) = service(config(), Memory::new());
        let id = user::Id::new();

        let err = svc
            .execute(RegisterVehicle {
                user_id: id,
                license_plate: vehicle::LicensePlate::new("KA01AB1234")
                    .unwrap(),
                category: vehicle::Category::new("car").unwrap(),
                phone: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::UserNotExists(u) if *u == id,
        ));
    }
}
