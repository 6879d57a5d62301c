//! GraphQL [`Mutation`]s definitions.

use juniper::graphql_object;
use service::{command, Command as _};
use tracing as log;

use crate::{api, AsError, Context, Error};

/// Root of all GraphQL mutations.
#[derive(Clone, Copy, Debug)]
pub struct Mutation;

impl Mutation {
    /// Name of the [`tracing::Span`] for the mutations.
    const SPAN_NAME: &'static str = "GraphQL mutation";
}

#[graphql_object(context = Context)]
impl Mutation {
    /// Registers a new `User` with the provided name and phone.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `ADMIN_REQUIRED` - the request is not authorized as administrator's.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "registerUser",
            name = %name,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn register_user(
        name: api::user::Name,
        phone: api::user::Phone,
        ctx: &Context,
    ) -> Result<api::User, Error> {
        ctx.authorize_admin()?;

        ctx.service()
            .execute(command::RegisterUser {
                name: name.into(),
                phone: phone.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Registers a new `Vehicle` of the specified `User`.
    ///
    /// Parking notifications go to the provided `phone`, or to the `User`'s
    /// one if omitted.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `ADMIN_REQUIRED` - the request is not authorized as administrator's;
    /// - `USER_NOT_EXISTS` - the `User` with the specified ID does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            category = %category,
            gql.name = "registerVehicle",
            license_plate = %license_plate,
            otel.name = Self::SPAN_NAME,
            user_id = %user_id,
        ),
    )]
    pub async fn register_vehicle(
        user_id: api::user::Id,
        license_plate: api::vehicle::LicensePlate,
        category: api::vehicle::Category,
        phone: Option<api::user::Phone>,
        ctx: &Context,
    ) -> Result<api::Vehicle, Error> {
        ctx.authorize_admin()?;

        ctx.service()
            .execute(command::RegisterVehicle {
                user_id: user_id.into(),
                license_plate: license_plate.into(),
                category: category.into(),
                phone: phone.map(Into::into),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Registers a new `User` with a new `Vehicle` and parks it right away,
    /// notifying the driver with a release link.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `ADMIN_REQUIRED` - the request is not authorized as administrator's;
    /// - `NO_VACANCY` - all the `Slot`s are occupied.
    #[tracing::instrument(
        skip_all,
        fields(
            category = %category,
            gql.name = "register",
            license_plate = %license_plate,
            name = %name,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn register(
        name: api::user::Name,
        phone: api::user::Phone,
        license_plate: api::vehicle::LicensePlate,
        category: api::vehicle::Category,
        ctx: &Context,
    ) -> Result<api::bill::Registered, Error> {
        ctx.authorize_admin()?;

        ctx.service()
            .execute(command::Register {
                name: name.into(),
                phone: phone.into(),
                license_plate: license_plate.into(),
                category: category.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Parks the specified `Vehicle` into the vacant `Slot` with the lowest
    /// ID, notifying the driver with a release link.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `ADMIN_REQUIRED` - the request is not authorized as administrator's;
    /// - `VEHICLE_NOT_EXISTS` - the `Vehicle` with the specified ID does not
    ///                          exist;
    /// - `ALREADY_PARKED` - the `Vehicle` is parked already;
    /// - `NO_VACANCY` - all the `Slot`s are occupied.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "parkVehicle",
            otel.name = Self::SPAN_NAME,
            vehicle_id = %vehicle_id,
        ),
    )]
    pub async fn park_vehicle(
        vehicle_id: api::vehicle::Id,
        ctx: &Context,
    ) -> Result<api::bill::Parked, Error> {
        ctx.authorize_admin()?;

        ctx.service()
            .execute(command::ParkVehicle {
                vehicle_id: vehicle_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Parks the specified `Vehicle` in the specified vacant `Slot` and
    /// sends the release link to its owner.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `ADMIN_REQUIRED` - the request is not authorized as administrator's;
    /// - `SLOT_NOT_EXISTS` - the `Slot` with the specified ID does not exist;
    /// - `SLOT_ALREADY_OCCUPIED` - the `Slot` is occupied already;
    /// - `VEHICLE_NOT_EXISTS` - the `Vehicle` with the specified ID does not
    ///                          exist;
    /// - `ALREADY_PARKED` - the `Vehicle` is parked already.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "occupySlot",
            otel.name = Self::SPAN_NAME,
            slot_id = %slot_id,
            vehicle_id = %vehicle_id,
        ),
    )]
    pub async fn occupy_slot(
        slot_id: api::slot::Id,
        vehicle_id: api::vehicle::Id,
        ctx: &Context,
    ) -> Result<api::bill::Parked, Error> {
        ctx.authorize_admin()?;

        ctx.service()
            .execute(command::OccupySlot {
                slot_id: slot_id.into(),
                vehicle_id: vehicle_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the outstanding `ReleaseToken` of the specified parked
    /// `Vehicle`, minting a new one if there is none.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `ADMIN_REQUIRED` - the request is not authorized as administrator's;
    /// - `VEHICLE_NOT_EXISTS` - the `Vehicle` with the specified ID does not
    ///                          exist;
    /// - `NOT_PARKED` - the `Vehicle` is not parked.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "mintReleaseToken",
            otel.name = Self::SPAN_NAME,
            vehicle_id = %vehicle_id,
        ),
    )]
    pub async fn mint_release_token(
        vehicle_id: api::vehicle::Id,
        ctx: &Context,
    ) -> Result<api::ReleaseToken, Error> {
        ctx.authorize_admin()?;

        ctx.service()
            .execute(command::MintReleaseToken {
                vehicle_id: vehicle_id.into(),
                ttl: None,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Releases the `Slot` occupied by the specified `Vehicle` and bills the
    /// parking.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `ADMIN_REQUIRED` - the request is not authorized as administrator's;
    /// - `VEHICLE_NOT_EXISTS` - the `Vehicle` with the specified ID does not
    ///                          exist;
    /// - `NOT_PARKED` - the `Vehicle` is not parked.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "releaseVehicle",
            otel.name = Self::SPAN_NAME,
            vehicle_id = %vehicle_id,
        ),
    )]
    pub async fn release_vehicle(
        vehicle_id: api::vehicle::Id,
        ctx: &Context,
    ) -> Result<api::Bill, Error> {
        ctx.authorize_admin()?;

        let bill = ctx
            .service()
            .execute(command::ReleaseVehicle {
                vehicle_id: vehicle_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;
        log::info!(
            "`Slot(id: {})` released, billed {}",
            bill.slot_id,
            bill.amount,
        );
        Ok(bill.into())
    }

    /// Releases the specified `Slot` from the `Vehicle` occupying it and
    /// bills the parking.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `ADMIN_REQUIRED` - the request is not authorized as administrator's;
    /// - `SLOT_NOT_EXISTS` - the `Slot` with the specified ID does not exist;
    /// - `SLOT_ALREADY_FREE` - the `Slot` is not occupied.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "releaseSlot",
            otel.name = Self::SPAN_NAME,
            slot_id = %slot_id,
        ),
    )]
    pub async fn release_slot(
        slot_id: api::slot::Id,
        ctx: &Context,
    ) -> Result<api::Bill, Error> {
        ctx.authorize_admin()?;

        let bill = ctx
            .service()
            .execute(command::ReleaseSlot {
                slot_id: slot_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;
        log::info!(
            "`Slot(id: {})` released, billed {}",
            bill.slot_id,
            bill.amount,
        );
        Ok(bill.into())
    }

    /// Removes the specified `Vehicle`, releasing its `Slot` without billing
    /// if it's parked.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `ADMIN_REQUIRED` - the request is not authorized as administrator's;
    /// - `VEHICLE_NOT_EXISTS` - the `Vehicle` with the specified ID does not
    ///                          exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "removeVehicle",
            otel.name = Self::SPAN_NAME,
            vehicle_id = %vehicle_id,
        ),
    )]
    pub async fn remove_vehicle(
        vehicle_id: api::vehicle::Id,
        ctx: &Context,
    ) -> Result<api::Vehicle, Error> {
        ctx.authorize_admin()?;

        ctx.service()
            .execute(command::RemoveVehicle {
                vehicle_id: vehicle_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Redeems the `ReleaseToken`, releasing its `Slot` and billing the
    /// parking.
    ///
    /// Requires no authorization, as knowing the `ReleaseToken` is enough.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `TOKEN_NOT_EXISTS` - the `ReleaseToken` does not exist;
    /// - `TOKEN_EXPIRED` - the `ReleaseToken` is expired;
    /// - `TOKEN_ALREADY_USED` - the `ReleaseToken` has been redeemed already;
    /// - `NOT_PARKED` - the `Vehicle` has left the `Slot` already.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "redeemReleaseToken",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn redeem_release_token(
        token: api::release_token::Id,
        ctx: &Context,
    ) -> Result<api::Bill, Error> {
        let bill = ctx
            .service()
            .execute(command::RedeemReleaseToken {
                token_id: token.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;
        log::info!(
            "`Slot(id: {})` released via token, billed {}",
            bill.slot_id,
            bill.amount,
        );
        Ok(bill.into())
    }
}

impl AsError for command::register_vehicle::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::UserNotExists(_) => api::UserError::NotExists.into(),
        })
    }
}

impl AsError for command::park_vehicle::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::AlreadyParked(..) => api::VehicleError::AlreadyParked.into(),
            Self::Db(e) => return e.try_as_error(),
            Self::NoVacancy => api::SlotError::NoVacancy.into(),
            Self::VehicleNotExists(_) => api::VehicleError::NotExists.into(),
        })
    }
}

impl AsError for command::occupy_slot::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::AlreadyParked(..) => api::VehicleError::AlreadyParked.into(),
            Self::Db(e) => return e.try_as_error(),
            Self::SlotAlreadyOccupied(_) => {
                api::SlotError::AlreadyOccupied.into()
            }
            Self::SlotNotExists(_) => api::SlotError::NotExists.into(),
            Self::VehicleNotExists(_) => api::VehicleError::NotExists.into(),
        })
    }
}

impl AsError for command::mint_release_token::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::NotParked(_) => api::VehicleError::NotParked.into(),
            Self::VehicleNotExists(_) => api::VehicleError::NotExists.into(),
        })
    }
}

impl AsError for command::release_vehicle::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::InvariantViolation(e) => return e.try_as_error(),
            Self::NotParked(_) => api::VehicleError::NotParked.into(),
            Self::VehicleNotExists(_) => api::VehicleError::NotExists.into(),
        })
    }
}

impl AsError for command::release_slot::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::AlreadyFree(_) => api::SlotError::AlreadyFree.into(),
            Self::Db(e) => return e.try_as_error(),
            Self::InvariantViolation(e) => return e.try_as_error(),
            Self::SlotNotExists(_) => api::SlotError::NotExists.into(),
        })
    }
}

impl AsError for command::redeem_release_token::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::InvariantViolation(e) => return e.try_as_error(),
            Self::NotParked(..) => api::VehicleError::NotParked.into(),
            Self::TokenAlreadyUsed(_) => api::TokenError::AlreadyUsed.into(),
            Self::TokenExpired(_) => api::TokenError::Expired.into(),
            Self::TokenNotExists(_) => api::TokenError::NotExists.into(),
            Self::VehicleNotExists(_) => api::VehicleError::NotExists.into(),
        })
    }
}

impl AsError for command::remove_vehicle::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::InvariantViolation(e) => return e.try_as_error(),
            Self::VehicleNotExists(_) => api::VehicleError::NotExists.into(),
        })
    }
}

impl AsError for command::register::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::ParkVehicle(e) => e.try_as_error(),
            Self::RegisterUser(e) => e.try_as_error(),
            Self::RegisterVehicle(e) => e.try_as_error(),
        }
    }
}

#[cfg(test)]
mod spec {
    use service::{
        command::{
            occupy_slot, park_vehicle, redeem_release_token, register,
            release_slot, InvariantViolation,
        },
        domain::{release_token, slot, vehicle},
    };

    use crate::AsError as _;

    #[test]
    fn reports_no_vacancy_as_conflict() {
        let err = park_vehicle::ExecutionError::NoVacancy.as_error();

        assert_eq!(err.code, "NO_VACANCY");
        assert_eq!(err.status_code, http::StatusCode::CONFLICT);
    }

    #[test]
    fn reports_occupied_slot_as_conflict() {
        use occupy_slot::ExecutionError as E;

        let slot_id = slot::Id::new(2).unwrap();
        for (err, code, status) in [
            (
                E::SlotAlreadyOccupied(slot_id),
                "SLOT_ALREADY_OCCUPIED",
                http::StatusCode::CONFLICT,
            ),
            (
                E::SlotNotExists(slot_id),
                "SLOT_NOT_EXISTS",
                http::StatusCode::NOT_FOUND,
            ),
            (
                E::AlreadyParked(vehicle::Id::new(), slot_id),
                "ALREADY_PARKED",
                http::StatusCode::CONFLICT,
            ),
        ] {
            let err = err.as_error();

            assert_eq!(err.code, code);
            assert_eq!(err.status_code, status);
        }
    }

    #[test]
    fn reports_expired_token_as_gone() {
        let err = redeem_release_token::ExecutionError::TokenExpired(
            release_token::Id::new(),
        )
        .as_error();

        assert_eq!(err.code, "TOKEN_EXPIRED");
        assert_eq!(err.status_code, http::StatusCode::GONE);
    }

    #[test]
    fn reports_free_slot_as_conflict() {
        let slot_id = slot::Id::new(3).unwrap();

        let err = release_slot::ExecutionError::AlreadyFree(slot_id).as_error();

        assert_eq!(err.code, "SLOT_ALREADY_FREE");
        assert_eq!(err.status_code, http::StatusCode::CONFLICT);
    }

    #[test]
    fn hides_invariant_violation_details() {
        let err = release_slot::ExecutionError::InvariantViolation(
            InvariantViolation {
                slot_id: slot::Id::new(1).unwrap(),
                vehicle_id: vehicle::Id::new(),
            },
        )
        .as_error();

        assert_eq!(err.code, "INVARIANT_VIOLATION");
        assert_eq!(err.status_code, http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn unwraps_nested_register_errors() {
        let err = register::ExecutionError::ParkVehicle(
            park_vehicle::ExecutionError::NoVacancy,
        )
        .as_error();

        assert_eq!(err.code, "NO_VACANCY");
    }
}
