//! [`Vehicle`]-related definitions.

use std::future;

use common::DateTime;
use derive_more::{AsRef, Display, From, Into};
use futures::TryFutureExt as _;
use juniper::{graphql_object, GraphQLScalar};
use service::{domain, query, Query as _};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    AsError, Context, Error,
};

/// A vehicle registered by a `User`.
#[derive(Clone, Debug, From)]
pub struct Vehicle {
    /// ID of this [`Vehicle`].
    pub id: Id,

    /// [`domain::Vehicle`] representing this [`Vehicle`].
    vehicle: OnceCell<domain::Vehicle>,
}

impl From<domain::Vehicle> for Vehicle {
    fn from(vehicle: domain::Vehicle) -> Self {
        Self {
            id: vehicle.id.into(),
            vehicle: OnceCell::new_with(Some(vehicle)),
        }
    }
}

impl Vehicle {
    /// Creates a new [`Vehicle`] with the provided ID.
    ///
    /// # Safety
    ///
    /// Caller must ensure that [`Vehicle`] with the provided ID exists,
    /// otherwise accessing this [`Vehicle`] will result with an error.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            vehicle: OnceCell::new(),
        }
    }

    /// Returns the [`domain::Vehicle`] representing this [`Vehicle`].
    ///
    /// # Errors
    ///
    /// Error if the [`domain::Vehicle`] doesn't exist.
    async fn vehicle(&self, ctx: &Context) -> Result<&domain::Vehicle, Error> {
        let id = self.id.into();
        self.vehicle
            .get_or_try_init(|| {
                ctx.service()
                    .execute(query::vehicle::ById::by(id))
                    .map_err(AsError::into_error)
                    .map_err(ctx.error())
                    .and_then(|v| {
                        future::ready(
                            v.ok_or_else(|| {
                                api::VehicleError::NotExists.into()
                            })
                            .map_err(ctx.error()),
                        )
                    })
            })
            .await
    }
}

/// A vehicle registered by a `User`.
#[graphql_object(context = Context)]
impl Vehicle {
    /// Unique identifier of this `Vehicle`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Vehicle.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.id
    }

    /// License plate of this `Vehicle`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Vehicle.licensePlate",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn license_plate(
        &self,
        ctx: &Context,
    ) -> Result<LicensePlate, Error> {
        Ok(self.vehicle(ctx).await?.license_plate.clone().into())
    }

    /// Category of this `Vehicle` the parking rate depends on.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Vehicle.category",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn category(&self, ctx: &Context) -> Result<Category, Error> {
        Ok(self.vehicle(ctx).await?.category.clone().into())
    }

    /// Phone notified about this `Vehicle` parking.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Vehicle.phone",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn phone(
        &self,
        ctx: &Context,
    ) -> Result<api::user::Phone, Error> {
        Ok(self.vehicle(ctx).await?.phone.clone().into())
    }

    /// `User` owning this `Vehicle`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Vehicle.owner",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn owner(&self, ctx: &Context) -> Result<api::User, Error> {
        let user_id = self.vehicle(ctx).await?.user_id;
        #[expect(
            unsafe_code,
            reason = "`Vehicle` loaded from repository guarantees `User` \
                      existence"
        )]
        let owner = unsafe { api::User::new_unchecked(user_id) };
        Ok(owner)
    }

    /// `Slot` this `Vehicle` is parked in, if any.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Vehicle.slotId",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn slot_id(
        &self,
        ctx: &Context,
    ) -> Result<Option<api::slot::Id>, Error> {
        Ok(self.vehicle(ctx).await?.slot_id().map(Into::into))
    }

    /// `DateTime` when this `Vehicle` entered its `Slot`, if parked.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Vehicle.enteredAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn entered_at(
        &self,
        ctx: &Context,
    ) -> Result<Option<DateTime>, Error> {
        Ok(self
            .vehicle(ctx)
            .await?
            .parking
            .map(|p| p.entered_at.coerce()))
    }

    /// `DateTime` when this `Vehicle` was registered.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Vehicle.createdAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn created_at(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.vehicle(ctx).await?.created_at.coerce())
    }
}

/// Unique identifier of a `Vehicle`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::vehicle::Id)]
#[into(domain::vehicle::Id)]
#[graphql(name = "VehicleId", transparent)]
pub struct Id(Uuid);

/// License plate of a `Vehicle`.
///
/// Upper-cased on input.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "VehicleLicensePlate",
    with = scalar::Via::<domain::vehicle::LicensePlate>,
)]
pub struct LicensePlate(domain::vehicle::LicensePlate);

/// Category of a `Vehicle` (`2-wheeler`, `4-wheeler`, `bicycle`, etc).
///
/// Lower-cased on input.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "VehicleCategory",
    with = scalar::Via::<domain::vehicle::Category>,
)]
pub struct Category(domain::vehicle::Category);
