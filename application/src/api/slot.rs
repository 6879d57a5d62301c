//! [`Slot`]-related definitions.

use derive_more::{Display, From, Into};
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::{domain, read};

use crate::{
    api::{self, scalar},
    Context, Error,
};

/// A parking slot.
#[derive(Clone, Copy, Debug, From)]
pub struct Slot(domain::Slot);

/// A parking slot.
#[graphql_object(context = Context)]
impl Slot {
    /// Unique identifier of this `Slot`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Slot.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// Indicator whether this `Slot` is occupied by some `Vehicle`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Slot.occupied",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn occupied(&self) -> bool {
        self.0.is_occupied()
    }

    /// `Vehicle` occupying this `Slot`, if any.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `ADMIN_REQUIRED` - the request is not authorized as administrator's.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Slot.vehicle",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn vehicle(
        &self,
        ctx: &Context,
    ) -> Result<Option<api::Vehicle>, Error> {
        ctx.authorize_admin()?;

        Ok(self.0.vehicle_id.map(|id| {
            #[expect(
                unsafe_code,
                reason = "`Slot` loaded from repository guarantees `Vehicle` \
                          existence"
            )]
            unsafe {
                api::Vehicle::new_unchecked(id)
            }
        }))
    }
}

/// Unique identifier of a `Slot`.
///
/// Always a positive integer.
#[derive(Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "SlotId", with = scalar::ViaInt)]
pub struct Id(domain::slot::Id);

impl From<Id> for i32 {
    fn from(id: Id) -> Self {
        id.0.into()
    }
}

impl TryFrom<i32> for Id {
    type Error = &'static str;

    fn try_from(id: i32) -> Result<Self, Self::Error> {
        domain::slot::Id::new(id)
            .map(Self)
            .ok_or("`SlotId` must be positive")
    }
}

/// Filter of a `Slot`s list.
#[derive(Clone, Copy, Debug, Default, GraphQLEnum)]
#[graphql(name = "SlotFilter")]
pub enum Filter {
    /// All the `Slot`s.
    #[default]
    All,

    /// Only the `Slot`s occupied by some `Vehicle`.
    Occupied,

    /// Only the vacant `Slot`s.
    Vacant,
}

impl From<Filter> for read::slot::list::Filter {
    fn from(filter: Filter) -> Self {
        match filter {
            Filter::All => Self::All,
            Filter::Occupied => Self::Occupied,
            Filter::Vacant => Self::Vacant,
        }
    }
}
