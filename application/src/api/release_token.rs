//! [`ReleaseToken`]-related definitions.

use common::DateTime;
use derive_more::{Display, From, Into};
use juniper::{graphql_object, GraphQLScalar};
use service::{domain, read};
use uuid::Uuid;

use crate::{api, Context};

/// Single-use capability to release a parked `Vehicle` via a link.
#[derive(Clone, Copy, Debug, From)]
pub struct ReleaseToken(domain::ReleaseToken);

/// Single-use capability to release a parked `Vehicle` via a link.
#[graphql_object(context = Context)]
impl ReleaseToken {
    /// Unique identifier of this `ReleaseToken`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "ReleaseToken.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// Link redeeming this `ReleaseToken` once followed.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "ReleaseToken.link",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn link(&self, ctx: &Context) -> String {
        ctx.service().release_link(self.0.id)
    }

    /// ID of the `Slot` this `ReleaseToken` frees.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "ReleaseToken.slotId",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn slot_id(&self) -> api::slot::Id {
        self.0.slot_id.into()
    }

    /// ID of the `Vehicle` this `ReleaseToken` releases.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "ReleaseToken.vehicleId",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn vehicle_id(&self) -> api::vehicle::Id {
        self.0.vehicle_id.into()
    }

    /// `DateTime` when this `ReleaseToken` was minted.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "ReleaseToken.createdAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }

    /// `DateTime` when this `ReleaseToken` stops working.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "ReleaseToken.expiresAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn expires_at(&self) -> DateTime {
        self.0.expires_at.coerce()
    }

    /// Indicator whether this `ReleaseToken` has been redeemed already.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "ReleaseToken.used",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn used(&self) -> bool {
        self.0.used
    }
}

/// What redeeming a `ReleaseToken` would release.
#[derive(Clone, Copy, Debug, From)]
pub struct Preview(read::release_token::Preview);

/// What redeeming a `ReleaseToken` would release.
#[graphql_object(name = "ReleaseTokenPreview", context = Context)]
impl Preview {
    /// ID of the `Slot` to be freed.
    pub fn slot_id(&self) -> api::slot::Id {
        self.0.slot_id.into()
    }

    /// `DateTime` when the `ReleaseToken` stops working.
    pub fn expires_at(&self) -> DateTime {
        self.0.expires_at.coerce()
    }
}

/// Unique identifier of a `ReleaseToken`.
///
/// Unguessable, so knowing it is enough to release the `Vehicle`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::release_token::Id)]
#[into(domain::release_token::Id)]
#[graphql(name = "ReleaseTokenId", transparent)]
pub struct Id(Uuid);
