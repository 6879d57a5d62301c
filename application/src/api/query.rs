//! GraphQL [`Query`]s definitions.

use juniper::graphql_object;
use service::{query, Query as _};

use crate::{api, AsError, Context, Error};

/// Root of all GraphQL queries.
#[derive(Clone, Copy, Debug)]
pub struct Query;

impl Query {
    /// Name of the [`tracing::Span`] for the queries.
    pub(crate) const SPAN_NAME: &'static str = "GraphQL query";
}

#[graphql_object(context = Context)]
impl Query {
    /// Lists the `Slot`s of the parking lot in ascending `SlotId` order.
    #[tracing::instrument(
        skip_all,
        fields(
            filter = ?filter,
            gql.name = "slots",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn slots(
        filter: Option<api::slot::Filter>,
        ctx: &Context,
    ) -> Result<Vec<api::Slot>, Error> {
        ctx.service()
            .execute(query::slots::List::by(
                filter.unwrap_or_default().into(),
            ))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|slots| slots.into_iter().map(Into::into).collect())
    }

    /// Returns the `Slot` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `SLOT_NOT_EXISTS` - the `Slot` with the specified ID does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "slot",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn slot(
        id: api::slot::Id,
        ctx: &Context,
    ) -> Result<api::Slot, Error> {
        ctx.service()
            .execute(query::slot::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| api::SlotError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the `Vehicle` with the specified ID.
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
            gql.name = "vehicle",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn vehicle(
        id: api::vehicle::Id,
        ctx: &Context,
    ) -> Result<api::Vehicle, Error> {
        ctx.authorize_admin()?;

        ctx.service()
            .execute(query::vehicle::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| api::VehicleError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the `User` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `ADMIN_REQUIRED` - the request is not authorized as administrator's;
    /// - `USER_NOT_EXISTS` - the `User` with the specified ID does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "user",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn user(
        id: api::user::Id,
        ctx: &Context,
    ) -> Result<api::User, Error> {
        ctx.authorize_admin()?;

        ctx.service()
            .execute(query::user::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| api::UserError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Previews what redeeming the `ReleaseToken` would release, without
    /// redeeming it.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `TOKEN_NOT_EXISTS` - the `ReleaseToken` does not exist;
    /// - `TOKEN_EXPIRED` - the `ReleaseToken` is expired;
    /// - `TOKEN_ALREADY_USED` - the `ReleaseToken` has been redeemed already.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "releaseTokenPreview",
            otel.name = Self::SPAN_NAME,
            token = %token,
        ),
    )]
    pub async fn release_token_preview(
        token: api::release_token::Id,
        ctx: &Context,
    ) -> Result<api::release_token::Preview, Error> {
        ctx.service()
            .execute(query::release_token::Preview {
                token_id: token.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}

impl AsError for query::release_token::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::TokenAlreadyUsed(_) => api::TokenError::AlreadyUsed.into(),
            Self::TokenExpired(_) => api::TokenError::Expired.into(),
            Self::TokenNotExists(_) => api::TokenError::NotExists.into(),
        })
    }
}

#[cfg(test)]
mod spec {
    use service::{domain::release_token, query};

    use crate::AsError as _;

    #[test]
    fn maps_unredeemable_preview_to_token_errors() {
        use query::release_token::ExecutionError as E;

        let id = release_token::Id::new();
        for (err, code, status) in [
            (
                E::TokenNotExists(id),
                "TOKEN_NOT_EXISTS",
                http::StatusCode::NOT_FOUND,
            ),
            (E::TokenExpired(id), "TOKEN_EXPIRED", http::StatusCode::GONE),
            (
                E::TokenAlreadyUsed(id),
                "TOKEN_ALREADY_USED",
                http::StatusCode::CONFLICT,
            ),
        ] {
            let err = err.as_error();

            assert_eq!(err.code, code);
            assert_eq!(err.status_code, status);
        }
    }
}
