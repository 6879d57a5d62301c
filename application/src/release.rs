//! Plain HTTP endpoints the release links sent to drivers lead to.
//!
//! `GET /release/{token}` previews what the link releases, while
//! `POST /release/{token}` redeems it.

use std::time::Duration;

use axum::{extract::Path, Extension, Json};
use common::Currency;
use rust_decimal::Decimal;
use serde::Serialize;
use service::{
    command::{self, Command as _},
    domain::{self, release_token, slot, vehicle},
    query::{self, Query as _},
    read,
};
use tracing as log;

use crate::{api, AsError, Error, Service};

/// Preview of a release link.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preview {
    /// ID of the [`Slot`] to be freed.
    ///
    /// [`Slot`]: domain::Slot
    pub slot_id: slot::Id,

    /// Moment the link stops working.
    pub expires_at: release_token::ExpirationDateTime,
}

impl From<read::release_token::Preview> for Preview {
    fn from(preview: read::release_token::Preview) -> Self {
        Self {
            slot_id: preview.slot_id,
            expires_at: preview.expires_at,
        }
    }
}

/// [`domain::Bill`] of a parking released via a link.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    /// ID of the freed [`Slot`].
    ///
    /// [`Slot`]: domain::Slot
    pub slot_id: slot::Id,

    /// Category of the released [`Vehicle`].
    ///
    /// [`Vehicle`]: domain::Vehicle
    pub category: String,

    /// Moment the [`Vehicle`] entered the [`Slot`].
    ///
    /// [`Slot`]: domain::Slot
    /// [`Vehicle`]: domain::Vehicle
    pub entered_at: vehicle::EntryDateTime,

    /// Moment the [`Vehicle`] left the [`Slot`].
    ///
    /// [`Slot`]: domain::Slot
    /// [`Vehicle`]: domain::Vehicle
    pub exited_at: vehicle::ExitDateTime,

    /// Number of whole minutes billed.
    pub billed_minutes: u64,

    /// Hourly rate applied.
    pub rate: Decimal,

    /// Charged amount.
    pub amount: Decimal,

    /// Currency of the `rate` and the `amount`.
    pub currency: Currency,
}

impl From<domain::Bill> for Bill {
    fn from(bill: domain::Bill) -> Self {
        Self {
            slot_id: bill.slot_id,
            category: bill.category.to_string(),
            entered_at: bill.entered_at,
            exited_at: bill.exited_at,
            billed_minutes: minutes(bill.billed_duration),
            rate: bill.rate.amount,
            amount: bill.amount.amount,
            currency: bill.amount.currency,
        }
    }
}

/// Rounds the provided [`Duration`] up to whole minutes.
pub(crate) fn minutes(duration: Duration) -> u64 {
    duration.as_secs().div_ceil(60)
}

/// Parses the release token ID out of the path.
///
/// Malformed IDs are reported the same way as the unknown ones.
fn token_id(raw: &str) -> Result<release_token::Id, Error> {
    raw.parse().map_err(|_| api::TokenError::NotExists.into())
}

/// Previews what the release link with the provided token releases.
///
/// # Errors
///
/// With `TOKEN_NOT_EXISTS`, `TOKEN_EXPIRED` or `TOKEN_ALREADY_USED` if the
/// link cannot be used.
#[tracing::instrument(skip_all, fields(token = %token))]
pub async fn preview(
    Extension(service): Extension<Service>,
    Path(token): Path<String>,
) -> Result<Json<Preview>, Error> {
    let token_id = token_id(&token)?;
    service
        .execute(query::release_token::Preview { token_id })
        .await
        .map_err(AsError::into_error)
        .map(|p| Json(p.into()))
}

/// Redeems the release link with the provided token, freeing the slot and
/// returning the [`Bill`].
///
/// # Errors
///
/// With `TOKEN_NOT_EXISTS`, `TOKEN_EXPIRED` or `TOKEN_ALREADY_USED` if the
/// link cannot be used.
#[tracing::instrument(skip_all, fields(token = %token))]
pub async fn redeem(
    Extension(service): Extension<Service>,
    Path(token): Path<String>,
) -> Result<Json<Bill>, Error> {
    let token_id = token_id(&token)?;
    let bill = service
        .execute(command::RedeemReleaseToken { token_id })
        .await
        .map_err(AsError::into_error)?;
    log::info!(
        "`Slot(id: {})` released via link, billed {}",
        bill.slot_id,
        bill.amount,
    );
    Ok(Json(bill.into()))
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use super::{minutes, token_id};

    #[test]
    fn bills_started_minutes() {
        assert_eq!(minutes(Duration::ZERO), 0);
        assert_eq!(minutes(Duration::from_secs(15 * 60)), 15);
        assert_eq!(minutes(Duration::from_secs(15 * 60 + 1)), 16);
    }

    #[test]
    fn rejects_malformed_token_as_unknown() {
        let err = token_id("not-a-uuid").unwrap_err();

        assert_eq!(err.code, "TOKEN_NOT_EXISTS");
        assert_eq!(err.status_code, http::StatusCode::NOT_FOUND);
        assert!(token_id("67e55044-10b1-426f-9247-bb680e5fe0c8").is_ok());
    }
}
