//! [`Query`] collection related to a single [`ReleaseToken`].

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        release_token::{self, Unredeemable},
        ReleaseToken,
    },
    infra::{database, Database},
    read,
    Query, Service,
};

/// [`Query`] previewing what redeeming a [`ReleaseToken`] would release,
/// without redeeming it.
#[derive(Clone, Copy, Debug)]
pub struct Preview {
    /// ID of the [`ReleaseToken`] to preview.
    pub token_id: release_token::Id,
}

impl<Db> Query<Preview> for Service<Db>
where
    Db: Database<
        Select<By<Option<ReleaseToken>, release_token::Id>>,
        Ok = Option<ReleaseToken>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = read::release_token::Preview;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        Preview { token_id }: Preview,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let token = self
            .database()
            .execute(Select(By::<Option<ReleaseToken>, _>::new(token_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::TokenNotExists(token_id))
            .map_err(tracerr::wrap!())?;

        token.check_redeemable().map_err(|e| {
            tracerr::new!(match e {
                Unredeemable::Expired => E::TokenExpired(token_id),
                Unredeemable::AlreadyUsed => E::TokenAlreadyUsed(token_id),
            })
        })?;

        Ok(read::release_token::Preview {
            token_id,
            vehicle_id: token.vehicle_id,
            slot_id: token.slot_id,
            expires_at: token.expires_at,
        })
    }
}

/// Error of [`Preview`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`ReleaseToken`] has been used already.
    #[display("`ReleaseToken(id: {_0})` is already used")]
    TokenAlreadyUsed(#[error(not(source))] release_token::Id),

    /// [`ReleaseToken`] is expired.
    #[display("`ReleaseToken(id: {_0})` is expired")]
    TokenExpired(#[error(not(source))] release_token::Id),

    /// [`ReleaseToken`] with the provided ID does not exist.
    #[display("`ReleaseToken(id: {_0})` does not exist")]
    TokenNotExists(#[error(not(source))] release_token::Id),
}
