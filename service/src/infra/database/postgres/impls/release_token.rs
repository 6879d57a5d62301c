//! [`ReleaseToken`]-related [`Database`] implementations.

use common::operations::{By, Consume, Delete, Insert, Select};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{release_token, vehicle, ReleaseToken},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

impl From<&Row> for ReleaseToken {
    fn from(row: &Row) -> Self {
        Self {
            id: row.get("id"),
            vehicle_id: row.get("vehicle_id"),
            slot_id: row.get("slot_id"),
            created_at: row.get("created_at"),
            expires_at: row.get("expires_at"),
            used: row.get("used"),
        }
    }
}

impl<C> Database<Insert<ReleaseToken>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(token): Insert<ReleaseToken>,
    ) -> Result<Self::Ok, Self::Err> {
        let ReleaseToken {
            id,
            vehicle_id,
            slot_id,
            created_at,
            expires_at,
            used,
        } = token;

        const SQL: &str = "\
            INSERT INTO release_tokens (\
                id, vehicle_id, slot_id, \
                created_at, expires_at, used\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::INT4, \
                $4::TIMESTAMPTZ, $5::TIMESTAMPTZ, $6::BOOL\
            )";
        self.exec(
            SQL,
            &[&id, &vehicle_id, &slot_id, &created_at, &expires_at, &used],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Select<By<Option<ReleaseToken>, release_token::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<ReleaseToken>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<ReleaseToken>, release_token::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            SELECT id, vehicle_id, slot_id, \
                   created_at, expires_at, used \
            FROM release_tokens \
            WHERE id = $1::UUID";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(ReleaseToken::from))
    }
}

impl<C>
    Database<
        Select<By<Option<ReleaseToken>, read::release_token::Outstanding>>,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<ReleaseToken>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Option<ReleaseToken>, read::release_token::Outstanding>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::release_token::Outstanding {
            vehicle_id,
            slot_id,
        } = by.into_inner();

        const SQL: &str = "\
            SELECT id, vehicle_id, slot_id, \
                   created_at, expires_at, used \
            FROM release_tokens \
            WHERE vehicle_id = $1::UUID \
              AND slot_id = $2::INT4 \
              AND NOT used \
              AND expires_at >= NOW() \
            ORDER BY expires_at DESC \
            LIMIT 1";
        Ok(self
            .query_opt(SQL, &[&vehicle_id, &slot_id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(ReleaseToken::from))
    }
}

impl<C> Database<Consume<By<Option<ReleaseToken>, release_token::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<ReleaseToken>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Consume(by): Consume<By<Option<ReleaseToken>, release_token::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        // Of concurrent consumers the row lock lets only the first one see
        // `NOT used`, the others re-check the condition and match nothing.
        const SQL: &str = "\
            UPDATE release_tokens \
            SET used = TRUE \
            WHERE id = $1::UUID \
              AND NOT used \
              AND expires_at >= NOW() \
            RETURNING id, vehicle_id, slot_id, \
                      created_at, expires_at, used";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(ReleaseToken::from))
    }
}

impl<C> Database<Consume<By<Vec<ReleaseToken>, vehicle::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<ReleaseToken>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Consume(by): Consume<By<Vec<ReleaseToken>, vehicle::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let vehicle_id = by.into_inner();

        const SQL: &str = "\
            UPDATE release_tokens \
            SET used = TRUE \
            WHERE vehicle_id = $1::UUID \
              AND NOT used \
            RETURNING id, vehicle_id, slot_id, \
                      created_at, expires_at, used";
        Ok(self
            .query(SQL, &[&vehicle_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(ReleaseToken::from)
            .collect())
    }
}

impl<C> Database<Delete<By<ReleaseToken, release_token::ExpirationDateTime>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = u64;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<
            By<ReleaseToken, release_token::ExpirationDateTime>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let expired_before = by.into_inner();

        const SQL: &str = "\
            DELETE FROM release_tokens \
            WHERE expires_at < $1::TIMESTAMPTZ";
        self.exec(SQL, &[&expired_before])
            .await
            .map_err(tracerr::wrap!())
    }
}
