//! [`Slot`]-related [`Database`] implementations.

use common::operations::{By, Claim, Insert, Lock, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{slot, vehicle, Slot},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

impl From<&Row> for Slot {
    fn from(row: &Row) -> Self {
        Self {
            id: row.get("id"),
            vehicle_id: row.get("vehicle_id"),
        }
    }
}

impl<C> Database<Insert<slot::PoolSize>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(size): Insert<slot::PoolSize>,
    ) -> Result<Self::Ok, Self::Err> {
        let count = i32::from(u16::from(size));

        const SQL: &str = "\
            INSERT INTO slots (id, occupied, vehicle_id) \
            SELECT id, FALSE, NULL \
            FROM generate_series(1, $1::INT4) AS id \
            ON CONFLICT (id) DO NOTHING";
        self.exec(SQL, &[&count])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Select<By<Option<Slot>, slot::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Slot>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Slot>, slot::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            SELECT id, vehicle_id \
            FROM slots \
            WHERE id = $1::INT4";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(Slot::from))
    }
}

impl<C> Database<Select<By<Vec<Slot>, read::slot::list::Filter>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Slot>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Slot>, read::slot::list::Filter>>,
    ) -> Result<Self::Ok, Self::Err> {
        use read::slot::list::Filter;

        let occupied = match by.into_inner() {
            Filter::All => None,
            Filter::Occupied => Some(true),
            Filter::Vacant => Some(false),
        };

        const SQL: &str = "\
            SELECT id, vehicle_id \
            FROM slots \
            WHERE $1::BOOL IS NULL OR occupied = $1::BOOL \
            ORDER BY id ASC";
        Ok(self
            .query(SQL, &[&occupied])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(Slot::from)
            .collect())
    }
}

impl<C> Database<Claim<By<Option<slot::Id>, vehicle::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<slot::Id>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Claim(by): Claim<By<Option<slot::Id>, vehicle::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let vehicle_id = by.into_inner();

        // Concurrent claims skip the rows locked by each other, so none of
        // them waits and none of them takes an already taken slot.
        const SQL: &str = "\
            UPDATE slots \
            SET occupied = TRUE, \
                vehicle_id = $1::UUID \
            WHERE id = (\
                SELECT id \
                FROM slots \
                WHERE NOT occupied \
                ORDER BY id ASC \
                LIMIT 1 \
                FOR UPDATE SKIP LOCKED\
            ) \
            RETURNING id";
        Ok(self
            .query_opt(SQL, &[&vehicle_id])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| row.get("id")))
    }
}

impl<C> Database<Claim<Slot>> for Postgres<C>
where
    C: Connection,
{
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Claim(slot): Claim<Slot>,
    ) -> Result<Self::Ok, Self::Err> {
        let occupied = slot.is_occupied();
        let Slot { id, vehicle_id } = slot;

        // A concurrent claimer waits for the row lock and then re-checks
        // `NOT occupied`, so only one of them succeeds.
        const SQL: &str = "\
            UPDATE slots \
            SET occupied = $2::BOOL, \
                vehicle_id = $3::UUID \
            WHERE id = $1::INT4 \
              AND NOT occupied \
            RETURNING id";
        Ok(self
            .query_opt(SQL, &[&id, &occupied, &vehicle_id])
            .await
            .map_err(tracerr::wrap!())?
            .is_some())
    }
}

impl<C> Database<Lock<By<Slot, slot::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Slot, slot::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM slots \
            WHERE id = $1::INT4 \
            FOR UPDATE";
        self.query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Update<Slot>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(slot): Update<Slot>,
    ) -> Result<Self::Ok, Self::Err> {
        let occupied = slot.is_occupied();
        let Slot { id, vehicle_id } = slot;

        const SQL: &str = "\
            UPDATE slots \
            SET occupied = $2::BOOL, \
                vehicle_id = $3::UUID \
            WHERE id = $1::INT4";
        self.exec(SQL, &[&id, &occupied, &vehicle_id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
