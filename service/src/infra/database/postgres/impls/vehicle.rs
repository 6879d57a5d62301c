//! [`Vehicle`]-related [`Database`] implementations.

use common::operations::{By, Delete, Insert, Lock, Select};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        slot,
        vehicle::{self, Parking},
        Vehicle,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl From<&Row> for Vehicle {
    fn from(row: &Row) -> Self {
        let slot_id: Option<slot::Id> = row.get("parked_slot");
        let entered_at: Option<vehicle::EntryDateTime> = row.get("entry_time");
        Self {
            id: row.get("id"),
            license_plate: row.get("license_plate"),
            user_id: row.get("user_id"),
            category: row.get("category"),
            phone: row.get("phone"),
            parking: slot_id
                .zip(entered_at)
                .map(|(slot_id, entered_at)| Parking {
                    slot_id,
                    entered_at,
                }),
            created_at: row.get("created_at"),
        }
    }
}

impl<C> Database<Select<By<Option<Vehicle>, vehicle::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Vehicle>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Vehicle>, vehicle::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            SELECT id, license_plate, \
                   user_id, category, phone, \
                   parked_slot, entry_time, \
                   created_at \
            FROM vehicles \
            WHERE id = $1::UUID";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(Vehicle::from))
    }
}

impl<C> Database<Insert<Vehicle>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(vehicle): Insert<Vehicle>,
    ) -> Result<Self::Ok, Self::Err> {
        let Vehicle {
            id,
            license_plate,
            user_id,
            category,
            phone,
            parking,
            created_at,
        } = vehicle;
        let parked_slot = parking.map(|p| p.slot_id);
        let entry_time = parking.map(|p| p.entered_at);

        const SQL: &str = "\
            INSERT INTO vehicles (\
                id, license_plate, \
                user_id, category, phone, \
                parked_slot, entry_time, \
                created_at\
            ) \
            VALUES (\
                $1::UUID, $2::VARCHAR, \
                $3::UUID, $4::VARCHAR, $5::VARCHAR, \
                $6::INT4, $7::TIMESTAMPTZ, \
                $8::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET license_plate = EXCLUDED.license_plate, \
                category = EXCLUDED.category, \
                phone = EXCLUDED.phone, \
                parked_slot = EXCLUDED.parked_slot, \
                entry_time = EXCLUDED.entry_time";
        self.exec(
            SQL,
            &[
                &id,
                &license_plate,
                &user_id,
                &category,
                &phone,
                &parked_slot,
                &entry_time,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Vehicle, vehicle::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Vehicle, vehicle::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM vehicles \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Delete<By<Vehicle, vehicle::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Vehicle, vehicle::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        // `release_tokens` of the `Vehicle` are removed by `ON DELETE CASCADE`.
        const SQL: &str = "\
            DELETE FROM vehicles \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
