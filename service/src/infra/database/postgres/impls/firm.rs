//! [`Firm`]-related [`Database`] implementations.

use common::operations::{By, Insert, Lock, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{firm, user, Firm},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C> Database<Select<By<Option<Firm>, firm::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Firm>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Firm>, firm::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            SELECT id, name, created_at \
            FROM firms \
            WHERE id = $1::UUID";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| Firm {
                id: row.get("id"),
                name: row.get("name"),
                created_at: row.get("created_at"),
            }))
    }
}

impl<C> Database<Insert<Firm>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(firm): Insert<Firm>,
    ) -> Result<Self::Ok, Self::Err> {
        let Firm {
            id,
            name,
            created_at,
        } = firm;

        const SQL: &str = "\
            INSERT INTO firms (id, name, created_at) \
            VALUES ($1::UUID, $2::VARCHAR, $3::TIMESTAMPTZ)";
        self.exec(SQL, &[&id, &name, &created_at])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

/// Columns of the `firm_connections` table.
const CONNECTION_COLUMNS: &str = "\
    id, adjuster_id, firm_id, status, message, created_at, connected_at";

/// Reads a [`firm::Connection`] from the provided [`Row`] of
/// [`CONNECTION_COLUMNS`].
fn connection_from_row(row: &Row) -> firm::Connection {
    firm::Connection {
        id: row.get("id"),
        adjuster_id: row.get("adjuster_id"),
        firm_id: row.get("firm_id"),
        status: row.get("status"),
        message: row.get("message"),
        created_at: row.get("created_at"),
        connected_at: row.get("connected_at"),
    }
}

impl<C> Database<Select<By<Option<firm::Connection>, firm::connection::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<firm::Connection>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<firm::Connection>, firm::connection::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql = format!(
            "SELECT {CONNECTION_COLUMNS} \
             FROM firm_connections \
             WHERE id = $1::UUID"
        );
        Ok(self
            .query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(connection_from_row))
    }
}

impl<C> Database<Select<By<Option<firm::Connection>, (user::Id, firm::Id)>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<firm::Connection>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<firm::Connection>, (user::Id, firm::Id)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (adjuster_id, firm_id) = by.into_inner();

        let sql = format!(
            "SELECT {CONNECTION_COLUMNS} \
             FROM firm_connections \
             WHERE adjuster_id = $1::UUID \
               AND firm_id = $2::UUID"
        );
        Ok(self
            .query_opt(&sql, &[&adjuster_id, &firm_id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(connection_from_row))
    }
}

impl<C> Database<Insert<firm::Connection>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Update<firm::Connection>,
        Ok = (),
        Err = Traced<database::Error>,
    >,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(conn): Insert<firm::Connection>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(conn)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<firm::Connection>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(conn): Update<firm::Connection>,
    ) -> Result<Self::Ok, Self::Err> {
        let firm::Connection {
            id,
            adjuster_id,
            firm_id,
            status,
            message,
            created_at,
            connected_at,
        } = conn;

        const SQL: &str = "\
            INSERT INTO firm_connections (\
                id, adjuster_id, firm_id, \
                status, message, \
                created_at, connected_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::UUID, \
                $4::VARCHAR, $5::VARCHAR, \
                $6::TIMESTAMPTZ, $7::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET status = EXCLUDED.status, \
                message = EXCLUDED.message, \
                connected_at = EXCLUDED.connected_at";
        self.exec(
            SQL,
            &[
                &id,
                &adjuster_id,
                &firm_id,
                &status,
                &message,
                &created_at,
                &connected_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<firm::Connection, firm::connection::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<firm::Connection, firm::connection::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM firm_connections \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
