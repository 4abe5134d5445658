//! [`Earning`]-related [`Database`] implementations.

use common::operations::{By, Delete, Insert, Lock, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{claim, earning, Earning},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Columns of the `earnings` table.
const COLUMNS: &str = "\
    id, user_id, claim_id, amount, kind, status, description, \
    earned_at, paid_at, created_at";

/// Reads an [`Earning`] from the provided [`Row`] of [`COLUMNS`].
fn from_row(row: &Row) -> Earning {
    Earning {
        id: row.get("id"),
        user_id: row.get("user_id"),
        claim_id: row.get("claim_id"),
        amount: row.get("amount"),
        kind: row.get("kind"),
        status: row.get("status"),
        description: row.get("description"),
        earned_at: row.get("earned_at"),
        paid_at: row.get("paid_at"),
        created_at: row.get("created_at"),
    }
}

impl<C> Database<Select<By<Option<Earning>, earning::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Earning>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Earning>, earning::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM earnings \
             WHERE id = $1::UUID"
        );
        Ok(self
            .query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Select<By<Vec<Earning>, read::earning::Filter>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Earning>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Earning>, read::earning::Filter>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::earning::Filter { user_id, status } = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM earnings \
             WHERE user_id = $1::UUID \
               AND ($2::VARCHAR IS NULL OR status = $2::VARCHAR) \
             ORDER BY earned_at DESC, created_at DESC"
        );
        Ok(self
            .query(&sql, &[&user_id, &status])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Insert<Earning>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Earning>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(earning): Insert<Earning>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(earning)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Earning>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(earning): Update<Earning>,
    ) -> Result<Self::Ok, Self::Err> {
        let Earning {
            id,
            user_id,
            claim_id,
            amount,
            kind,
            status,
            description,
            earned_at,
            paid_at,
            created_at,
        } = earning;

        let sql = format!(
            "INSERT INTO earnings ({COLUMNS}) \
             VALUES (\
                 $1::UUID, $2::UUID, $3::UUID, \
                 $4::NUMERIC, $5::VARCHAR, $6::VARCHAR, $7::TEXT, \
                 $8::TIMESTAMPTZ, $9::TIMESTAMPTZ, $10::TIMESTAMPTZ\
             ) \
             ON CONFLICT (id) DO UPDATE \
             SET claim_id = EXCLUDED.claim_id, \
                 amount = EXCLUDED.amount, \
                 kind = EXCLUDED.kind, \
                 status = EXCLUDED.status, \
                 description = EXCLUDED.description, \
                 earned_at = EXCLUDED.earned_at, \
                 paid_at = EXCLUDED.paid_at"
        );
        self.exec(
            &sql,
            &[
                &id,
                &user_id,
                &claim_id,
                &amount,
                &kind,
                &status,
                &description,
                &earned_at,
                &paid_at,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Delete<By<Earning, earning::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Earning, earning::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            DELETE FROM earnings \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Delete<By<read::earning::Pending, claim::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = u64;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<read::earning::Pending, claim::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let claim_id = by.into_inner();

        const SQL: &str = "\
            DELETE FROM earnings \
            WHERE claim_id = $1::UUID \
              AND status = $2::VARCHAR";
        self.exec(SQL, &[&claim_id, &earning::Status::Pending])
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Lock<By<Earning, earning::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Earning, earning::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM earnings \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
