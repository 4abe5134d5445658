//! [`Claim`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{
    By, Delete, Expecting, Insert, Lock, Next, Select, Update,
};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{access::Visibility, claim, Claim},
    infra::{
        database::{
            self,
            postgres::{Connection, FuzzPattern},
            Postgres,
        },
        Database,
    },
    read::claim::list,
};

/// Columns of the `claims` table.
const COLUMNS: &str = "\
    id, number, kind, status, priority, \
    title, description, \
    estimated_value, final_value, adjuster_fee, \
    street, city, state, zip_code, \
    incident_at, reported_at, deadline, completed_at, \
    firm_id, adjuster_id, \
    created_at, updated_at";

/// Reads a [`Claim`] from the provided [`Row`] of [`COLUMNS`].
fn from_row(row: &Row) -> Claim {
    Claim {
        id: row.get("id"),
        number: row.get("number"),
        kind: row.get("kind"),
        status: row.get("status"),
        priority: row.get("priority"),
        title: row.get("title"),
        description: row.get("description"),
        estimated_value: row.get("estimated_value"),
        final_value: row.get("final_value"),
        adjuster_fee: row.get("adjuster_fee"),
        address: claim::Address {
            street: row.get("street"),
            city: row.get("city"),
            state: row.get("state"),
            zip_code: row.get("zip_code"),
        },
        incident_at: row.get("incident_at"),
        reported_at: row.get("reported_at"),
        deadline: row.get("deadline"),
        completed_at: row.get("completed_at"),
        firm_id: row.get("firm_id"),
        adjuster_id: row.get("adjuster_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl<C, IDs> Database<Select<By<HashMap<claim::Id, Claim>, IDs>>>
    for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[claim::Id]>,
{
    type Ok = HashMap<claim::Id, Claim>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<claim::Id, Claim>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[claim::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM claims \
             WHERE id = ANY($1::UUID[])"
        );
        Ok(self
            .query(&sql, &[&ids])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| {
                let claim = from_row(row);
                (claim.id, claim)
            })
            .collect())
    }
}

impl<C> Database<Select<By<Option<Claim>, claim::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<claim::Id, Claim>, [claim::Id; 1]>>,
        Ok = HashMap<claim::Id, Claim>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Claim>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Claim>, claim::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

/// Parameters of a [`Claim`] row, in the [`COLUMNS`] order.
macro_rules! claim_params {
    ($claim:expr) => {{
        let claim = $claim;
        let params: [&(dyn ToSql + Sync); 22] = [
            &claim.id,
            &claim.number,
            &claim.kind,
            &claim.status,
            &claim.priority,
            &claim.title,
            &claim.description,
            &claim.estimated_value,
            &claim.final_value,
            &claim.adjuster_fee,
            &claim.address.street,
            &claim.address.city,
            &claim.address.state,
            &claim.address.zip_code,
            &claim.incident_at,
            &claim.reported_at,
            &claim.deadline,
            &claim.completed_at,
            &claim.firm_id,
            &claim.adjuster_id,
            &claim.created_at,
            &claim.updated_at,
        ];
        params
    }};
}

/// `SET` clause writing all the columns of a [`Claim`] (but its ID) from the
/// [`claim_params!`] parameters.
const SET_COLUMNS: &str = "\
    number = $2::VARCHAR, kind = $3::VARCHAR, \
    status = $4::VARCHAR, priority = $5::VARCHAR, \
    title = $6::VARCHAR, description = $7::TEXT, \
    estimated_value = $8::NUMERIC, final_value = $9::NUMERIC, \
    adjuster_fee = $10::NUMERIC, \
    street = $11::VARCHAR, city = $12::VARCHAR, \
    state = $13::VARCHAR, zip_code = $14::VARCHAR, \
    incident_at = $15::TIMESTAMPTZ, reported_at = $16::TIMESTAMPTZ, \
    deadline = $17::TIMESTAMPTZ, completed_at = $18::TIMESTAMPTZ, \
    firm_id = $19::UUID, adjuster_id = $20::UUID, \
    created_at = $21::TIMESTAMPTZ, updated_at = $22::TIMESTAMPTZ";

impl<C> Database<Insert<Claim>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Claim>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(claim): Insert<Claim>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(claim)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Claim>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(claim): Update<Claim>,
    ) -> Result<Self::Ok, Self::Err> {
        let sql = format!(
            "INSERT INTO claims ({COLUMNS}) \
             VALUES (\
                 $1::UUID, $2::VARCHAR, $3::VARCHAR, $4::VARCHAR, \
                 $5::VARCHAR, $6::VARCHAR, $7::TEXT, \
                 $8::NUMERIC, $9::NUMERIC, $10::NUMERIC, \
                 $11::VARCHAR, $12::VARCHAR, $13::VARCHAR, $14::VARCHAR, \
                 $15::TIMESTAMPTZ, $16::TIMESTAMPTZ, \
                 $17::TIMESTAMPTZ, $18::TIMESTAMPTZ, \
                 $19::UUID, $20::UUID, \
                 $21::TIMESTAMPTZ, $22::TIMESTAMPTZ\
             ) \
             ON CONFLICT (id) DO UPDATE \
             SET {SET_COLUMNS}"
        );
        self.exec(&sql, &claim_params!(&claim))
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Update<Expecting<Claim, claim::Status>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(cas): Update<Expecting<Claim, claim::Status>>,
    ) -> Result<Self::Ok, Self::Err> {
        let Expecting {
            value: claim,
            expected,
        } = cas;

        let sql = format!(
            "UPDATE claims \
             SET {SET_COLUMNS} \
             WHERE id = $1::UUID \
               AND status = $23::VARCHAR"
        );
        let mut params = claim_params!(&claim).to_vec();
        params.push(&expected);
        self.exec(&sql, &params)
            .await
            .map_err(tracerr::wrap!())
            .map(|updated| updated == 1)
    }
}

impl<C> Database<Lock<By<Claim, claim::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Claim, claim::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM claims \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Delete<By<Claim, claim::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Claim, claim::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        // `earnings.claim_id` is cleared by `ON DELETE SET NULL`.
        const SQL: &str = "\
            DELETE FROM claims \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Next<By<claim::Number, i32>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = claim::Number;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Next(by): Next<By<claim::Number, i32>>,
    ) -> Result<Self::Ok, Self::Err> {
        let year = by.into_inner();

        const SQL: &str = "\
            INSERT INTO claim_numbers (year, last) \
            VALUES ($1::INT4, 1) \
            ON CONFLICT (year) DO UPDATE \
            SET last = claim_numbers.last + 1 \
            RETURNING last";
        let rows = self
            .query(SQL, &[&year])
            .await
            .map_err(tracerr::wrap!())?;
        let last = rows.first().map_or(1, |row| row.get::<_, i32>("last"));
        Ok(claim::Number::new(year, last.unsigned_abs()))
    }
}

impl<C> Database<Select<By<list::Page, list::Selector>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<list::Page, list::Selector>>,
    ) -> Result<Self::Ok, Self::Err> {
        let list::Selector {
            arguments,
            filter:
                list::Filter {
                    status,
                    firm_id,
                    adjuster_id,
                    search,
                    visibility,
                },
        } = by.into_inner();

        let limit = i64::try_from(arguments.fetch_limit()).unwrap_or(i64::MAX);

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&limit];
        let mut conditions = Vec::new();

        if let Some(after) = &arguments.after {
            ps.push(after);
            conditions.push(format!("number < ${}::VARCHAR", ps.len()));
        }
        if let Some(status) = &status {
            ps.push(status);
            conditions.push(format!("status = ${}::VARCHAR", ps.len()));
        }
        if let Some(firm_id) = &firm_id {
            ps.push(firm_id);
            conditions.push(format!("firm_id = ${}::UUID", ps.len()));
        }
        if let Some(adjuster_id) = &adjuster_id {
            ps.push(adjuster_id);
            conditions.push(format!("adjuster_id = ${}::UUID", ps.len()));
        }

        let pattern = search.as_ref().map(FuzzPattern::new);
        if let Some(pattern) = &pattern {
            ps.push(pattern);
            conditions.push(format!(
                "(number || ' ' || title || ' ' || \
                  COALESCE(description, '') || ' ' || \
                  COALESCE(city, '')) \
                 ILIKE ANY(${}::VARCHAR[])",
                ps.len(),
            ));
        }

        let available = claim::Status::Available;
        match &visibility {
            Visibility::All => {}
            Visibility::Firm(firm_id) => {
                ps.push(firm_id);
                conditions.push(format!("firm_id = ${}::UUID", ps.len()));
            }
            Visibility::AvailableOr(adjuster_id) => {
                ps.push(&available);
                ps.push(adjuster_id);
                conditions.push(format!(
                    "(status = ${}::VARCHAR OR adjuster_id = ${}::UUID)",
                    ps.len() - 1,
                    ps.len(),
                ));
            }
            Visibility::Nothing => conditions.push("FALSE".to_owned()),
        }

        let sql = format!(
            "SELECT id, number \
             FROM claims \
             {conditions} \
             ORDER BY number DESC \
             LIMIT $1::INT8",
            conditions = conditions
                .iter()
                .enumerate()
                .format_with(" ", |(i, cond), f| {
                    let op = if i == 0 { "WHERE" } else { "AND" };
                    f(&format_args!("{op} {cond}"))
                }),
        );
        let rows = self
            .query(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?;

        Ok(list::Page::new(
            &arguments,
            rows.iter().map(|row| (row.get("number"), row.get("id"))),
        ))
    }
}
