//! [`User`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Insert, Select};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

/// Columns of the `users` table.
const COLUMNS: &str = "\
    id, name, email, password_hash, role, firm_id, is_active, created_at";

/// Reads a [`User`] from the provided [`Row`] of [`COLUMNS`].
fn from_row(row: &Row) -> User {
    User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role: row.get("role"),
        firm_id: row.get("firm_id"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
    }
}

impl<C, IDs> Database<Select<By<HashMap<user::Id, User>, IDs>>> for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[user::Id]>,
{
    type Ok = HashMap<user::Id, User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<user::Id, User>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[user::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM users \
             WHERE id = ANY($1::UUID[])"
        );
        Ok(self
            .query(&sql, &[&ids])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| {
                let user = from_row(row);
                (user.id, user)
            })
            .collect())
    }
}

impl<C> Database<Select<By<Option<User>, user::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<user::Id, User>, [user::Id; 1]>>,
        Ok = HashMap<user::Id, User>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl<'l, C> Database<Select<By<Option<User>, &'l user::Email>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'l user::Email>>,
    ) -> Result<Self::Ok, Self::Err> {
        let email = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM users \
             WHERE email = $1::VARCHAR \
             LIMIT 1"
        );
        Ok(self
            .query_opt(&sql, &[&email])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Insert<User>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(user): Insert<User>,
    ) -> Result<Self::Ok, Self::Err> {
        let User {
            id,
            name,
            email,
            password_hash,
            role,
            firm_id,
            is_active,
            created_at,
        } = user;

        const SQL: &str = "\
            INSERT INTO users (\
                id, name, email, password_hash, \
                role, firm_id, is_active, created_at\
            ) \
            VALUES (\
                $1::UUID, $2::VARCHAR, $3::VARCHAR, $4::VARCHAR, \
                $5::VARCHAR, $6::UUID, $7::BOOLEAN, $8::TIMESTAMPTZ\
            )";
        self.exec(
            SQL,
            &[
                &id,
                &name,
                &email,
                &password_hash,
                &role,
                &firm_id,
                &is_active,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}
