//! [`Notification`]-related [`Database`] implementations.

use common::operations::{By, Insert, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{notification, Notification},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Columns of the `notifications` table.
const COLUMNS: &str = "id, user_id, title, content, kind, is_read, created_at";

/// Reads a [`Notification`] from the provided [`Row`] of [`COLUMNS`].
fn from_row(row: &Row) -> Notification {
    Notification {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        content: row.get("content"),
        kind: row.get("kind"),
        is_read: row.get("is_read"),
        created_at: row.get("created_at"),
    }
}

impl<C> Database<Select<By<Option<Notification>, notification::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Notification>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Notification>, notification::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM notifications \
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

impl<C> Database<Select<By<Vec<Notification>, read::notification::Filter>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Notification>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Notification>, read::notification::Filter>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::notification::Filter {
            user_id,
            unread_only,
        } = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM notifications \
             WHERE user_id = $1::UUID \
               AND (NOT $2::BOOLEAN OR NOT is_read) \
             ORDER BY created_at DESC"
        );
        Ok(self
            .query(&sql, &[&user_id, &unread_only])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Insert<Notification>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Update<Notification>,
        Ok = (),
        Err = Traced<database::Error>,
    >,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(notification): Insert<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(notification))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Notification>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(notification): Update<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        let Notification {
            id,
            user_id,
            title,
            content,
            kind,
            is_read,
            created_at,
        } = notification;

        let sql = format!(
            "INSERT INTO notifications ({COLUMNS}) \
             VALUES (\
                 $1::UUID, $2::UUID, $3::VARCHAR, $4::TEXT, \
                 $5::VARCHAR, $6::BOOLEAN, $7::TIMESTAMPTZ\
             ) \
             ON CONFLICT (id) DO UPDATE \
             SET is_read = EXCLUDED.is_read"
        );
        self.exec(
            &sql,
            &[
                &id,
                &user_id,
                &title,
                &content,
                &kind,
                &is_read,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}
