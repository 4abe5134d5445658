//! [`NonTx`] client definitions.

use tokio_postgres::{types::ToSql, Row, ToStatement};
use tracerr::Traced;

use crate::infra::database::{
    self,
    postgres::{self, connection, Connection},
};

use super::Tx;

/// Non-transactional Postgres database client.
///
/// Every statement runs in a separate connection taken from the
/// [`connection::Pool`].
#[derive(Clone, Debug)]
pub struct NonTx {
    /// [`connection::Pool`] to take connections from.
    pool: connection::Pool,
}

impl NonTx {
    /// Creates a new [`NonTx`] client upon the provided [`connection::Pool`].
    #[must_use]
    pub(crate) fn from_pool(pool: connection::Pool) -> Self {
        Self { pool }
    }

    /// Takes a connection from the [`connection::Pool`].
    ///
    /// # Errors
    ///
    /// If the [`connection::Pool`] fails to provide one.
    pub(crate) async fn connection(
        &self,
    ) -> Result<connection::NonTx, Traced<database::Error>> {
        self.pool
            .get()
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }

    /// Begins a new [`Tx`] in a separate connection.
    ///
    /// # Errors
    ///
    /// If failed to take a connection or to issue `BEGIN`.
    pub async fn begin(&self) -> Result<Tx, Traced<database::Error>> {
        let conn = self.connection().await.map_err(tracerr::wrap!())?;
        connection::Tx::begin(conn)
            .await
            .map(Tx::new)
            .map_err(tracerr::wrap!())
    }
}

impl Connection for NonTx {
    async fn query<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        let conn = self.connection().await.map_err(tracerr::wrap!())?;
        conn.query(stmt, params)
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }

    async fn query_opt<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Option<Row>, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        let conn = self.connection().await.map_err(tracerr::wrap!())?;
        conn.query_opt(stmt, params)
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }

    async fn exec<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        let conn = self.connection().await.map_err(tracerr::wrap!())?;
        conn.execute(stmt, params)
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}
