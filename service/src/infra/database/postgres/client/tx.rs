//! [`Tx`] client definitions.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_postgres::{types::ToSql, Row, ToStatement};
use tracerr::Traced;

use crate::infra::database::{
    self,
    postgres::{self, connection, Connection},
};

/// Transactional Postgres database client.
///
/// Clones share the same [`connection::Tx`]. Dropping the last clone without
/// [`Tx::commit()`] rolls the transaction back.
#[derive(Clone, Debug)]
pub struct Tx {
    /// Running [`connection::Tx`], until committed.
    running: Arc<Mutex<Option<connection::Tx>>>,
}

impl Tx {
    /// Wraps the provided running [`connection::Tx`].
    #[must_use]
    pub(super) fn new(tx: connection::Tx) -> Self {
        Self {
            running: Arc::new(Mutex::new(Some(tx))),
        }
    }

    /// Commits this [`Tx`].
    ///
    /// # Errors
    ///
    /// If this [`Tx`] has been committed already, or `COMMIT` fails.
    pub async fn commit(&self) -> Result<(), Traced<database::Error>> {
        self.running
            .lock()
            .await
            .take()
            .ok_or(postgres::Error::TxFinished)
            .map_err(tracerr::from_and_wrap!(=> database::Error))?
            .commit()
            .await
            .map_err(tracerr::wrap!())
    }
}

/// Returns the [`connection::Transaction`] of the provided running
/// [`connection::Tx`].
fn transaction(
    running: &Option<connection::Tx>,
) -> Result<&connection::Transaction<'_>, Traced<database::Error>> {
    running
        .as_ref()
        .and_then(connection::Tx::transaction)
        .ok_or(postgres::Error::TxFinished)
        .map_err(tracerr::from_and_wrap!(=> database::Error))
}

impl Connection for Tx {
    async fn query<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        let running = self.running.lock().await;
        transaction(&running)
            .map_err(tracerr::wrap!())?
            .query(stmt, params)
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
        let running = self.running.lock().await;
        transaction(&running)
            .map_err(tracerr::wrap!())?
            .query_opt(stmt, params)
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
        let running = self.running.lock().await;
        transaction(&running)
            .map_err(tracerr::wrap!())?
            .execute(stmt, params)
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}
