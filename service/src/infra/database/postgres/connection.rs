//! [`Connection`] definitions.

use std::{fmt, future::Future};

use futures::{FutureExt as _, TryFutureExt as _};
use ouroboros::self_referencing;
use tokio_postgres::{types::ToSql, Row, ToStatement};
use tracerr::Traced;

use crate::infra::database::{self, postgres};

pub use deadpool_postgres::{
    Client as NonTx, CreatePoolError as PoolCreationError, Pool, PoolError,
    Transaction,
};
pub use tokio_postgres::Error;

/// Generic database connection.
pub trait Connection {
    /// Queries the provided statement with the given parameters and returns the
    /// resulting rows.
    ///
    /// # Errors
    ///
    /// If failed to query the statement.
    fn query<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = Result<Vec<Row>, Traced<database::Error>>>
    where
        T: ToStatement + ?Sized;

    /// Queries the provided statement with the given parameters and returns the
    /// optional resulting row.
    ///
    /// # Errors
    ///
    /// If failed to query the statement, or it returns more than one row.
    fn query_opt<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = Result<Option<Row>, Traced<database::Error>>>
    where
        T: ToStatement + ?Sized;

    /// Executes the provided statement with the given parameters and returns
    /// the number of affected rows.
    ///
    /// # Errors
    ///
    /// If failed to execute the statement.
    fn exec<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = Result<u64, Traced<database::Error>>>
    where
        T: ToStatement + ?Sized;
}

/// [`Transaction`] running in a pooled [`NonTx`] connection it owns.
#[self_referencing]
pub struct Tx {
    /// [`NonTx`] connection the [`Transaction`] runs in.
    non_tx: NonTx,

    /// [`Transaction`] itself, until committed.
    #[borrows(mut non_tx)]
    #[not_covariant]
    tx: Option<Transaction<'this>>,
}

impl fmt::Debug for Tx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tx")
            .field("committed", &self.transaction().is_none())
            .finish_non_exhaustive()
    }
}

impl Tx {
    /// Begins a new [`Tx`] in the provided [`NonTx`] connection.
    ///
    /// # Errors
    ///
    /// If failed to issue `BEGIN`.
    pub async fn begin(client: NonTx) -> Result<Self, Traced<database::Error>> {
        Self::try_new_async_send(client, |c| {
            c.transaction().map_ok(Some).boxed()
        })
        .await
        .map_err(tracerr::from_and_wrap!(=> postgres::Error))
        .map_err(tracerr::map_from)
    }

    /// Returns the running [`Transaction`], if not committed yet.
    #[must_use]
    pub fn transaction(&self) -> Option<&Transaction<'_>> {
        self.with_tx(|tx| tx.as_ref())
    }

    /// Commits this [`Tx`].
    ///
    /// # Errors
    ///
    /// If this [`Tx`] has been committed already, or `COMMIT` fails.
    pub async fn commit(mut self) -> Result<(), Traced<database::Error>> {
        #[expect(
            clippy::redundant_closure_for_method_calls,
            reason = "different variance, see \
                      https://doc.rust-lang.org/nomicon/subtyping.html#variance"
        )]
        let tx = self.with_tx_mut(|tx| tx.take());
        tx.ok_or(postgres::Error::TxFinished)
            .map_err(tracerr::from_and_wrap!(=> database::Error))?
            .commit()
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}
