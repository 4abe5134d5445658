//! In-memory [`Database`] implementation.
//!
//! Keeps the whole [`State`] behind a single asynchronous mutex: a
//! transaction holds the mutex from [`Transact`] until [`Commit`] (or drop),
//! works upon a draft copy of the [`State`] and writes it back on [`Commit`].
//!
//! [`Commit`]: common::operations::Commit
//! [`Transact`]: common::operations::Transact

mod impls;

use std::{collections::HashMap, future::Future, sync::Arc};

use derive_more::{Deref, Display, Error as StdError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracerr::Traced;

#[cfg(doc)]
use crate::infra::Database;
use crate::{
    domain::{
        affiliate::{self, commission, referral, Commission, Referral},
        claim, earning, firm, notification, user, Claim, Earning, Firm,
        Notification, User,
    },
    infra::database,
};

/// In-memory [`Database`] client.
#[derive(Clone, Debug, Default, Deref)]
pub struct Memory<C = NonTx>(C);

impl Memory {
    /// Creates a new empty [`Memory`] database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Data stored in a [`Memory`] database.
#[derive(Clone, Debug, Default)]
pub struct State {
    /// Stored [`User`]s.
    pub(crate) users: HashMap<user::Id, User>,

    /// Stored [`Firm`]s.
    pub(crate) firms: HashMap<firm::Id, Firm>,

    /// Stored [`firm::Connection`]s.
    pub(crate) connections: HashMap<firm::connection::Id, firm::Connection>,

    /// Stored [`Claim`]s.
    pub(crate) claims: HashMap<claim::Id, Claim>,

    /// Last allocated [`claim::Number`] sequence per year.
    pub(crate) claim_numbers: HashMap<i32, u32>,

    /// Stored [`Earning`]s.
    pub(crate) earnings: HashMap<earning::Id, Earning>,

    /// Stored [`affiliate::Partner`]s.
    pub(crate) partners: HashMap<affiliate::Id, affiliate::Partner>,

    /// Stored [`Referral`]s.
    pub(crate) referrals: HashMap<referral::Id, Referral>,

    /// Stored [`Commission`]s.
    pub(crate) commissions: HashMap<commission::Id, Commission>,

    /// Stored [`Notification`]s.
    pub(crate) notifications: HashMap<notification::Id, Notification>,
}

/// Access to the [`State`] of a [`Memory`] database.
pub trait Store {
    /// Runs the provided function upon the [`State`].
    ///
    /// # Errors
    ///
    /// If the [`State`] is not accessible anymore (the transaction has been
    /// finished).
    fn with<R>(
        &self,
        f: impl FnOnce(&mut State) -> R,
    ) -> impl Future<Output = Result<R, Traced<database::Error>>>;
}

/// Non-transactional [`Memory`] client.
#[derive(Clone, Debug, Default)]
pub struct NonTx {
    /// Shared [`State`] of the database.
    state: Arc<Mutex<State>>,
}

impl NonTx {
    /// Starts a new [`Tx`], waiting for the currently running one to finish.
    async fn begin(&self) -> Tx {
        let committed = Arc::clone(&self.state).lock_owned().await;
        let draft = committed.clone();
        Tx {
            staged: Arc::new(Mutex::new(Some(Staged { committed, draft }))),
        }
    }
}

impl Store for NonTx {
    async fn with<R>(
        &self,
        f: impl FnOnce(&mut State) -> R,
    ) -> Result<R, Traced<database::Error>> {
        Ok(f(&mut *self.state.lock().await))
    }
}

/// Transactional [`Memory`] client.
#[derive(Clone, Debug)]
pub struct Tx {
    /// [`Staged`] changes, until committed.
    staged: Arc<Mutex<Option<Staged>>>,
}

/// Changes staged in a [`Tx`].
#[derive(Debug)]
struct Staged {
    /// Exclusively held committed [`State`].
    committed: OwnedMutexGuard<State>,

    /// Draft [`State`] the [`Tx`] works upon.
    draft: State,
}

impl Tx {
    /// Commits this [`Tx`].
    ///
    /// # Errors
    ///
    /// If this [`Tx`] has been committed already.
    pub async fn commit(&self) -> Result<(), Traced<database::Error>> {
        let Staged {
            mut committed,
            draft,
        } = self
            .staged
            .lock()
            .await
            .take()
            .ok_or(Error::TxFinished)
            .map_err(tracerr::from_and_wrap!(=> database::Error))?;
        *committed = draft;
        Ok(())
    }
}

impl Store for Tx {
    async fn with<R>(
        &self,
        f: impl FnOnce(&mut State) -> R,
    ) -> Result<R, Traced<database::Error>> {
        let mut staged = self.staged.lock().await;
        let staged = staged
            .as_mut()
            .ok_or(Error::TxFinished)
            .map_err(tracerr::from_and_wrap!(=> database::Error))?;
        Ok(f(&mut staged.draft))
    }
}

/// [`Memory`] database error.
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// Transaction has been committed already.
    #[display("Transaction is finished already")]
    TxFinished,

    /// Unique constraint is violated.
    #[display("Unique constraint `{_0}` is violated")]
    UniqueViolation(#[error(not(source))] &'static str),
}

impl Error {
    /// Checks if the error is a unique violation of the specified constraint
    /// (any one, if [`None`]).
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            Self::UniqueViolation(c) => constraint.map_or(true, |n| n == *c),
            Self::TxFinished => false,
        }
    }
}

/// Fails with [`Error::UniqueViolation`] of the provided `constraint` if
/// `occupied`.
fn ensure_unique(
    occupied: bool,
    constraint: &'static str,
) -> Result<(), Traced<database::Error>> {
    if occupied {
        return Err(tracerr::new!(Error::UniqueViolation(constraint)))
            .map_err(tracerr::map_from);
    }
    Ok(())
}
