//! [`Command`] for cancelling a [`Commission`].

use common::operations::{By, Commit, Lock, Select, Transact, Transacted, Update};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        access::{self, Action, Resource},
        affiliate::{commission, ledger, Commission},
        user, Actor, User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for cancelling an unpaid [`Commission`].
///
/// Amount of an approved [`Commission`] is debited from its [`Partner`]'s
/// total earnings.
///
/// [`Partner`]: crate::domain::affiliate::Partner
#[derive(Clone, Copy, Debug)]
pub struct CancelCommission {
    /// ID of the [`Commission`] to be cancelled.
    pub commission_id: commission::Id,

    /// ID of the [`User`] cancelling the [`Commission`].
    pub initiator_id: user::Id,
}

impl<Db> Command<CancelCommission> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Commission, commission::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Commission>, commission::Id>>,
            Ok = Option<Commission>,
            Err = Traced<database::Error>,
        > + Database<Update<ledger::Entry>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Commission;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CancelCommission,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CancelCommission {
            commission_id,
            initiator_id,
        } = cmd;

        let initiator = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(initiator_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(initiator_id))
            .map_err(tracerr::wrap!())?;

        if !access::can_perform(
            &Actor::from(&initiator),
            Action::ManageAffiliates,
            Resource::None,
        ) {
            return Err(tracerr::new!(E::Forbidden(initiator_id)));
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::<Commission, _>::new(commission_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let entry = tx
            .execute(Select(By::<Option<Commission>, _>::new(commission_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::CommissionNotExists(commission_id))
            .map_err(tracerr::wrap!())?
            .cancel()
            .map_err(tracerr::from_and_wrap!(=> E))?;
        let commission = entry.commission().clone();

        tx.execute(Update(entry))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(commission)
    }
}

/// Error of [`CancelCommission`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Commission`] with the provided ID does not exist.
    #[display("`Commission(id: {_0})` does not exist")]
    #[from(ignore)]
    CommissionNotExists(#[error(not(source))] commission::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`User`] is not allowed to manage affiliates.
    #[display("`User(id: {_0})` is not allowed to manage affiliates")]
    #[from(ignore)]
    Forbidden(#[error(not(source))] user::Id),

    /// [`Commission`] is paid or cancelled already.
    #[display("{_0}")]
    Transition(commission::TransitionError),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}
