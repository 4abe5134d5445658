//! [`Command`] for deleting an [`Earning`].

use common::operations::{
    By, Commit, Delete, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        access::{self, Action, Resource},
        earning, user, Actor, Earning, User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for deleting an unpaid [`Earning`] by its owner.
#[derive(Clone, Copy, Debug)]
pub struct DeleteEarning {
    /// ID of the [`Earning`] to be deleted.
    pub earning_id: earning::Id,

    /// ID of the [`User`] deleting the [`Earning`].
    pub initiator_id: user::Id,
}

impl<Db> Command<DeleteEarning> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Earning, earning::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Earning>, earning::Id>>,
            Ok = Option<Earning>,
            Err = Traced<database::Error>,
        > + Database<
            Delete<By<Earning, earning::Id>>,
            Err = Traced<database::Error>,
        > + Database<Commit, Err = Traced<database::Error>>,
{
    /// Deleted [`Earning`].
    type Ok = Earning;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: DeleteEarning,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteEarning {
            earning_id,
            initiator_id,
        } = cmd;

        let initiator = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(initiator_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(initiator_id))
            .map_err(tracerr::wrap!())?;
        let actor = Actor::from(&initiator);

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::new(earning_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let earning = tx
            .execute(Select(By::<Option<Earning>, _>::new(earning_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|e| {
                access::can_perform(
                    &actor,
                    Action::ManageEarning,
                    Resource::Earning(e),
                )
            })
            .ok_or(E::EarningNotExists(earning_id))
            .map_err(tracerr::wrap!())?;

        if earning.is_paid() {
            return Err(tracerr::new!(E::AlreadyPaid(earning_id)));
        }

        tx.execute(Delete(By::<Earning, _>::new(earning_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(earning)
    }
}

/// Error of [`DeleteEarning`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Earning`] is paid already.
    #[display("Cannot delete paid `Earning(id: {_0})`")]
    AlreadyPaid(#[error(not(source))] earning::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Earning`] with the provided ID does not exist.
    #[display("`Earning(id: {_0})` does not exist")]
    EarningNotExists(#[error(not(source))] earning::Id),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}
