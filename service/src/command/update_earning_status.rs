//! [`Command`] for changing an [`Earning`]'s status.

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime,
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

/// [`Command`] for changing an [`earning::Status`] of an [`Earning`] by its
/// owner.
#[derive(Clone, Copy, Debug)]
pub struct UpdateEarningStatus {
    /// ID of the [`Earning`] to be updated.
    pub earning_id: earning::Id,

    /// New [`earning::Status`].
    pub status: earning::Status,

    /// ID of the [`User`] updating the [`Earning`].
    pub initiator_id: user::Id,
}

impl<Db> Command<UpdateEarningStatus> for Service<Db>
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
        > + Database<Update<Earning>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Earning;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UpdateEarningStatus,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateEarningStatus {
            earning_id,
            status,
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

        // Other users' earnings are reported as absent.
        let mut earning = tx
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

        earning
            .set_status(status, DateTime::now())
            .map_err(tracerr::from_and_wrap!(=> E))?;

        tx.execute(Update(earning.clone()))
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

/// Error of [`UpdateEarningStatus`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Earning`] is paid already.
    #[display("{_0}")]
    AlreadyPaid(earning::AlreadyPaid),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Earning`] with the provided ID does not exist.
    #[display("`Earning(id: {_0})` does not exist")]
    #[from(ignore)]
    EarningNotExists(#[error(not(source))] earning::Id),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}
