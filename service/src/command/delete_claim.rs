//! [`Command`] for deleting a [`Claim`].

use common::operations::{
    By, Commit, Delete, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        access::{self, Action, Resource},
        claim, user, Actor, Claim, User,
    },
    infra::{database, Database},
    read::earning::Pending,
    Service,
};

use super::Command;

/// [`Command`] for deleting a [`Claim`] which is not being handled.
///
/// Pending [`Earning`]s of the [`Claim`] are removed along, while the other
/// ones lose their reference to it.
///
/// [`Earning`]: crate::domain::Earning
#[derive(Clone, Copy, Debug)]
pub struct DeleteClaim {
    /// ID of the [`Claim`] to be deleted.
    pub claim_id: claim::Id,

    /// ID of the [`User`] deleting the [`Claim`].
    pub initiator_id: user::Id,
}

impl<Db> Command<DeleteClaim> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Claim, claim::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Claim>, claim::Id>>,
            Ok = Option<Claim>,
            Err = Traced<database::Error>,
        > + Database<
            Delete<By<Pending, claim::Id>>,
            Ok = u64,
            Err = Traced<database::Error>,
        > + Database<Delete<By<Claim, claim::Id>>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    /// Deleted [`Claim`].
    type Ok = Claim;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: DeleteClaim) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteClaim {
            claim_id,
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

        // Avoid concurrent assignments.
        tx.execute(Lock(By::new(claim_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let claim = tx
            .execute(Select(By::<Option<Claim>, _>::new(claim_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|c| {
                access::can_perform(
                    &actor,
                    Action::ViewClaim,
                    Resource::Claim(c),
                )
            })
            .ok_or(E::ClaimNotExists(claim_id))
            .map_err(tracerr::wrap!())?;

        if !access::can_perform(
            &actor,
            Action::DeleteClaim,
            Resource::Claim(&claim),
        ) {
            return Err(tracerr::new!(E::Forbidden(initiator_id)));
        }
        if claim.is_active_or_completed() {
            return Err(tracerr::new!(E::ActiveOrCompleted(claim.status)));
        }

        _ = tx
            .execute(Delete(By::<Pending, _>::new(claim_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Delete(By::<Claim, _>::new(claim_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(claim)
    }
}

/// Error of [`DeleteClaim`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Claim`] is being handled or has been handled already.
    #[display("Cannot delete a claim being {_0}")]
    ActiveOrCompleted(#[error(not(source))] claim::Status),

    /// [`Claim`] with the provided ID does not exist.
    #[display("`Claim(id: {_0})` does not exist")]
    ClaimNotExists(#[error(not(source))] claim::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`User`] is not allowed to delete the [`Claim`].
    #[display("`User(id: {_0})` is not allowed to delete this claim")]
    Forbidden(#[error(not(source))] user::Id),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}
