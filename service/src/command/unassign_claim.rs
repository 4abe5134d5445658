//! [`Command`] for unassigning a [`Claim`] from its adjuster.

use common::{
    operations::{
        By, Commit, Delete, Insert, Lock, Select, Transact, Transacted,
        Update,
    },
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    command::SendNotification,
    domain::{
        access::{self, Action, Resource},
        claim, notification, user, Actor, Claim, Notification, User,
    },
    infra::{database, Database},
    read::earning::Pending,
    Service,
};

use super::Command;

/// [`Command`] for returning an assigned [`Claim`] back for assignment.
///
/// Pending [`Earning`]s of the [`Claim`] are removed along.
///
/// [`Earning`]: crate::domain::Earning
#[derive(Clone, Copy, Debug)]
pub struct UnassignClaim {
    /// ID of the [`Claim`] to be unassigned.
    pub claim_id: claim::Id,

    /// ID of the [`User`] unassigning the [`Claim`].
    pub initiator_id: user::Id,
}

impl<Db> Command<UnassignClaim> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Insert<Notification>, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Claim, claim::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Claim>, claim::Id>>,
            Ok = Option<Claim>,
            Err = Traced<database::Error>,
        > + Database<Update<Claim>, Err = Traced<database::Error>>
        + Database<
            Delete<By<Pending, claim::Id>>,
            Ok = u64,
            Err = Traced<database::Error>,
        > + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Claim;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UnassignClaim,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UnassignClaim {
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

        // Avoid concurrent status changes.
        tx.execute(Lock(By::new(claim_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut claim = tx
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

        // Released claims have no assignee to check the ownership against.
        if claim.adjuster_id.is_none() {
            return Err(tracerr::new!(E::Transition(
                claim::TransitionError::NotAssigned,
            )));
        }
        if !access::can_perform(
            &actor,
            Action::UnassignClaim,
            Resource::Claim(&claim),
        ) {
            return Err(tracerr::new!(E::Forbidden(initiator_id)));
        }

        let transition = claim
            .apply(claim::Event::Unassign, DateTime::now())
            .map_err(tracerr::from_and_wrap!(=> E))?;

        tx.execute(Update(claim.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        _ = tx
            .execute(Delete(By::<Pending, _>::new(claim_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        if let Some(adjuster_id) = transition.released {
            self.notify(SendNotification {
                user_id: adjuster_id,
                kind: notification::Kind::ClaimUnassigned,
                title: "Claim unassigned".into(),
                content: format!(
                    "Claim {} has been unassigned from you",
                    claim.number,
                ),
            })
            .await;
        }

        Ok(claim)
    }
}

/// Error of [`UnassignClaim`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Claim`] with the provided ID does not exist.
    #[display("`Claim(id: {_0})` does not exist")]
    #[from(ignore)]
    ClaimNotExists(#[error(not(source))] claim::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`User`] is not allowed to unassign the [`Claim`].
    #[display("`User(id: {_0})` is not allowed to unassign this claim")]
    #[from(ignore)]
    Forbidden(#[error(not(source))] user::Id),

    /// [`Claim`] cannot be unassigned.
    #[display("{_0}")]
    Transition(claim::TransitionError),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}
