//! [`Command`] for assigning a [`Claim`] to an adjuster.

use common::{
    operations::{
        By, Commit, Expecting, Insert, Select, Transact, Transacted, Update,
    },
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    command::SendNotification,
    domain::{
        access::{self, Action, Resource},
        claim, earning, firm, notification,
        user::{self, Role},
        Actor, Claim, Earning, Notification, User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for assigning a [`claim::Status::Available`] [`Claim`] to an
/// adjuster.
///
/// Records a [`earning::Status::Pending`] [`Earning`] of the
/// [`Claim::adjuster_fee`] for the adjuster, if any.
#[derive(Clone, Copy, Debug)]
pub struct AssignClaim {
    /// ID of the [`Claim`] to be assigned.
    pub claim_id: claim::Id,

    /// ID of the adjuster to assign the [`Claim`] to.
    ///
    /// Defaults to the initiator.
    pub adjuster_id: Option<user::Id>,

    /// ID of the [`User`] assigning the [`Claim`].
    pub initiator_id: user::Id,
}

impl<Db> Command<AssignClaim> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Claim>, claim::Id>>,
            Ok = Option<Claim>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<firm::Connection>, (user::Id, firm::Id)>>,
            Ok = Option<firm::Connection>,
            Err = Traced<database::Error>,
        > + Database<Insert<Notification>, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Update<Expecting<Claim, claim::Status>>,
            Ok = bool,
            Err = Traced<database::Error>,
        > + Database<Insert<Earning>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Claim;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: AssignClaim) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AssignClaim {
            claim_id,
            adjuster_id,
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

        let mut claim = self
            .database()
            .execute(Select(By::<Option<Claim>, _>::new(claim_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ClaimNotExists(claim_id))
            .map_err(tracerr::wrap!())?;

        // A taken claim conflicts for everyone, whoever took it.
        if claim.status != claim::Status::Available {
            return Err(tracerr::new!(E::Transition(
                claim::TransitionError::NotAvailable,
            )));
        }
        if !access::can_perform(
            &actor,
            Action::ViewClaim,
            Resource::Claim(&claim),
        ) {
            return Err(tracerr::new!(E::ClaimNotExists(claim_id)));
        }

        let target_id = adjuster_id.unwrap_or(initiator_id);
        if !access::can_perform(
            &actor,
            Action::AssignClaim { target: target_id },
            Resource::Claim(&claim),
        ) {
            return Err(tracerr::new!(E::Forbidden(initiator_id)));
        }

        let target = if target_id == initiator_id {
            initiator
        } else {
            self.database()
                .execute(Select(By::<Option<User>, _>::new(target_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::InvalidAdjuster(target_id))
                .map_err(tracerr::wrap!())?
        };
        if target.role != Role::Adjuster || !target.is_active {
            return Err(tracerr::new!(E::InvalidAdjuster(target_id)));
        }

        if actor.role == Role::FirmAdmin {
            self.database()
                .execute(Select(By::<Option<firm::Connection>, _>::new((
                    target_id,
                    claim.firm_id,
                ))))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .filter(firm::Connection::is_approved)
                .ok_or(E::NotConnected(target_id))
                .map_err(tracerr::wrap!())
                .map(drop)?;
        }

        let now = DateTime::now();
        _ = claim
            .apply(claim::Event::Assign(target_id), now)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Only one of concurrent assignments wins.
        let assigned = tx
            .execute(Update(Expecting::new(
                claim.clone(),
                claim::Status::Available,
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if !assigned {
            return Err(tracerr::new!(E::Transition(
                claim::TransitionError::NotAvailable,
            )));
        }

        if let Some(fee) = claim.adjuster_fee.filter(|f| !f.is_zero()) {
            tx.execute(Insert(Earning {
                id: earning::Id::new(),
                user_id: target_id,
                claim_id: Some(claim.id),
                amount: fee,
                kind: earning::Kind::claim_fee(),
                status: earning::Status::Pending,
                description: earning::Description::new(format!(
                    "Fee for claim {}",
                    claim.number,
                )),
                earned_at: now.coerce(),
                paid_at: None,
                created_at: now.coerce(),
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        self.notify(SendNotification {
            user_id: target_id,
            kind: notification::Kind::ClaimAssigned,
            title: "Claim assigned".into(),
            content: format!(
                "Claim {} \"{}\" has been assigned to you",
                claim.number, claim.title,
            ),
        })
        .await;

        Ok(claim)
    }
}

/// Error of [`AssignClaim`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Claim`] with the provided ID does not exist.
    #[display("`Claim(id: {_0})` does not exist")]
    #[from(ignore)]
    ClaimNotExists(#[error(not(source))] claim::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`User`] is not allowed to assign the [`Claim`].
    #[display("`User(id: {_0})` is not allowed to assign this claim")]
    #[from(ignore)]
    Forbidden(#[error(not(source))] user::Id),

    /// Target [`User`] is not an active adjuster.
    #[display("Invalid adjuster `User(id: {_0})`")]
    #[from(ignore)]
    InvalidAdjuster(#[error(not(source))] user::Id),

    /// Adjuster has no approved [`firm::Connection`] to the [`Claim`]'s
    /// firm.
    #[display("Adjuster `User(id: {_0})` is not connected to firm")]
    #[from(ignore)]
    NotConnected(#[error(not(source))] user::Id),

    /// [`Claim`] cannot be assigned.
    #[display("{_0}")]
    Transition(claim::TransitionError),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}
