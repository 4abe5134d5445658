//! [`Command`] for updating a [`Claim`].

use common::{
    operations::{
        By, Commit, Delete, Insert, Lock, Select, Transact, Transacted,
        Update,
    },
    DateTime, Money,
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

/// [`Command`] for updating fields and [`claim::Status`] of a [`Claim`].
///
/// [`None`] fields are left untouched.
#[derive(Clone, Debug, Default)]
pub struct UpdateClaim {
    /// ID of the [`Claim`] to be updated.
    pub claim_id: claim::Id,

    /// New [`claim::Kind`].
    pub kind: Option<claim::Kind>,

    /// New [`claim::Priority`].
    pub priority: Option<claim::Priority>,

    /// New [`claim::Title`].
    pub title: Option<claim::Title>,

    /// New [`claim::Description`].
    pub description: Option<claim::Description>,

    /// New estimated value of the damage.
    pub estimated_value: Option<Money>,

    /// New final value of the damage.
    pub final_value: Option<Money>,

    /// New adjuster fee.
    pub adjuster_fee: Option<Money>,

    /// New [`claim::Address`].
    pub address: Option<claim::Address>,

    /// New [`DateTime`] of the incident.
    pub incident_at: Option<claim::IncidentDateTime>,

    /// New [`DateTime`] of the incident report.
    pub reported_at: Option<claim::ReportDateTime>,

    /// New deadline.
    pub deadline: Option<claim::DeadlineDateTime>,

    /// [`claim::Status`] to move the [`Claim`] to.
    pub status: Option<claim::Status>,

    /// ID of the [`User`] updating the [`Claim`].
    pub initiator_id: user::Id,
}

impl<Db> Command<UpdateClaim> for Service<Db>
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

    async fn execute(&self, cmd: UpdateClaim) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateClaim {
            claim_id,
            kind,
            priority,
            title,
            description,
            estimated_value,
            final_value,
            adjuster_fee,
            address,
            incident_at,
            reported_at,
            deadline,
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

        if !access::can_perform(
            &actor,
            Action::UpdateClaim,
            Resource::Claim(&claim),
        ) {
            return Err(tracerr::new!(E::Forbidden(initiator_id)));
        }

        let now = DateTime::now();

        let event = status
            .map(|target| claim::Event::towards(claim.status, target))
            .transpose()
            .map_err(tracerr::from_and_wrap!(=> E))?
            .flatten();
        let transition = event
            .map(|ev| claim.apply(ev, now))
            .transpose()
            .map_err(tracerr::from_and_wrap!(=> E))?;

        if let Some(kind) = kind {
            claim.kind = kind;
        }
        if let Some(priority) = priority {
            claim.priority = priority;
        }
        if let Some(title) = title {
            claim.title = title;
        }
        claim.description = description.or(claim.description);
        claim.estimated_value = estimated_value.or(claim.estimated_value);
        claim.final_value = final_value.or(claim.final_value);
        claim.adjuster_fee = adjuster_fee.or(claim.adjuster_fee);
        if let Some(address) = address {
            claim.address = address;
        }
        claim.incident_at = incident_at.or(claim.incident_at);
        claim.reported_at = reported_at.or(claim.reported_at);
        claim.deadline = deadline.or(claim.deadline);
        claim.updated_at = now.coerce();

        tx.execute(Update(claim.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        if transition.is_some_and(|t| t.released.is_some()) {
            _ = tx
                .execute(Delete(By::<Pending, _>::new(claim_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        if let Some(t) = transition {
            if let Some(adjuster_id) = t.released.or(claim.adjuster_id) {
                self.notify(SendNotification {
                    user_id: adjuster_id,
                    kind: notification::Kind::ClaimStatusChanged,
                    title: "Claim status changed".into(),
                    content: format!(
                        "Claim {} has been moved from {} to {}",
                        claim.number, t.from, t.to,
                    ),
                })
                .await;
            }
        }

        Ok(claim)
    }
}

/// Error of [`UpdateClaim`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Claim`] with the provided ID does not exist.
    #[display("`Claim(id: {_0})` does not exist")]
    #[from(ignore)]
    ClaimNotExists(#[error(not(source))] claim::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`User`] is not allowed to update the [`Claim`].
    #[display("`User(id: {_0})` is not allowed to update this claim")]
    #[from(ignore)]
    Forbidden(#[error(not(source))] user::Id),

    /// [`claim::Status`] cannot be changed as requested.
    #[display("{_0}")]
    Transition(claim::TransitionError),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}
