//! [`Command`] for recording a new [`Earning`].

use common::{
    operations::{By, Insert, Select},
    DateTime, Money,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    command::SendNotification,
    domain::{
        access::{self, Action, Resource},
        claim, earning, notification, user, Actor, Claim, Earning,
        Notification, User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for recording a new [`earning::Status::Pending`] [`Earning`]
/// of the initiator.
#[derive(Clone, Debug)]
pub struct CreateEarning {
    /// Amount of the new [`Earning`].
    pub amount: Money,

    /// [`earning::Kind`] of the new [`Earning`].
    pub kind: earning::Kind,

    /// [`DateTime`] the new [`Earning`] was earned at.
    ///
    /// Defaults to now.
    pub earned_at: Option<earning::EarningDateTime>,

    /// ID of the [`Claim`] the new [`Earning`] is for.
    pub claim_id: Option<claim::Id>,

    /// [`earning::Description`] of the new [`Earning`].
    pub description: Option<earning::Description>,

    /// ID of the [`User`] recording the [`Earning`].
    pub initiator_id: user::Id,
}

impl<Db> Command<CreateEarning> for Service<Db>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Claim>, claim::Id>>,
            Ok = Option<Claim>,
            Err = Traced<database::Error>,
        > + Database<Insert<Earning>, Err = Traced<database::Error>>
        + Database<Insert<Notification>, Err = Traced<database::Error>>,
{
    type Ok = Earning;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateEarning,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateEarning {
            amount,
            kind,
            earned_at,
            claim_id,
            description,
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
            Action::ManageEarning,
            Resource::None,
        ) {
            return Err(tracerr::new!(E::Forbidden(initiator_id)));
        }
        if amount.is_zero() {
            return Err(tracerr::new!(E::ZeroAmount));
        }

        if let Some(id) = claim_id {
            // Only claims assigned to the initiator may be referenced.
            self.database()
                .execute(Select(By::<Option<Claim>, _>::new(id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .filter(|c| c.adjuster_id == Some(initiator_id))
                .ok_or(E::ClaimNotExists(id))
                .map_err(tracerr::wrap!())
                .map(drop)?;
        }

        let now = DateTime::now();
        let earning = Earning {
            id: earning::Id::new(),
            user_id: initiator_id,
            claim_id,
            amount,
            kind,
            status: earning::Status::Pending,
            description,
            earned_at: earned_at.unwrap_or_else(|| now.coerce()),
            paid_at: None,
            created_at: now.coerce(),
        };

        self.database()
            .execute(Insert(earning.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        self.notify(SendNotification {
            user_id: initiator_id,
            kind: notification::Kind::EarningCreated,
            title: "Earning recorded".into(),
            content: format!("New {} earning of {}", earning.kind, amount),
        })
        .await;

        Ok(earning)
    }
}

/// Error of [`CreateEarning`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Claim`] with the provided ID does not exist or is not assigned to
    /// the [`User`].
    #[display("`Claim(id: {_0})` does not exist")]
    ClaimNotExists(#[error(not(source))] claim::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`User`] is not allowed to record [`Earning`]s.
    #[display("`User(id: {_0})` is not allowed to record earnings")]
    Forbidden(#[error(not(source))] user::Id),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),

    /// [`Earning`] amount is zero.
    #[display("`Earning` amount must be positive")]
    ZeroAmount,
}
