//! [`Command`] for creating a new [`Claim`].

use common::{
    operations::{By, Commit, Insert, Next, Select, Transact, Transacted},
    DateTime, Money,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        access::{self, Action, Resource},
        claim, firm, user, Actor, Claim, Firm, User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`claim::Status::Available`] [`Claim`].
#[derive(Clone, Debug)]
pub struct CreateClaim {
    /// ID of the [`Firm`] owning the new [`Claim`].
    pub firm_id: firm::Id,

    /// [`claim::Kind`] of the new [`Claim`].
    pub kind: claim::Kind,

    /// [`claim::Priority`] of the new [`Claim`].
    pub priority: claim::Priority,

    /// [`claim::Title`] of the new [`Claim`].
    pub title: claim::Title,

    /// [`claim::Description`] of the new [`Claim`].
    pub description: Option<claim::Description>,

    /// Estimated value of the damage.
    pub estimated_value: Option<Money>,

    /// Fee an adjuster earns for handling the new [`Claim`].
    pub adjuster_fee: Option<Money>,

    /// [`claim::Address`] of the damaged property.
    pub address: claim::Address,

    /// [`DateTime`] when the incident happened.
    pub incident_at: Option<claim::IncidentDateTime>,

    /// [`DateTime`] when the incident was reported.
    pub reported_at: Option<claim::ReportDateTime>,

    /// [`DateTime`] the new [`Claim`] should be handled before.
    pub deadline: Option<claim::DeadlineDateTime>,

    /// ID of the [`User`] creating the [`Claim`].
    pub initiator_id: user::Id,
}

impl<Db> Command<CreateClaim> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Firm>, firm::Id>>,
            Ok = Option<Firm>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Next<By<claim::Number, i32>>,
            Ok = claim::Number,
            Err = Traced<database::Error>,
        > + Database<Insert<Claim>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Claim;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateClaim) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateClaim {
            firm_id,
            kind,
            priority,
            title,
            description,
            estimated_value,
            adjuster_fee,
            address,
            incident_at,
            reported_at,
            deadline,
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
            Action::CreateClaim,
            Resource::Firm(firm_id),
        ) {
            return Err(tracerr::new!(E::Forbidden(initiator_id)));
        }

        self.database()
            .execute(Select(By::<Option<Firm>, _>::new(firm_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::FirmNotExists(firm_id))
            .map_err(tracerr::wrap!())
            .map(drop)?;

        let now = DateTime::now();

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let number = tx
            .execute(Next(By::<claim::Number, _>::new(now.year())))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let claim = Claim {
            id: claim::Id::new(),
            number,
            kind,
            status: claim::Status::Available,
            priority,
            title,
            description,
            estimated_value,
            final_value: None,
            adjuster_fee,
            address,
            incident_at,
            reported_at,
            deadline,
            completed_at: None,
            firm_id,
            adjuster_id: None,
            created_at: now.coerce(),
            updated_at: now.coerce(),
        };

        tx.execute(Insert(claim.clone()))
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

/// Error of [`CreateClaim`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Firm`] with the provided ID does not exist.
    #[display("`Firm(id: {_0})` does not exist")]
    FirmNotExists(#[error(not(source))] firm::Id),

    /// [`User`] is not allowed to create [`Claim`]s for the [`Firm`].
    #[display("`User(id: {_0})` is not allowed to create claims")]
    Forbidden(#[error(not(source))] user::Id),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}
