//! [`Command`] for creating a new [`Firm`].

use common::{
    operations::{By, Insert, Select},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        access::{self, Action, Resource},
        firm, user, Actor, Firm, User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Firm`].
#[derive(Clone, Debug)]
pub struct CreateFirm {
    /// [`firm::Name`] of a new [`Firm`].
    pub name: firm::Name,

    /// ID of the [`User`] creating the [`Firm`].
    pub initiator_id: user::Id,
}

impl<Db> Command<CreateFirm> for Service<Db>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Insert<Firm>, Err = Traced<database::Error>>,
{
    type Ok = Firm;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateFirm) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateFirm { name, initiator_id } = cmd;

        let initiator = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(initiator_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(initiator_id))
            .map_err(tracerr::wrap!())?;

        if !access::can_perform(
            &Actor::from(&initiator),
            Action::ManageFirms,
            Resource::None,
        ) {
            return Err(tracerr::new!(E::Forbidden(initiator_id)));
        }

        let firm = Firm {
            id: firm::Id::new(),
            name,
            created_at: DateTime::now().coerce(),
        };

        self.database()
            .execute(Insert(firm.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(firm)
    }
}

/// Error of [`CreateFirm`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`User`] is not allowed to create [`Firm`]s.
    #[display("`User(id: {_0})` is not allowed to create firms")]
    Forbidden(#[error(not(source))] user::Id),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}
