//! [`Command`] for requesting a [`firm::Connection`].

use common::{
    operations::{By, Insert, Select},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        access::{self, Action, Resource},
        firm::{self, connection},
        user, Actor, Firm, User,
    },
    infra::{
        database::{self, constraint},
        Database,
    },
    Service,
};

use super::Command;

/// [`Command`] for an adjuster requesting a [`firm::Connection`] to a
/// [`Firm`].
#[derive(Clone, Debug)]
pub struct RequestFirmConnection {
    /// ID of the [`Firm`] to connect to.
    pub firm_id: firm::Id,

    /// [`connection::Message`] attached to the request.
    pub message: Option<connection::Message>,

    /// ID of the adjuster [`User`] requesting the [`firm::Connection`].
    pub initiator_id: user::Id,
}

impl<Db> Command<RequestFirmConnection> for Service<Db>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Firm>, firm::Id>>,
            Ok = Option<Firm>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<firm::Connection>, (user::Id, firm::Id)>>,
            Ok = Option<firm::Connection>,
            Err = Traced<database::Error>,
        > + Database<Insert<firm::Connection>, Err = Traced<database::Error>>,
{
    type Ok = firm::Connection;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: RequestFirmConnection,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RequestFirmConnection {
            firm_id,
            message,
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
            Action::RequestFirmConnection,
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

        let existing = self
            .database()
            .execute(Select(By::<Option<firm::Connection>, _>::new((
                initiator_id,
                firm_id,
            ))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if existing.is_some() {
            return Err(tracerr::new!(E::AlreadyRequested(firm_id)));
        }

        let connection = firm::Connection {
            id: connection::Id::new(),
            adjuster_id: initiator_id,
            firm_id,
            status: connection::Status::Pending,
            message,
            created_at: DateTime::now().coerce(),
            connected_at: None,
        };

        self.database()
            .execute(Insert(connection.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map_err(|e| {
                if matches!(
                    e.as_ref(),
                    E::Db(db) if db.is_unique_violation(
                        Some(constraint::FIRM_CONNECTION),
                    ),
                ) {
                    tracerr::new!(E::AlreadyRequested(firm_id))
                } else {
                    e
                }
            })
            .map(drop)?;

        Ok(connection)
    }
}

/// Error of [`RequestFirmConnection`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`firm::Connection`] to the [`Firm`] has been requested already.
    #[display("Connection to `Firm(id: {_0})` already exists")]
    AlreadyRequested(#[error(not(source))] firm::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Firm`] with the provided ID does not exist.
    #[display("`Firm(id: {_0})` does not exist")]
    FirmNotExists(#[error(not(source))] firm::Id),

    /// [`User`] is not an adjuster.
    #[display("`User(id: {_0})` is not allowed to request connections")]
    Forbidden(#[error(not(source))] user::Id),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}
