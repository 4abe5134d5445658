//! [`Command`] for reviewing a [`firm::Connection`].

use common::{
    operations::{
        By, Commit, Insert, Lock, Select, Transact, Transacted, Update,
    },
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    command::SendNotification,
    domain::{
        access::{self, Action, Resource},
        firm::{self, connection},
        notification, user, Actor, Decision, Notification, User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for approving or rejecting a pending [`firm::Connection`].
#[derive(Clone, Copy, Debug)]
pub struct ReviewFirmConnection {
    /// ID of the [`firm::Connection`] to be reviewed.
    pub connection_id: connection::Id,

    /// [`Decision`] upon the [`firm::Connection`].
    pub decision: Decision,

    /// ID of the [`User`] reviewing the [`firm::Connection`].
    pub initiator_id: user::Id,
}

impl<Db> Command<ReviewFirmConnection> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Insert<Notification>, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<firm::Connection, connection::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<firm::Connection>, connection::Id>>,
            Ok = Option<firm::Connection>,
            Err = Traced<database::Error>,
        > + Database<Update<firm::Connection>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = firm::Connection;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: ReviewFirmConnection,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ReviewFirmConnection {
            connection_id,
            decision,
            initiator_id,
        } = cmd;

        let initiator = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(initiator_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(initiator_id))
            .map_err(tracerr::wrap!())?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent reviews.
        tx.execute(Lock(By::new(connection_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut connection = tx
            .execute(Select(By::<Option<firm::Connection>, _>::new(
                connection_id,
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ConnectionNotExists(connection_id))
            .map_err(tracerr::wrap!())?;

        if !access::can_perform(
            &Actor::from(&initiator),
            Action::ReviewFirmConnection,
            Resource::FirmConnection(&connection),
        ) {
            return Err(tracerr::new!(E::Forbidden(initiator_id)));
        }

        connection
            .review(decision, DateTime::now())
            .map_err(tracerr::from_and_wrap!(=> E))?;

        tx.execute(Update(connection.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        self.notify(SendNotification {
            user_id: connection.adjuster_id,
            kind: notification::Kind::FirmConnection,
            title: "Firm connection reviewed".into(),
            content: format!(
                "Your connection request has been {}",
                connection.status,
            ),
        })
        .await;

        Ok(connection)
    }
}

/// Error of [`ReviewFirmConnection`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`firm::Connection`] has been reviewed already.
    #[display("{_0}")]
    AlreadyReviewed(firm::connection::AlreadyReviewed),

    /// [`firm::Connection`] with the provided ID does not exist.
    #[display("`Connection(id: {_0})` does not exist")]
    #[from(ignore)]
    ConnectionNotExists(#[error(not(source))] connection::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`User`] does not administer the [`Firm`].
    ///
    /// [`Firm`]: crate::domain::Firm
    #[display("`User(id: {_0})` is not allowed to review this connection")]
    #[from(ignore)]
    Forbidden(#[error(not(source))] user::Id),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}
