//! [`Command`] for marking a [`Notification`] as read.

use common::operations::{By, Select, Update};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        access::{self, Action, Resource},
        notification, user, Actor, Notification, User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for marking a [`Notification`] as read.
#[derive(Clone, Copy, Debug)]
pub struct MarkNotificationRead {
    /// ID of the [`Notification`] to be marked.
    pub notification_id: notification::Id,

    /// ID of the [`User`] marking the [`Notification`].
    pub initiator_id: user::Id,
}

impl<Db> Command<MarkNotificationRead> for Service<Db>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Notification>, notification::Id>>,
            Ok = Option<Notification>,
            Err = Traced<database::Error>,
        > + Database<Update<Notification>, Err = Traced<database::Error>>,
{
    type Ok = Notification;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: MarkNotificationRead,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let MarkNotificationRead {
            notification_id,
            initiator_id,
        } = cmd;

        let initiator = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(initiator_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(initiator_id))
            .map_err(tracerr::wrap!())?;

        // Other users' notifications are reported as absent.
        let mut notification = self
            .database()
            .execute(Select(By::<Option<Notification>, _>::new(
                notification_id,
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|n| {
                access::can_perform(
                    &Actor::from(&initiator),
                    Action::ReadNotification,
                    Resource::Notification(n),
                )
            })
            .ok_or(E::NotificationNotExists(notification_id))
            .map_err(tracerr::wrap!())?;

        if !notification.is_read {
            notification.is_read = true;
            self.database()
                .execute(Update(notification.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }

        Ok(notification)
    }
}

/// Error of [`MarkNotificationRead`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Notification`] with the provided ID does not exist.
    #[display("`Notification(id: {_0})` does not exist")]
    NotificationNotExists(#[error(not(source))] notification::Id),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}
