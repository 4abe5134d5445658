//! [`Command`] for sending a [`Notification`] to a [`User`].

use common::{operations::Insert, DateTime};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use crate::domain::User;
use crate::{
    domain::{notification, user, Notification},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for sending a [`Notification`] to a [`User`].
#[derive(Clone, Debug)]
pub struct SendNotification {
    /// ID of the [`User`] to notify.
    pub user_id: user::Id,

    /// [`notification::Kind`] of the [`Notification`].
    pub kind: notification::Kind,

    /// Title of the [`Notification`].
    pub title: String,

    /// Content of the [`Notification`].
    pub content: String,
}

impl<Db> Command<SendNotification> for Service<Db>
where
    Db: Database<Insert<Notification>, Err = Traced<database::Error>>,
{
    type Ok = Notification;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: SendNotification,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let SendNotification {
            user_id,
            kind,
            title,
            content,
        } = cmd;

        let notification = Notification {
            id: notification::Id::new(),
            user_id,
            title: notification::Title::new(title)
                .ok_or(E::InvalidTitle)
                .map_err(tracerr::wrap!())?,
            content: notification::Content::new(content)
                .ok_or(E::InvalidContent)
                .map_err(tracerr::wrap!())?,
            kind,
            is_read: false,
            created_at: DateTime::now().coerce(),
        };

        self.database()
            .execute(Insert(notification.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(notification)
    }
}

impl<Db> Service<Db>
where
    Self: Command<
        SendNotification,
        Ok = Notification,
        Err = Traced<ExecutionError>,
    >,
{
    /// Sends the provided [`Notification`], only logging a failure.
    ///
    /// Must be called once the changes the [`Notification`] is about are
    /// committed.
    pub(crate) async fn notify(&self, cmd: SendNotification) {
        let (user_id, kind) = (cmd.user_id, cmd.kind);
        if let Err(e) = self.execute(cmd).await {
            log::warn!(
                "failed to send `{kind}` notification to `User(id: {user_id})`: \
                 {e}",
            );
        }
    }
}

/// Error of [`SendNotification`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Notification`] content is empty or too long.
    #[display("Invalid `Notification` content")]
    InvalidContent,

    /// [`Notification`] title is empty or too long.
    #[display("Invalid `Notification` title")]
    InvalidTitle,
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Select};

    use crate::{
        domain::{notification, user, Notification},
        infra::{Database as _, Memory},
        read, Command as _, Config, Service,
    };

    use super::{ExecutionError, SendNotification};

    fn service() -> Service<Memory> {
        Service::new(Config::with_secret(b"secret"), Memory::new())
    }

    #[tokio::test]
    async fn stores_unread_notification() {
        let svc = service();
        let user_id = user::Id::new();

        let sent = svc
            .execute(SendNotification {
                user_id,
                kind: notification::Kind::EarningCreated,
                title: "New earning".into(),
                content: "You earned 500.00".into(),
            })
            .await
            .unwrap();
        assert!(!sent.is_read);

        let stored = svc
            .database()
            .execute(Select(By::<Vec<Notification>, _>::new(
                read::notification::Filter {
                    user_id,
                    unread_only: true,
                },
            )))
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, sent.id);
    }

    #[tokio::test]
    async fn rejects_empty_title() {
        let err = service()
            .execute(SendNotification {
                user_id: user::Id::new(),
                kind: notification::Kind::FirmConnection,
                title: "  ".into(),
                content: "content".into(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::InvalidTitle));
    }
}
