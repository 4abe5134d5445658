//! `Notification`-related definitions.

use axum::Extension;
use common::DateTime;
use serde::{Deserialize, Serialize};
use service::{
    command::{self, Command as _},
    domain::{self, notification, user},
    query, read, Query as _,
};

use crate::{
    api::{Json, Path, Query},
    define_error, AsError, Error, Service, Session,
};

/// A message addressed to a `User`.
#[derive(Debug, Serialize)]
pub struct Notification {
    /// Unique identifier of this `Notification`.
    pub id: notification::Id,

    /// ID of the addressed `User`.
    pub user_id: user::Id,

    /// Title of this `Notification`.
    pub title: notification::Title,

    /// Content of this `Notification`.
    pub content: notification::Content,

    /// Kind of this `Notification`.
    pub kind: notification::Kind,

    /// Indicator whether this `Notification` has been read.
    pub is_read: bool,

    /// `DateTime` when this `Notification` was sent.
    pub created_at: DateTime,
}

impl From<domain::Notification> for Notification {
    fn from(n: domain::Notification) -> Self {
        Self {
            id: n.id,
            user_id: n.user_id,
            title: n.title,
            content: n.content,
            kind: n.kind,
            is_read: n.is_read,
            created_at: n.created_at.coerce(),
        }
    }
}

/// Parameters of a `Notification`s list request.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Indicator whether only unread `Notification`s should be listed.
    #[serde(default)]
    pub unread_only: bool,
}

/// Lists `Notification`s of the authenticated `User`, newest first.
#[tracing::instrument(
    skip_all,
    fields(user.id = %session.user.id, http.route = "GET /notifications"),
)]
pub async fn list(
    Extension(service): Extension<Service>,
    session: Session,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Notification>>, Error> {
    service
        .execute(query::notifications::List::by(
            read::notification::Filter {
                user_id: session.user.id,
                unread_only: params.unread_only,
            },
        ))
        .await
        .map_err(AsError::into_error)
        .map(|list| Json(list.into_iter().map(Into::into).collect()))
}

/// Marks a `Notification` of the authenticated `User` as read.
///
/// # Errors
///
/// Possible error codes:
/// - `NOTIFICATION_NOT_EXISTS` - `Notification` doesn't exist or is
///   addressed to another `User`.
#[tracing::instrument(
    skip_all,
    fields(
        notification.id = %notification_id,
        user.id = %session.user.id,
        http.route = "POST /notifications/:id/read",
    ),
)]
pub async fn mark_read(
    Extension(service): Extension<Service>,
    session: Session,
    Path(notification_id): Path<notification::Id>,
) -> Result<Json<Notification>, Error> {
    service
        .execute(command::MarkNotificationRead {
            notification_id,
            initiator_id: session.user.id,
        })
        .await
        .map_err(AsError::into_error)
        .map(|n| Json(n.into()))
}

impl AsError for command::mark_notification_read::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "NOTIFICATION_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "`Notification` with the provided ID doesn't \
                             exist"]
                NotExists,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::NotificationNotExists(_) => Some(Error::NotExists.into()),
            Self::UserNotExists(_) => None,
        }
    }
}

#[cfg(test)]
mod spec {
    use http::StatusCode;
    use serde_json::json;

    use crate::api::spec::App;

    #[tokio::test]
    async fn marks_own_notifications_read() {
        let app = App::new();
        let (owner, _) = app.register("a@example.com", "ADJUSTER", None).await;
        let (other, _) = app.register("b@example.com", "ADJUSTER", None).await;
        let (status, _) = app
            .call(
                "POST",
                "/earnings",
                Some(&owner),
                Some(json!({"amount": "15", "kind": "BONUS"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, list) =
            app.call("GET", "/notifications", Some(&owner), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["kind"], "EARNING_CREATED");
        assert_eq!(list[0]["is_read"], false);

        let uri = format!(
            "/notifications/{}/read",
            list[0]["id"].as_str().unwrap(),
        );
        let (status, body) = app.call("POST", &uri, Some(&other), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOTIFICATION_NOT_EXISTS");

        let (status, read) = app.call("POST", &uri, Some(&owner), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(read["is_read"], true);

        let (_, unread) = app
            .call("GET", "/notifications?unread_only=true", Some(&owner), None)
            .await;
        assert!(unread.as_array().unwrap().is_empty());
    }
}
