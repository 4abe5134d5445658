//! `Firm` and `FirmConnection` definitions.

use axum::Extension;
use common::DateTime;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use service::{
    command::{self, Command as _},
    domain::{self, firm, firm::connection, user, Decision},
};

use crate::{
    api::{Json, Path, PrivilegeError},
    define_error, AsError, Error, Service, Session,
};

/// A firm handing claims to adjusters.
#[derive(Debug, Serialize)]
pub struct Firm {
    /// Unique identifier of this `Firm`.
    pub id: firm::Id,

    /// Name of this `Firm`.
    pub name: firm::Name,

    /// `DateTime` when this `Firm` was created.
    pub created_at: DateTime,
}

impl From<domain::Firm> for Firm {
    fn from(firm: domain::Firm) -> Self {
        Self {
            id: firm.id,
            name: firm.name,
            created_at: firm.created_at.coerce(),
        }
    }
}

/// Connection between an adjuster and a `Firm`.
#[derive(Debug, Serialize)]
pub struct Connection {
    /// Unique identifier of this `Connection`.
    pub id: connection::Id,

    /// ID of the connected adjuster.
    pub adjuster_id: user::Id,

    /// ID of the connected `Firm`.
    pub firm_id: firm::Id,

    /// Status of this `Connection`.
    pub status: connection::Status,

    /// Message the adjuster attached to the request.
    pub message: Option<connection::Message>,

    /// `DateTime` when this `Connection` was requested.
    pub created_at: DateTime,

    /// `DateTime` when this `Connection` was approved.
    pub connected_at: Option<DateTime>,
}

impl From<firm::Connection> for Connection {
    fn from(conn: firm::Connection) -> Self {
        Self {
            id: conn.id,
            adjuster_id: conn.adjuster_id,
            firm_id: conn.firm_id,
            status: conn.status,
            message: conn.message,
            created_at: conn.created_at.coerce(),
            connected_at: conn.connected_at.map(|at| at.coerce()),
        }
    }
}

/// Body of a `Firm` creation request.
#[derive(Debug, Deserialize)]
pub struct NewFirm {
    /// Name of the new `Firm`.
    pub name: String,
}

/// Creates a new `Firm`.
///
/// # Errors
///
/// Possible error codes:
/// - `VALIDATION_FAILED` - provided name is invalid;
/// - `FORBIDDEN` - authenticated `User` is not an administrator.
#[tracing::instrument(
    skip_all,
    fields(user.id = %session.user.id, http.route = "POST /firms"),
)]
pub async fn create(
    Extension(service): Extension<Service>,
    session: Session,
    Json(body): Json<NewFirm>,
) -> Result<(StatusCode, Json<Firm>), Error> {
    let (name,) = validate! { name = body.name.parse::<firm::Name>() }?;

    let firm = service
        .execute(command::CreateFirm {
            name,
            initiator_id: session.user.id,
        })
        .await
        .map_err(AsError::into_error)?;

    Ok((StatusCode::CREATED, Json(firm.into())))
}

/// Body of a `Connection` request.
#[derive(Debug, Default, Deserialize)]
pub struct ConnectionRequest {
    /// Message to the `Firm`.
    pub message: Option<String>,
}

/// Requests a `Connection` of the authenticated adjuster to a `Firm`.
///
/// # Errors
///
/// Possible error codes:
/// - `FORBIDDEN` - authenticated `User` is not an adjuster;
/// - `FIRM_NOT_EXISTS` - `Firm` with the provided ID doesn't exist;
/// - `ALREADY_REQUESTED` - `Connection` to the `Firm` exists already.
#[tracing::instrument(
    skip_all,
    fields(
        firm.id = %firm_id,
        user.id = %session.user.id,
        http.route = "POST /firms/:id/connections",
    ),
)]
pub async fn request_connection(
    Extension(service): Extension<Service>,
    session: Session,
    Path(firm_id): Path<firm::Id>,
    body: Option<Json<ConnectionRequest>>,
) -> Result<(StatusCode, Json<Connection>), Error> {
    let Json(body) = body.unwrap_or_default();
    let (message,) = validate! {
        message = body
            .message
            .map(|m| m.parse::<connection::Message>())
            .transpose(),
    }?;

    let conn = service
        .execute(command::RequestFirmConnection {
            firm_id,
            message,
            initiator_id: session.user.id,
        })
        .await
        .map_err(AsError::into_error)?;

    Ok((StatusCode::CREATED, Json(conn.into())))
}

/// Body of a `Connection` review.
#[derive(Debug, Deserialize)]
pub struct Review {
    /// Decision upon the `Connection`.
    pub decision: Decision,
}

/// Approves or rejects a pending `Connection`.
///
/// # Errors
///
/// Possible error codes:
/// - `CONNECTION_NOT_EXISTS` - `Connection` doesn't exist;
/// - `FORBIDDEN` - authenticated `User` doesn't administer the `Firm`;
/// - `ALREADY_REVIEWED` - `Connection` is not pending anymore.
#[tracing::instrument(
    skip_all,
    fields(
        connection.id = %connection_id,
        user.id = %session.user.id,
        http.route = "PUT /connections/:id",
    ),
)]
pub async fn review_connection(
    Extension(service): Extension<Service>,
    session: Session,
    Path(connection_id): Path<connection::Id>,
    Json(body): Json<Review>,
) -> Result<Json<Connection>, Error> {
    service
        .execute(command::ReviewFirmConnection {
            connection_id,
            decision: body.decision,
            initiator_id: session.user.id,
        })
        .await
        .map_err(AsError::into_error)
        .map(|c| Json(c.into()))
}

impl AsError for command::create_firm::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Forbidden(_) => Some(PrivilegeError::Forbidden.into()),
            Self::UserNotExists(_) => None,
        }
    }
}

impl AsError for command::request_firm_connection::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "ALREADY_REQUESTED"]
                #[status = CONFLICT]
                #[message = "Connection to the firm is requested already"]
                AlreadyRequested,

                #[code = "FIRM_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "Firm with the provided ID doesn't exist"]
                FirmNotExists,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::AlreadyRequested(_) => Some(Error::AlreadyRequested.into()),
            Self::FirmNotExists(_) => Some(Error::FirmNotExists.into()),
            Self::Forbidden(_) => Some(PrivilegeError::Forbidden.into()),
            Self::UserNotExists(_) => None,
        }
    }
}

impl AsError for command::review_firm_connection::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "ALREADY_REVIEWED"]
                #[status = CONFLICT]
                #[message = "Connection is reviewed already"]
                AlreadyReviewed,

                #[code = "CONNECTION_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "Connection with the provided ID doesn't exist"]
                ConnectionNotExists,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::AlreadyReviewed(_) => Some(Error::AlreadyReviewed.into()),
            Self::ConnectionNotExists(_) => {
                Some(Error::ConnectionNotExists.into())
            }
            Self::Forbidden(_) => Some(PrivilegeError::Forbidden.into()),
            Self::UserNotExists(_) => None,
        }
    }
}
