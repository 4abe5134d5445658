//! [`User`]-related definitions.

use axum::Extension;
use common::DateTime;
use http::StatusCode;
use secrecy::SecretBox;
use serde::{Deserialize, Serialize};
use service::{
    command::{self, Command as _},
    domain::{self, firm, user},
};

use crate::{api::Json, define_error, AsError, Error, Service, Session};

/// A `User` of the system.
#[derive(Debug, Serialize)]
pub struct User {
    /// Unique identifier of this `User`.
    pub id: user::Id,

    /// Name of this `User`.
    pub name: user::Name,

    /// Email of this `User`.
    pub email: user::Email,

    /// Role of this `User`.
    pub role: user::Role,

    /// ID of the firm this `User` administers, if any.
    pub firm_id: Option<firm::Id>,

    /// Indicator whether this `User` is allowed to act.
    pub is_active: bool,

    /// `DateTime` when this `User` was registered.
    pub created_at: DateTime,
}

impl From<domain::User> for User {
    fn from(user: domain::User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            firm_id: user.firm_id,
            is_active: user.is_active,
            created_at: user.created_at.coerce(),
        }
    }
}

/// Body of a `User` registration request.
#[derive(Debug, Deserialize)]
pub struct Registration {
    /// Name of the new `User`.
    pub name: String,

    /// Email of the new `User`.
    pub email: String,

    /// Password of the new `User`.
    pub password: String,

    /// Role of the new `User`, `ADJUSTER` by default.
    pub role: Option<user::Role>,

    /// ID of the firm a new `FIRM_ADMIN` administers.
    pub firm_id: Option<firm::Id>,
}

/// Registers a new `User`.
///
/// # Errors
///
/// Possible error codes:
/// - `VALIDATION_FAILED` - some of the provided fields are invalid;
/// - `EMAIL_OCCUPIED` - provided email is used by another `User`;
/// - `ROLE_NOT_ALLOWED` - provided role cannot be registered;
/// - `FIRM_REQUIRED` - `FIRM_ADMIN` must reference a firm;
/// - `FIRM_NOT_EXISTS` - referenced firm doesn't exist.
#[tracing::instrument(
    skip_all,
    fields(email = %body.email, http.route = "POST /users"),
)]
pub async fn register(
    Extension(service): Extension<Service>,
    Json(body): Json<Registration>,
) -> Result<(StatusCode, Json<User>), Error> {
    let (name, email, password) = validate! {
        name = body.name.parse::<user::Name>(),
        email = body.email.parse::<user::Email>(),
        password = body.password.parse::<user::Password>(),
    }?;

    let user = service
        .execute(command::CreateUser {
            name,
            email,
            password: SecretBox::new(Box::new(password)),
            role: body.role.unwrap_or(user::Role::Adjuster),
            firm_id: body.firm_id,
        })
        .await
        .map_err(AsError::into_error)?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Body of a login request.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    /// Email of the `User`.
    pub email: String,

    /// Password of the `User`.
    pub password: String,
}

/// Created `UserSession`.
#[derive(Debug, Serialize)]
pub struct CreatedSession {
    /// Access token to be passed as `Authorization: Bearer <token>`.
    pub token: String,

    /// `User` the session belongs to.
    pub user: User,

    /// `DateTime` when the session expires.
    pub expires_at: DateTime,
}

/// Creates a new `UserSession` with the provided credentials.
///
/// # Errors
///
/// Possible error codes:
/// - `WRONG_CREDENTIALS` - provided credentials don't match any `User`;
/// - `USER_INACTIVE` - `User` is not allowed to log in.
#[tracing::instrument(
    skip_all,
    fields(email = %body.email, http.route = "POST /sessions"),
)]
pub async fn login(
    Extension(service): Extension<Service>,
    Json(body): Json<Credentials>,
) -> Result<Json<CreatedSession>, Error> {
    // Malformed credentials cannot match anyone.
    let (Some(email), Some(password)) = (
        user::Email::new(body.email),
        user::Password::new(body.password),
    ) else {
        return Err(LoginError::WrongCredentials.into());
    };

    let out = service
        .execute(command::CreateUserSession {
            email,
            password: SecretBox::new(Box::new(password)),
        })
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(CreatedSession {
        token: out.token.to_string(),
        user: out.user.into(),
        expires_at: out.expires_at.coerce(),
    }))
}

/// Returns the currently authenticated `User`.
#[tracing::instrument(
    skip_all,
    fields(user.id = %session.user.id, http.route = "GET /users/me"),
)]
pub async fn me(session: Session) -> Json<User> {
    Json(session.user.into())
}

define_error! {
    enum LoginError {
        #[code = "WRONG_CREDENTIALS"]
        #[status = UNAUTHORIZED]
        #[message = "Provided credentials does not match any `User`"]
        WrongCredentials,

        #[code = "USER_INACTIVE"]
        #[status = FORBIDDEN]
        #[message = "`User` is deactivated"]
        UserInactive,
    }
}

impl AsError for command::create_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "EMAIL_OCCUPIED"]
                #[status = CONFLICT]
                #[message = "Email is used by another `User`"]
                EmailOccupied,

                #[code = "FIRM_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "Firm with the provided ID doesn't exist"]
                FirmNotExists,

                #[code = "FIRM_REQUIRED"]
                #[status = BAD_REQUEST]
                #[message = "`FIRM_ADMIN` must reference a firm"]
                FirmRequired,

                #[code = "ROLE_NOT_ALLOWED"]
                #[status = BAD_REQUEST]
                #[message = "Provided role cannot be registered"]
                RoleNotAllowed,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::PasswordHash(_) => None,
            Self::EmailOccupied(_) => Some(Error::EmailOccupied.into()),
            Self::FirmNotExists(_) => Some(Error::FirmNotExists.into()),
            Self::FirmRequired => Some(Error::FirmRequired.into()),
            Self::RoleNotAllowed(_) => Some(Error::RoleNotAllowed.into()),
        }
    }
}

impl AsError for command::create_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::JsonWebTokenEncodeError(_) => None,
            Self::UserInactive(_) => Some(LoginError::UserInactive.into()),
            Self::WrongCredentials => Some(LoginError::WrongCredentials.into()),
        }
    }
}
