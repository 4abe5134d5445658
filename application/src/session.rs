//! [`Session`]-related definitions.

use axum::{async_trait, extract::FromRequestParts, RequestPartsExt as _};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use common::DateTime;
use service::{
    command::{self, Command as _},
    domain::{user::session, Actor, User},
};

use crate::{define_error, AsError, Error, Service};

/// Authenticated session of the [`User`] performing the current request.
///
/// Extracting it rejects the request unless it carries a valid
/// `Authorization: Bearer <token>` header.
#[derive(Clone, Debug)]
pub struct Session {
    /// [`User`] the [`Session`] belongs to, as of the current request.
    pub user: User,

    /// [`DateTime`] when this [`Session`] expires.
    pub expires_at: DateTime,
}

impl Session {
    /// Returns the [`Actor`] this [`Session`] acts as.
    #[must_use]
    pub fn actor(&self) -> Actor {
        Actor::from(&self.user)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        let service = parts
            .extensions
            .get::<Service>()
            .cloned()
            .ok_or_else(|| Error::internal(&"missing `Service` extension"))?;

        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|e| {
                if e.is_missing() {
                    AuthError::AuthorizationRequired.into()
                } else {
                    e.into_error()
                }
            })?;

        #[expect(unsafe_code, reason = "specified in correct header")]
        let token =
            unsafe { session::Token::new_unchecked(bearer.token().to_owned()) };
        let (user, session) = service
            .execute(command::AuthorizeUserSession { token })
            .await
            .map_err(AsError::into_error)?;

        Ok(Self {
            user,
            expires_at: session.expires_at.coerce(),
        })
    }
}

impl AsError for command::authorize_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::JsonWebTokenDecodeError(_) => {
                Some(AuthError::InvalidToken.into())
            }
            Self::UserNotExists(_) => {
                Some(AuthError::AuthorizationRequired.into())
            }
        }
    }
}

define_error! {
    enum AuthError {
        #[code = "AUTHORIZATION_REQUIRED"]
        #[status = UNAUTHORIZED]
        #[message = "Authorization required"]
        AuthorizationRequired,

        #[code = "INVALID_TOKEN"]
        #[status = UNAUTHORIZED]
        #[message = "Provided token is invalid or expired"]
        InvalidToken,
    }
}
