//! [`Error`]-related definitions.

use std::{collections::BTreeMap, fmt};

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::typed_header::TypedHeaderRejection;
use derive_more::Error as StdError;
use itertools::Itertools as _;
use serde::Serialize;
use service::infra::database;
use tracerr::{Trace, Traced};
use tracing as log;

/// Defines a new error type.
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_error {
    (
        enum $name:ident {
            $(
                #[code = $code:literal]
                #[status = $status_code:ident]
                #[message = $message:literal]
                $variant:ident
            ),* $(,)?
        }
    ) => {
        /// Error type.
        #[derive(
            Clone,
            Copy,
            Debug,
            ::derive_more::Display,
            ::derive_more::Error
        )]
        #[repr(u16)]
        pub enum $name {
            $(
                #[display($message)]
                #[doc = $message]
                $variant,
            )*
        }

        impl From<$name> for $crate::Error {
            fn from(err: $name) -> Self {
                match err {
                    $(
                        $name::$variant => Self {
                            code: $code,
                            status_code: ::http::StatusCode::$status_code,
                            message: $message.to_string(),
                            details: None,
                            backtrace: None,
                        },
                    )*
                }
            }
        }
    };
}

/// REST API [`Error`].
#[derive(Clone, Debug, StdError)]
pub struct Error {
    /// [`Error`] code.
    pub code: Code,

    /// [`http::StatusCode`] of this [`Error`].
    pub status_code: http::StatusCode,

    /// [`Error`] message.
    pub message: String,

    /// Additional structured information about this [`Error`].
    pub details: Option<serde_json::Value>,

    /// Backtrace of this [`Error`].
    #[error(not(backtrace))]
    pub backtrace: Option<Trace>,
}

impl Error {
    /// Message of the [`Error`]s whose contents must not leak to clients.
    pub const INTERNAL_MESSAGE: &'static str = "Internal server error";

    /// Create a new [`Error`] representing an internal server error.
    #[must_use]
    pub fn internal(msg: &impl ToString) -> Self {
        Self {
            code: "INTERNAL_SERVER_ERROR",
            status_code: http::StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            details: None,
            backtrace: None,
        }
    }

    /// Creates a new [`Error`] of the request validation, describing every
    /// invalid field in its [`Error::details`].
    #[must_use]
    pub fn validation(fields: BTreeMap<&'static str, String>) -> Self {
        Self {
            code: "VALIDATION_FAILED",
            status_code: http::StatusCode::BAD_REQUEST,
            message: "Request validation failed".to_owned(),
            details: Some(serde_json::Value::Object(
                fields
                    .into_iter()
                    .map(|(field, msg)| (field.to_owned(), msg.into()))
                    .collect(),
            )),
            backtrace: None,
        }
    }

    /// Creates a new [`Error`] of a malformed request.
    fn bad_request(code: Code, msg: &impl ToString) -> Self {
        Self {
            code,
            status_code: http::StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            details: None,
            backtrace: None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            code,
            status_code: _,
            message,
            details: _,
            backtrace,
        } = self;

        write!(
            f,
            "[{code}]: {message}{}",
            backtrace
                .iter()
                .format_with("\n", |trace, f| f(&format_args!("{trace}"))),
        )
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        /// Body of an [`Error`] response.
        #[derive(Serialize)]
        struct Body<'e> {
            error: &'e str,
            code: Code,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<&'e serde_json::Value>,
        }

        if self.status_code.is_server_error() {
            log::error!("{self}");
            let body = Body {
                error: Self::INTERNAL_MESSAGE,
                code: self.code,
                details: None,
            };
            return (self.status_code, Json(body)).into_response();
        }

        let body = Body {
            error: &self.message,
            code: self.code,
            details: self.details.as_ref(),
        };
        (self.status_code, Json(body)).into_response()
    }
}

/// [`Error`] code.
pub type Code = &'static str;

/// Helper trait for converting types into [`Error`]s.
pub trait AsError {
    /// Tries to convert the type into an [`Error`].
    ///
    /// [`None`] is returned if the type cannot be converted into an [`Error`].
    fn try_as_error(&self) -> Option<Error>;

    /// Converts the type into an [`Error`].
    fn as_error(&self) -> Error
    where
        Self: fmt::Display,
    {
        self.try_as_error()
            .unwrap_or_else(|| Error::internal(&self))
    }

    /// Converts the type into an [`Error`] by consuming it.
    fn into_error(self) -> Error
    where
        Self: fmt::Display + Sized,
    {
        self.as_error()
    }
}

impl<E: AsError> AsError for Traced<E> {
    fn try_as_error(&self) -> Option<Error> {
        let mut error = self.as_ref().try_as_error()?;
        error.backtrace = Some(self.trace().clone());
        Some(error)
    }

    fn as_error(&self) -> Error
    where
        Self: fmt::Display,
    {
        self.try_as_error().unwrap_or_else(|| Error {
            backtrace: Some(self.trace().clone()),
            ..Error::internal(&self)
        })
    }
}

impl AsError for TypedHeaderRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error::bad_request("BAD_REQUEST", self))
    }
}

impl AsError for JsonRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error::bad_request("INVALID_BODY", &self.body_text()))
    }
}

impl AsError for PathRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error::bad_request("INVALID_PATH", &self.body_text()))
    }
}

impl AsError for QueryRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error::bad_request("INVALID_QUERY", &self.body_text()))
    }
}

impl AsError for database::Error {
    fn try_as_error(&self) -> Option<Error> {
        None
    }
}

#[cfg(test)]
mod spec {
    use std::collections::BTreeMap;

    use axum::{body, response::IntoResponse as _};

    use super::Error;

    async fn body_of(err: Error) -> (http::StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn hides_internal_message() {
        let (status, body) =
            body_of(Error::internal(&"connection refused")).await;

        assert_eq!(status, http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], Error::INTERNAL_MESSAGE);
        assert_eq!(body["code"], "INTERNAL_SERVER_ERROR");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn lists_invalid_fields() {
        let fields = BTreeMap::from([
            ("email", "invalid `Email`".to_owned()),
            ("name", "invalid `Name`".to_owned()),
        ]);

        let (status, body) = body_of(Error::validation(fields)).await;

        assert_eq!(status, http::StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_FAILED");
        assert_eq!(body["details"]["email"], "invalid `Email`");
        assert_eq!(body["details"]["name"], "invalid `Name`");
    }
}
