//! REST API definitions.

/// Parses the provided fields, collecting every failure into a single
/// [`Error::validation()`].
///
/// Each field is given as `name = expr`, where `expr` is a [`Result`] with a
/// displayable error. Evaluates to a [`Result`] of a tuple of all the parsed
/// values.
///
/// [`Error::validation()`]: crate::Error::validation
macro_rules! validate {
    ($($field:ident = $value:expr),+ $(,)?) => {{
        let mut invalid = ::std::collections::BTreeMap::<
            &'static str,
            ::std::string::String,
        >::new();
        $(
            let $field = match $value {
                Ok(v) => Some(v),
                Err(e) => {
                    let field = ::core::stringify!($field);
                    drop(invalid.insert(field, e.to_string()));
                    None
                }
            };
        )+
        match ($($field,)+) {
            ($(Some($field),)+) => Ok(($($field,)+)),
            _ => Err($crate::Error::validation(invalid)),
        }
    }};
}

pub mod affiliate;
pub mod claim;
pub mod earning;
mod extract;
pub mod firm;
pub mod notification;
pub mod user;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::define_error;

pub use self::extract::{Json, Path, Query};

/// Builds the [`Router`] of the whole REST API.
///
/// Handlers expect the [`Service`] to be provided as an [`Extension`].
///
/// [`Extension`]: axum::Extension
/// [`Service`]: crate::Service
#[must_use]
pub fn router() -> Router {
    Router::new()
        .route("/users", post(user::register))
        .route("/users/me", get(user::me))
        .route("/sessions", post(user::login))
        .route("/firms", post(firm::create))
        .route("/firms/:id/connections", post(firm::request_connection))
        .route("/connections/:id", put(firm::review_connection))
        .route("/claims", get(claim::list).post(claim::create))
        .route(
            "/claims/:id",
            get(claim::get).patch(claim::update).delete(claim::delete),
        )
        .route(
            "/claims/:id/assign",
            post(claim::assign).delete(claim::unassign),
        )
        .route("/earnings", get(earning::list).post(earning::create))
        .route("/earnings/summary", get(earning::summary))
        .route(
            "/earnings/:id",
            put(earning::update_status).delete(earning::delete),
        )
        .route("/affiliate/partners", post(affiliate::create_partner))
        .route("/affiliate/partners/:id", get(affiliate::partner))
        .route(
            "/affiliate/referral",
            post(affiliate::track_referral).put(affiliate::convert_referral),
        )
        .route(
            "/affiliate/commission",
            put(affiliate::pay_commissions)
                .post(affiliate::process_commission)
                .delete(affiliate::cancel_commission),
        )
        .route("/notifications", get(notification::list))
        .route("/notifications/:id/read", post(notification::mark_read))
}

define_error! {
    enum PrivilegeError {
        #[code = "FORBIDDEN"]
        #[status = FORBIDDEN]
        #[message = "Authenticated `User` is not allowed to perform this \
                     action"]
        Forbidden,
    }
}

#[cfg(test)]
mod spec {
    //! Request-level scenarios over the in-memory [`Service`].

    use axum::{body::Body, Extension, Router};
    use http::{Request, StatusCode};
    use secrecy::SecretBox;
    use serde_json::{json, Value};
    use service::{command, domain::user, infra::Memory, Command as _};
    use tower::ServiceExt as _;

    use crate::Service;

    pub(super) struct App {
        router: Router,
        service: Service,
    }

    impl App {
        pub(super) fn new() -> Self {
            let service = Service::new(
                service::Config::with_secret(b"secret"),
                Memory::new(),
            );
            Self {
                router: super::router().layer(Extension(service.clone())),
                service,
            }
        }

        /// Ensures the platform administrator exists and logs it in.
        pub(super) async fn admin(&self) -> String {
            drop(
                self.service
                    .execute(command::CreateAdmin {
                        name: user::Name::new("Root").unwrap(),
                        email: user::Email::new("root@example.com").unwrap(),
                        password: SecretBox::new(Box::new(
                            user::Password::new("password1").unwrap(),
                        )),
                    })
                    .await
                    .unwrap(),
            );
            self.login("root@example.com").await
        }

        pub(super) async fn call(
            &self,
            method: &str,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut req = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                req = req.header("Authorization", format!("Bearer {token}"));
            }
            let req = match body {
                Some(body) => req
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string())),
                None => req.body(Body::empty()),
            }
            .unwrap();

            let resp = self.router.clone().oneshot(req).await.unwrap();
            let status = resp.status();
            let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
                .await
                .unwrap();
            let body = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, body)
        }

        /// Registers a new user and logs it in, returning its token and ID.
        pub(super) async fn register(
            &self,
            email: &str,
            role: &str,
            firm_id: Option<&str>,
        ) -> (String, String) {
            let (status, user) = self
                .call(
                    "POST",
                    "/users",
                    None,
                    Some(json!({
                        "name": "Someone",
                        "email": email,
                        "password": "password1",
                        "role": role,
                        "firm_id": firm_id,
                    })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{user}");
            let token = self.login(email).await;
            (token, user["id"].as_str().unwrap().to_owned())
        }

        pub(super) async fn login(&self, email: &str) -> String {
            let (status, session) = self
                .call(
                    "POST",
                    "/sessions",
                    None,
                    Some(json!({"email": email, "password": "password1"})),
                )
                .await;
            assert_eq!(status, StatusCode::OK, "{session}");
            session["token"].as_str().unwrap().to_owned()
        }
    }

    #[tokio::test]
    async fn requires_authorization() {
        let app = App::new();

        let (status, body) = app.call("GET", "/users/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "AUTHORIZATION_REQUIRED");

        let (status, body) =
            app.call("GET", "/claims", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn returns_current_user() {
        let app = App::new();
        let (token, id) = app.register("a@example.com", "ADJUSTER", None).await;

        let (status, me) =
            app.call("GET", "/users/me", Some(&token), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["id"], id.as_str());
        assert_eq!(me["email"], "a@example.com");
        assert_eq!(me["role"], "ADJUSTER");
        assert!(me.get("password_hash").is_none());
    }

    #[tokio::test]
    async fn reports_every_invalid_field() {
        let app = App::new();

        let (status, body) = app
            .call(
                "POST",
                "/users",
                None,
                Some(json!({
                    "name": "",
                    "email": "not-an-email",
                    "password": "short",
                })),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_FAILED");
        assert!(body["details"]["name"].is_string());
        assert!(body["details"]["email"].is_string());
        assert!(body["details"]["password"].is_string());
    }

    #[tokio::test]
    async fn rejects_malformed_body() {
        let app = App::new();

        let (status, body) = app
            .call("POST", "/sessions", None, Some(json!({"email": 42})))
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_BODY");
    }

    #[tokio::test]
    async fn rejects_duplicate_email() {
        let app = App::new();
        drop(app.register("a@example.com", "ADJUSTER", None).await);

        let (status, body) = app
            .call(
                "POST",
                "/users",
                None,
                Some(json!({
                    "name": "Other",
                    "email": "A@example.com",
                    "password": "password1",
                })),
            )
            .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "EMAIL_OCCUPIED");
    }

    #[tokio::test]
    async fn rejects_wrong_credentials() {
        let app = App::new();
        drop(app.register("a@example.com", "ADJUSTER", None).await);

        let (status, body) = app
            .call(
                "POST",
                "/sessions",
                None,
                Some(json!({"email": "a@example.com", "password": "wrong-one"})),
            )
            .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "WRONG_CREDENTIALS");
    }
}
