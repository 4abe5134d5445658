//! [`Command`] for authorizing a [`User`].

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use jsonwebtoken::Validation;
use tracerr::Traced;

use crate::{
    domain::{
        user::{self, session, Session},
        User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for authorizing a [`User`] by a [`Session`] token.
#[derive(Clone, Debug, From)]
pub struct AuthorizeUserSession {
    /// [`Session`] token to authorize.
    pub token: session::Token,
}

impl<Db> Command<AuthorizeUserSession> for Service<Db>
where
    Db: Database<
        Select<By<Option<User>, user::Id>>,
        Ok = Option<User>,
        Err = Traced<database::Error>,
    >,
{
    /// Authorized [`User`] along with its [`Session`].
    type Ok = (User, Session);
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AuthorizeUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AuthorizeUserSession { token } = cmd;

        let session = jsonwebtoken::decode::<Session>(
            token.as_ref(),
            &self.config().jwt_decoding_key,
            &Validation::default(),
        )
        .map_err(tracerr::from_and_wrap!(=> E))?
        .claims;

        let user = self
            .database()
            .execute(Select(By::new(session.user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(session.user_id))
            .map_err(tracerr::wrap!())?;

        Ok((user, session))
    }
}

/// Error of [`AuthorizeUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`jsonwebtoken`] decoding error.
    #[display("Failed to decode a JSON Web Token: {_0}")]
    JsonWebTokenDecodeError(jsonwebtoken::errors::Error),

    /// [`User`] the [`Session`] belongs to does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use secrecy::SecretBox;

    use crate::{
        command::{CreateUser, CreateUserSession},
        domain::{user, User},
        infra::Memory,
        Command as _, Config, Service,
    };

    use super::{AuthorizeUserSession, ExecutionError};

    async fn register(svc: &Service<Memory>) -> User {
        svc.execute(CreateUser {
            name: user::Name::new("Jane").unwrap(),
            email: user::Email::new("jane@example.com").unwrap(),
            password: SecretBox::new(Box::new(
                user::Password::new("password1").unwrap(),
            )),
            role: user::Role::Adjuster,
            firm_id: None,
        })
        .await
        .unwrap()
    }

    fn login(password: &str) -> CreateUserSession {
        CreateUserSession {
            email: user::Email::new("jane@example.com").unwrap(),
            password: SecretBox::new(Box::new(
                user::Password::new(password).unwrap(),
            )),
        }
    }

    #[tokio::test]
    async fn authorizes_issued_token() {
        let svc = Service::new(Config::with_secret(b"secret"), Memory::new());
        let user = register(&svc).await;

        let out = svc.execute(login("password1")).await.unwrap();
        assert_eq!(out.user.id, user.id);

        let (authorized, session) = svc
            .execute(AuthorizeUserSession { token: out.token })
            .await
            .unwrap();
        assert_eq!(authorized.id, user.id);
        assert_eq!(session.expires_at, out.expires_at);
    }

    #[tokio::test]
    async fn rejects_wrong_password() {
        let svc = Service::new(Config::with_secret(b"secret"), Memory::new());
        drop(register(&svc).await);

        let err = svc.execute(login("password2")).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            crate::command::create_user_session::ExecutionError::
                WrongCredentials,
        ));
    }

    #[tokio::test]
    async fn rejects_foreign_token() {
        let issuer = Service::new(Config::with_secret(b"one"), Memory::new());
        drop(register(&issuer).await);
        let out = issuer.execute(login("password1")).await.unwrap();

        let other = Service::new(Config::with_secret(b"two"), Memory::new());
        let err = other
            .execute(AuthorizeUserSession { token: out.token })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::JsonWebTokenDecodeError(_),
        ));
    }
}
