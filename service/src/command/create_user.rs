//! [`Command`] for registering a new [`User`].

use common::{
    operations::{By, Insert, Select},
    DateTime,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{Email, Name, Password};
use crate::{
    domain::{
        firm,
        user::{self, Role},
        Firm, User,
    },
    infra::{
        database::{self, constraint},
        Database,
    },
    Service,
};

use super::Command;

/// [`Command`] for registering a new [`User`].
#[derive(Debug)]
pub struct CreateUser {
    /// [`Name`] of a new [`User`].
    pub name: user::Name,

    /// [`Email`] of a new [`User`].
    pub email: user::Email,

    /// [`Password`] of a new [`User`].
    pub password: SecretBox<user::Password>,

    /// [`Role`] of a new [`User`].
    ///
    /// [`Role::Admin`] cannot be registered.
    pub role: Role,

    /// ID of the [`Firm`] a new [`Role::FirmAdmin`] administers.
    pub firm_id: Option<firm::Id>,
}

impl<Db> Command<CreateUser> for Service<Db>
where
    Db: for<'l> Database<
            Select<By<Option<User>, &'l user::Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Firm>, firm::Id>>,
            Ok = Option<Firm>,
            Err = Traced<database::Error>,
        > + Database<Insert<User>, Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateUser {
            name,
            email,
            password,
            role,
            firm_id,
        } = cmd;

        let firm_id = match (role, firm_id) {
            (Role::Admin, _) => {
                return Err(tracerr::new!(E::RoleNotAllowed(role)));
            }
            (Role::FirmAdmin, None) => {
                return Err(tracerr::new!(E::FirmRequired));
            }
            (Role::FirmAdmin, Some(id)) => {
                self.database()
                    .execute(Select(By::<Option<Firm>, _>::new(id)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                    .ok_or(E::FirmNotExists(id))
                    .map_err(tracerr::wrap!())?;
                Some(id)
            }
            (Role::Adjuster, _) => None,
        };

        let u = self
            .database()
            .execute(Select(By::new(&email)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if u.is_some() {
            return Err(tracerr::new!(E::EmailOccupied(email)));
        }

        let password_hash = user::PasswordHash::new(password.expose_secret())
            .map_err(tracerr::from_and_wrap!(=> E))?;
        let user = User {
            id: user::Id::new(),
            name,
            email,
            password_hash,
            role,
            firm_id,
            is_active: true,
            created_at: DateTime::now().coerce(),
        };

        self.database()
            .execute(Insert(user.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map_err(|e| {
                if matches!(
                    e.as_ref(),
                    E::Db(db) if db.is_unique_violation(
                        Some(constraint::USER_EMAIL),
                    ),
                ) {
                    tracerr::new!(E::EmailOccupied(user.email.clone()))
                } else {
                    e
                }
            })
            .map(drop)?;

        Ok(user)
    }
}

/// Error of [`CreateUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`user::Password`] hashing failed.
    #[display("Failed to hash `Password`: {_0}")]
    #[from]
    PasswordHash(argon2::password_hash::Error),

    /// [`user::Email`] is already occupied.
    #[display("`{_0}` email is occupied")]
    EmailOccupied(#[error(not(source))] user::Email),

    /// [`Firm`] with the provided ID does not exist.
    #[display("`Firm(id: {_0})` does not exist")]
    FirmNotExists(#[error(not(source))] firm::Id),

    /// [`Role::FirmAdmin`] is registered without a [`Firm`].
    #[display("`FIRM_ADMIN` must reference a `Firm`")]
    FirmRequired,

    /// [`Role`] cannot be registered.
    #[display("`{_0}` role cannot be registered")]
    RoleNotAllowed(#[error(not(source))] Role),
}

#[cfg(test)]
mod spec {
    use secrecy::SecretBox;

    use crate::{
        domain::{firm, user},
        infra::Memory,
        Command as _, Config, Service,
    };

    use super::{CreateUser, ExecutionError};

    fn cmd(email: &str, role: user::Role) -> CreateUser {
        CreateUser {
            name: user::Name::new("John Doe").unwrap(),
            email: user::Email::new(email).unwrap(),
            password: SecretBox::new(Box::new(
                user::Password::new("password1").unwrap(),
            )),
            role,
            firm_id: None,
        }
    }

    #[tokio::test]
    async fn rejects_occupied_email() {
        let svc = Service::new(Config::with_secret(b"s"), Memory::new());

        let user = svc
            .execute(cmd("john@example.com", user::Role::Adjuster))
            .await
            .unwrap();
        assert!(user.is_active);

        let err = svc
            .execute(cmd("JOHN@example.com", user::Role::Adjuster))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::EmailOccupied(_)));
    }

    #[tokio::test]
    async fn rejects_admin_registration() {
        let svc = Service::new(Config::with_secret(b"s"), Memory::new());

        let err = svc
            .execute(cmd("root@example.com", user::Role::Admin))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::RoleNotAllowed(_)));
    }

    #[tokio::test]
    async fn requires_existing_firm_for_firm_admin() {
        let svc = Service::new(Config::with_secret(b"s"), Memory::new());

        let err = svc
            .execute(cmd("boss@example.com", user::Role::FirmAdmin))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::FirmRequired));

        let mut c = cmd("boss@example.com", user::Role::FirmAdmin);
        c.firm_id = Some(firm::Id::new());
        let err = svc.execute(c).await.unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::FirmNotExists(_)));
    }
}
