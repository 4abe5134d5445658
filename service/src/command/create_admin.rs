//! [`Command`] for creating the platform administrator [`User`].

use common::{
    operations::{By, Insert, Select},
    DateTime,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret, SecretBox};
use tracerr::Traced;

use crate::{
    domain::{
        user::{self, Role},
        User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating the platform administrator [`User`] unless a
/// [`User`] with the same [`user::Email`] exists already.
#[derive(Debug)]
pub struct CreateAdmin {
    /// [`user::Name`] of the administrator.
    pub name: user::Name,

    /// [`user::Email`] of the administrator.
    pub email: user::Email,

    /// [`user::Password`] of the administrator.
    pub password: SecretBox<user::Password>,
}

impl<Db> Command<CreateAdmin> for Service<Db>
where
    Db: for<'l> Database<
            Select<By<Option<User>, &'l user::Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Insert<User>, Err = Traced<database::Error>>,
{
    /// Created [`User`], if any.
    type Ok = Option<User>;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateAdmin) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateAdmin {
            name,
            email,
            password,
        } = cmd;

        let existing = self
            .database()
            .execute(Select(By::new(&email)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if existing.is_some() {
            return Ok(None);
        }

        let password_hash = user::PasswordHash::new(password.expose_secret())
            .map_err(tracerr::from_and_wrap!(=> E))?;
        let user = User {
            id: user::Id::new(),
            name,
            email,
            password_hash,
            role: Role::Admin,
            firm_id: None,
            is_active: true,
            created_at: DateTime::now().coerce(),
        };

        self.database()
            .execute(Insert(user.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(Some(user))
    }
}

/// Error of [`CreateAdmin`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`user::Password`] hashing failed.
    #[display("Failed to hash `Password`: {_0}")]
    PasswordHash(argon2::password_hash::Error),
}
