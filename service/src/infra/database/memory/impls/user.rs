//! [`User`]-related [`Database`] implementations.

use common::operations::{By, Insert, Select};
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::{
        database::{
            self, constraint,
            memory::{ensure_unique, Store},
            Memory,
        },
        Database,
    },
};

impl<C> Database<Select<By<Option<User>, user::Id>>> for Memory<C>
where
    C: Store,
{
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.with(|s| s.users.get(&id).cloned()).await
    }
}

impl<'l, C> Database<Select<By<Option<User>, &'l user::Email>>> for Memory<C>
where
    C: Store,
{
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'l user::Email>>,
    ) -> Result<Self::Ok, Self::Err> {
        let email = by.into_inner();
        self.with(|s| s.users.values().find(|u| &u.email == email).cloned())
            .await
    }
}

impl<C> Database<Insert<User>> for Memory<C>
where
    C: Store,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(user): Insert<User>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|s| {
            ensure_unique(
                s.users
                    .values()
                    .any(|u| u.id != user.id && u.email == user.email),
                constraint::USER_EMAIL,
            )
            .map(|()| drop(s.users.insert(user.id, user)))
        })
        .await?
    }
}
