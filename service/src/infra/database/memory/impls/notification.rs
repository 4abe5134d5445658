//! [`Notification`]-related [`Database`] implementations.

use common::operations::{By, Insert, Select, Update};
use tracerr::Traced;

use crate::{
    domain::{notification, Notification},
    infra::{
        database::{self, memory::Store, Memory},
        Database,
    },
    read,
};

impl<C> Database<Select<By<Option<Notification>, notification::Id>>>
    for Memory<C>
where
    C: Store,
{
    type Ok = Option<Notification>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Notification>, notification::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.with(|s| s.notifications.get(&id).cloned()).await
    }
}

impl<C> Database<Select<By<Vec<Notification>, read::notification::Filter>>>
    for Memory<C>
where
    C: Store,
{
    type Ok = Vec<Notification>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Notification>, read::notification::Filter>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::notification::Filter {
            user_id,
            unread_only,
        } = by.into_inner();
        self.with(|s| {
            let mut notifications = s
                .notifications
                .values()
                .filter(|n| n.user_id == user_id && !(unread_only && n.is_read))
                .cloned()
                .collect::<Vec<_>>();
            notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            notifications
        })
        .await
    }
}

impl<C> Database<Insert<Notification>> for Memory<C>
where
    C: Store,
    Self: Database<
        Update<Notification>,
        Ok = (),
        Err = Traced<database::Error>,
    >,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(notification): Insert<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(notification))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Notification>> for Memory<C>
where
    C: Store,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(notification): Update<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|s| {
            drop(s.notifications.insert(notification.id, notification));
        })
        .await
    }
}
