//! [`Earning`]-related [`Database`] implementations.

use common::operations::{By, Delete, Insert, Lock, Select, Update};
use tracerr::Traced;

use crate::{
    domain::{claim, earning, Earning},
    infra::{
        database::{self, memory::Store, Memory},
        Database,
    },
    read,
};

impl<C> Database<Select<By<Option<Earning>, earning::Id>>> for Memory<C>
where
    C: Store,
{
    type Ok = Option<Earning>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Earning>, earning::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.with(|s| s.earnings.get(&id).cloned()).await
    }
}

impl<C> Database<Select<By<Vec<Earning>, read::earning::Filter>>> for Memory<C>
where
    C: Store,
{
    type Ok = Vec<Earning>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Earning>, read::earning::Filter>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::earning::Filter { user_id, status } = by.into_inner();
        self.with(|s| {
            let mut earnings = s
                .earnings
                .values()
                .filter(|e| {
                    e.user_id == user_id
                        && status.map_or(true, |st| e.status == st)
                })
                .cloned()
                .collect::<Vec<_>>();
            earnings.sort_by(|a, b| {
                b.earned_at
                    .cmp(&a.earned_at)
                    .then(b.created_at.cmp(&a.created_at))
            });
            earnings
        })
        .await
    }
}

impl<C> Database<Insert<Earning>> for Memory<C>
where
    C: Store,
    Self: Database<Update<Earning>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(earning): Insert<Earning>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(earning)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Earning>> for Memory<C>
where
    C: Store,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(earning): Update<Earning>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|s| drop(s.earnings.insert(earning.id, earning)))
            .await
    }
}

impl<C> Database<Delete<By<Earning, earning::Id>>> for Memory<C>
where
    C: Store,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Earning, earning::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.with(|s| drop(s.earnings.remove(&id))).await
    }
}

impl<C> Database<Delete<By<read::earning::Pending, claim::Id>>> for Memory<C>
where
    C: Store,
{
    type Ok = u64;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<read::earning::Pending, claim::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let claim_id = by.into_inner();
        self.with(|s| {
            let before = s.earnings.len();
            s.earnings.retain(|_, e| {
                e.claim_id != Some(claim_id)
                    || e.status != earning::Status::Pending
            });
            u64::try_from(before - s.earnings.len()).unwrap_or(u64::MAX)
        })
        .await
    }
}

impl<C> Database<Lock<By<Earning, earning::Id>>> for Memory<C>
where
    C: Store,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Earning, earning::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // The whole `State` is locked by a transaction already.
        Ok(())
    }
}
