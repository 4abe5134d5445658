//! [`Firm`]-related [`Database`] implementations.

use common::operations::{By, Insert, Lock, Select, Update};
use tracerr::Traced;

use crate::{
    domain::{firm, user, Firm},
    infra::{
        database::{
            self, constraint,
            memory::{ensure_unique, Store},
            Memory,
        },
        Database,
    },
};

impl<C> Database<Select<By<Option<Firm>, firm::Id>>> for Memory<C>
where
    C: Store,
{
    type Ok = Option<Firm>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Firm>, firm::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.with(|s| s.firms.get(&id).cloned()).await
    }
}

impl<C> Database<Insert<Firm>> for Memory<C>
where
    C: Store,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(firm): Insert<Firm>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|s| drop(s.firms.insert(firm.id, firm))).await
    }
}

impl<C> Database<Select<By<Option<firm::Connection>, firm::connection::Id>>>
    for Memory<C>
where
    C: Store,
{
    type Ok = Option<firm::Connection>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<firm::Connection>, firm::connection::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.with(|s| s.connections.get(&id).cloned()).await
    }
}

impl<C> Database<Select<By<Option<firm::Connection>, (user::Id, firm::Id)>>>
    for Memory<C>
where
    C: Store,
{
    type Ok = Option<firm::Connection>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<firm::Connection>, (user::Id, firm::Id)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (adjuster_id, firm_id) = by.into_inner();
        self.with(|s| {
            s.connections
                .values()
                .find(|c| c.adjuster_id == adjuster_id && c.firm_id == firm_id)
                .cloned()
        })
        .await
    }
}

impl<C> Database<Insert<firm::Connection>> for Memory<C>
where
    C: Store,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(conn): Insert<firm::Connection>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|s| {
            ensure_unique(
                s.connections.values().any(|c| {
                    c.id != conn.id
                        && c.adjuster_id == conn.adjuster_id
                        && c.firm_id == conn.firm_id
                }),
                constraint::FIRM_CONNECTION,
            )
            .map(|()| drop(s.connections.insert(conn.id, conn)))
        })
        .await?
    }
}

impl<C> Database<Update<firm::Connection>> for Memory<C>
where
    C: Store,
    Self: Database<
        Insert<firm::Connection>,
        Ok = (),
        Err = Traced<database::Error>,
    >,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(conn): Update<firm::Connection>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Insert(conn)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Lock<By<firm::Connection, firm::connection::Id>>>
    for Memory<C>
where
    C: Store,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<firm::Connection, firm::connection::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // The whole `State` is locked by a transaction already.
        Ok(())
    }
}
