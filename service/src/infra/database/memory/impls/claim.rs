//! [`Claim`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{
    By, Delete, Expecting, Insert, Lock, Next, Select, Update,
};
use tracerr::Traced;

use crate::{
    domain::{claim, Claim},
    infra::{
        database::{self, memory::Store, Memory},
        Database,
    },
    read::claim::list,
};

impl<C, IDs> Database<Select<By<HashMap<claim::Id, Claim>, IDs>>>
    for Memory<C>
where
    C: Store,
    IDs: AsRef<[claim::Id]>,
{
    type Ok = HashMap<claim::Id, Claim>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<claim::Id, Claim>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        self.with(|s| {
            ids.as_ref()
                .iter()
                .filter_map(|id| s.claims.get(id).map(|c| (*id, c.clone())))
                .collect()
        })
        .await
    }
}

impl<C> Database<Select<By<Option<Claim>, claim::Id>>> for Memory<C>
where
    C: Store,
{
    type Ok = Option<Claim>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Claim>, claim::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.with(|s| s.claims.get(&id).cloned()).await
    }
}

impl<C> Database<Insert<Claim>> for Memory<C>
where
    C: Store,
    Self: Database<Update<Claim>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(claim): Insert<Claim>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(claim)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Claim>> for Memory<C>
where
    C: Store,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(claim): Update<Claim>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|s| drop(s.claims.insert(claim.id, claim))).await
    }
}

impl<C> Database<Update<Expecting<Claim, claim::Status>>> for Memory<C>
where
    C: Store,
{
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(cas): Update<Expecting<Claim, claim::Status>>,
    ) -> Result<Self::Ok, Self::Err> {
        let Expecting {
            value: claim,
            expected,
        } = cas;
        self.with(|s| match s.claims.get_mut(&claim.id) {
            Some(stored) if stored.status == expected => {
                *stored = claim;
                true
            }
            Some(_) | None => false,
        })
        .await
    }
}

impl<C> Database<Lock<By<Claim, claim::Id>>> for Memory<C>
where
    C: Store,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Claim, claim::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // The whole `State` is locked by a transaction already.
        Ok(())
    }
}

impl<C> Database<Delete<By<Claim, claim::Id>>> for Memory<C>
where
    C: Store,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Claim, claim::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.with(|s| {
            drop(s.claims.remove(&id));
            for e in s.earnings.values_mut() {
                if e.claim_id == Some(id) {
                    e.claim_id = None;
                }
            }
        })
        .await
    }
}

impl<C> Database<Next<By<claim::Number, i32>>> for Memory<C>
where
    C: Store,
{
    type Ok = claim::Number;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Next(by): Next<By<claim::Number, i32>>,
    ) -> Result<Self::Ok, Self::Err> {
        let year = by.into_inner();
        self.with(|s| {
            let last = s.claim_numbers.entry(year).or_default();
            *last += 1;
            claim::Number::new(year, *last)
        })
        .await
    }
}

impl<C> Database<Select<By<list::Page, list::Selector>>> for Memory<C>
where
    C: Store,
{
    type Ok = list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<list::Page, list::Selector>>,
    ) -> Result<Self::Ok, Self::Err> {
        let list::Selector { arguments, filter } = by.into_inner();
        self.with(|s| {
            let mut edges = s
                .claims
                .values()
                .filter(|c| {
                    arguments.after.as_ref().map_or(true, |a| c.number < *a)
                        && matches(&filter, c)
                })
                .map(|c| (c.number.clone(), c.id))
                .collect::<Vec<_>>();
            edges.sort_unstable_by(|(a, _), (b, _)| b.cmp(a));
            list::Page::new(&arguments, edges)
        })
        .await
    }
}

/// Checks whether the provided [`Claim`] satisfies the [`list::Filter`].
fn matches(filter: &list::Filter, claim: &Claim) -> bool {
    let list::Filter {
        status,
        firm_id,
        adjuster_id,
        search,
        visibility,
    } = filter;

    visibility.covers(claim)
        && status.map_or(true, |s| claim.status == s)
        && firm_id.map_or(true, |f| claim.firm_id == f)
        && adjuster_id.map_or(true, |a| claim.adjuster_id == Some(a))
        && search.as_ref().map_or(true, |q| {
            q.matches(claim.title.as_ref())
                || q.matches(claim.number.as_ref())
                || claim
                    .description
                    .as_ref()
                    .is_some_and(|d| q.matches(d.as_ref()))
                || claim
                    .address
                    .city
                    .as_ref()
                    .is_some_and(|c| q.matches(c.as_ref()))
        })
}
