//! Affiliate-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Insert, Lock, Select, Update};
use tracerr::Traced;

use crate::{
    domain::{
        affiliate::{
            self, commission, ledger, referral, Commission, Partner, Referral,
        },
        user,
    },
    infra::{
        database::{
            self, constraint,
            memory::{ensure_unique, Store},
            Memory,
        },
        Database,
    },
};

impl<C> Database<Select<By<Option<Partner>, affiliate::Id>>> for Memory<C>
where
    C: Store,
{
    type Ok = Option<Partner>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Partner>, affiliate::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.with(|s| s.partners.get(&id).cloned()).await
    }
}

impl<'c, C> Database<Select<By<Option<Partner>, &'c affiliate::Code>>>
    for Memory<C>
where
    C: Store,
{
    type Ok = Option<Partner>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Partner>, &'c affiliate::Code>>,
    ) -> Result<Self::Ok, Self::Err> {
        let code = by.into_inner();
        self.with(|s| s.partners.values().find(|p| &p.code == code).cloned())
            .await
    }
}

impl<C> Database<Insert<Partner>> for Memory<C>
where
    C: Store,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(partner): Insert<Partner>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|s| {
            ensure_unique(
                s.partners
                    .values()
                    .any(|p| p.id != partner.id && p.code == partner.code),
                constraint::AFFILIATE_CODE,
            )
            .map(|()| drop(s.partners.insert(partner.id, partner)))
        })
        .await?
    }
}

impl<C> Database<Lock<By<Partner, affiliate::Id>>> for Memory<C>
where
    C: Store,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Partner, affiliate::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // The whole `State` is locked by a transaction already.
        Ok(())
    }
}

impl<C> Database<Select<By<Option<Referral>, referral::Id>>> for Memory<C>
where
    C: Store,
{
    type Ok = Option<Referral>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Referral>, referral::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.with(|s| s.referrals.get(&id).cloned()).await
    }
}

impl<C> Database<Select<By<Option<Referral>, (affiliate::Id, user::Id)>>>
    for Memory<C>
where
    C: Store,
{
    type Ok = Option<Referral>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Referral>, (affiliate::Id, user::Id)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (affiliate_id, user_id) = by.into_inner();
        self.with(|s| {
            s.referrals
                .values()
                .find(|r| {
                    r.affiliate_id == affiliate_id
                        && r.referred_user_id == user_id
                })
                .cloned()
        })
        .await
    }
}

impl<C> Database<Insert<Referral>> for Memory<C>
where
    C: Store,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(referral): Insert<Referral>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|s| {
            ensure_unique(
                s.referrals.values().any(|r| {
                    r.affiliate_id == referral.affiliate_id
                        && r.referred_user_id == referral.referred_user_id
                }),
                constraint::REFERRAL,
            )
            .map(|()| {
                if let Some(p) = s.partners.get_mut(&referral.affiliate_id) {
                    p.total_referrals += 1;
                }
                drop(s.referrals.insert(referral.id, referral));
            })
        })
        .await?
    }
}

impl<C> Database<Update<Referral>> for Memory<C>
where
    C: Store,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(referral): Update<Referral>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|s| drop(s.referrals.insert(referral.id, referral)))
            .await
    }
}

impl<C> Database<Lock<By<Referral, referral::Id>>> for Memory<C>
where
    C: Store,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Referral, referral::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // The whole `State` is locked by a transaction already.
        Ok(())
    }
}

impl<C, IDs> Database<Select<By<HashMap<commission::Id, Commission>, IDs>>>
    for Memory<C>
where
    C: Store,
    IDs: AsRef<[commission::Id]>,
{
    type Ok = HashMap<commission::Id, Commission>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<commission::Id, Commission>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        self.with(|s| {
            ids.as_ref()
                .iter()
                .filter_map(|id| {
                    s.commissions.get(id).map(|c| (*id, c.clone()))
                })
                .collect()
        })
        .await
    }
}

impl<C> Database<Select<By<Option<Commission>, commission::Id>>> for Memory<C>
where
    C: Store,
{
    type Ok = Option<Commission>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Commission>, commission::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.with(|s| s.commissions.get(&id).cloned()).await
    }
}

impl<C> Database<Select<By<Vec<Commission>, affiliate::Id>>> for Memory<C>
where
    C: Store,
{
    type Ok = Vec<Commission>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Commission>, affiliate::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let affiliate_id = by.into_inner();
        self.with(|s| {
            let mut commissions = s
                .commissions
                .values()
                .filter(|c| c.affiliate_id == affiliate_id)
                .cloned()
                .collect::<Vec<_>>();
            commissions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            commissions
        })
        .await
    }
}

impl<C> Database<Lock<By<Commission, commission::Id>>> for Memory<C>
where
    C: Store,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Commission, commission::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // The whole `State` is locked by a transaction already.
        Ok(())
    }
}

impl<C> Database<Update<ledger::Entry>> for Memory<C>
where
    C: Store,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(entry): Update<ledger::Entry>,
    ) -> Result<Self::Ok, Self::Err> {
        let (commission, adjustment) = entry.into_parts();
        self.with(|s| {
            if let Some(p) = s.partners.get_mut(&commission.affiliate_id) {
                p.total_earnings = adjustment.apply_to(p.total_earnings);
            }
            drop(s.commissions.insert(commission.id, commission));
        })
        .await
    }
}
