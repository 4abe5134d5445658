//! Affiliate-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Insert, Lock, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        affiliate::{
            self, commission,
            ledger::{self, Adjustment},
            referral, Commission, Partner, Referral,
        },
        user,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

/// Columns of the `affiliate_partners` table.
const PARTNER_COLUMNS: &str = "\
    id, code, name, commission_rate, status, \
    total_referrals, total_earnings, created_at";

/// Reads a [`Partner`] from the provided [`Row`] of [`PARTNER_COLUMNS`].
fn partner_from_row(row: &Row) -> Partner {
    Partner {
        id: row.get("id"),
        code: row.get("code"),
        name: row.get("name"),
        commission_rate: row.get("commission_rate"),
        status: row.get("status"),
        total_referrals: row
            .get::<_, i32>("total_referrals")
            .try_into()
            .unwrap_or_default(),
        total_earnings: row.get("total_earnings"),
        created_at: row.get("created_at"),
    }
}

impl<C> Database<Select<By<Option<Partner>, affiliate::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Partner>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Partner>, affiliate::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql = format!(
            "SELECT {PARTNER_COLUMNS} \
             FROM affiliate_partners \
             WHERE id = $1::UUID"
        );
        Ok(self
            .query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(partner_from_row))
    }
}

impl<'c, C> Database<Select<By<Option<Partner>, &'c affiliate::Code>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Partner>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Partner>, &'c affiliate::Code>>,
    ) -> Result<Self::Ok, Self::Err> {
        let code = by.into_inner();

        let sql = format!(
            "SELECT {PARTNER_COLUMNS} \
             FROM affiliate_partners \
             WHERE code = $1::VARCHAR"
        );
        Ok(self
            .query_opt(&sql, &[&code])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(partner_from_row))
    }
}

impl<C> Database<Insert<Partner>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(partner): Insert<Partner>,
    ) -> Result<Self::Ok, Self::Err> {
        let Partner {
            id,
            code,
            name,
            commission_rate,
            status,
            total_referrals,
            total_earnings,
            created_at,
        } = partner;
        let total_referrals =
            i32::try_from(total_referrals).unwrap_or(i32::MAX);

        let sql = format!(
            "INSERT INTO affiliate_partners ({PARTNER_COLUMNS}) \
             VALUES (\
                 $1::UUID, $2::VARCHAR, $3::VARCHAR, $4::NUMERIC, \
                 $5::VARCHAR, $6::INT4, $7::NUMERIC, $8::TIMESTAMPTZ\
             )"
        );
        self.exec(
            &sql,
            &[
                &id,
                &code,
                &name,
                &commission_rate,
                &status,
                &total_referrals,
                &total_earnings,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Partner, affiliate::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Partner, affiliate::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM affiliate_partners \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

/// Columns of the `referrals` table.
const REFERRAL_COLUMNS: &str = "\
    id, affiliate_id, referred_user_id, status, \
    subscription_amount, converted_at, created_at";

/// Reads a [`Referral`] from the provided [`Row`] of [`REFERRAL_COLUMNS`].
fn referral_from_row(row: &Row) -> Referral {
    Referral {
        id: row.get("id"),
        affiliate_id: row.get("affiliate_id"),
        referred_user_id: row.get("referred_user_id"),
        status: row.get("status"),
        subscription_amount: row.get("subscription_amount"),
        converted_at: row.get("converted_at"),
        created_at: row.get("created_at"),
    }
}

impl<C> Database<Select<By<Option<Referral>, referral::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Referral>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Referral>, referral::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql = format!(
            "SELECT {REFERRAL_COLUMNS} \
             FROM referrals \
             WHERE id = $1::UUID"
        );
        Ok(self
            .query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(referral_from_row))
    }
}

impl<C> Database<Select<By<Option<Referral>, (affiliate::Id, user::Id)>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Referral>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Referral>, (affiliate::Id, user::Id)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (affiliate_id, user_id) = by.into_inner();

        let sql = format!(
            "SELECT {REFERRAL_COLUMNS} \
             FROM referrals \
             WHERE affiliate_id = $1::UUID \
               AND referred_user_id = $2::UUID"
        );
        Ok(self
            .query_opt(&sql, &[&affiliate_id, &user_id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(referral_from_row))
    }
}

impl<C> Database<Insert<Referral>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(referral): Insert<Referral>,
    ) -> Result<Self::Ok, Self::Err> {
        let Referral {
            id,
            affiliate_id,
            referred_user_id,
            status,
            subscription_amount,
            converted_at,
            created_at,
        } = referral;

        let sql = format!(
            "WITH inserted AS (\
                 INSERT INTO referrals ({REFERRAL_COLUMNS}) \
                 VALUES (\
                     $1::UUID, $2::UUID, $3::UUID, $4::VARCHAR, \
                     $5::NUMERIC, $6::TIMESTAMPTZ, $7::TIMESTAMPTZ\
                 ) \
                 RETURNING affiliate_id\
             ) \
             UPDATE affiliate_partners \
             SET total_referrals = total_referrals + 1 \
             WHERE id IN (SELECT affiliate_id FROM inserted)"
        );
        self.exec(
            &sql,
            &[
                &id,
                &affiliate_id,
                &referred_user_id,
                &status,
                &subscription_amount,
                &converted_at,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Update<Referral>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(referral): Update<Referral>,
    ) -> Result<Self::Ok, Self::Err> {
        let Referral {
            id,
            status,
            subscription_amount,
            converted_at,
            ..
        } = referral;

        const SQL: &str = "\
            UPDATE referrals \
            SET status = $2::VARCHAR, \
                subscription_amount = $3::NUMERIC, \
                converted_at = $4::TIMESTAMPTZ \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&id, &status, &subscription_amount, &converted_at])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Lock<By<Referral, referral::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Referral, referral::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM referrals \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

/// Columns of the `affiliate_commissions` table.
const COMMISSION_COLUMNS: &str = "\
    id, affiliate_id, referral_id, amount, commission_rate, status, \
    paid_at, payment_method, payment_reference, created_at";

/// Reads a [`Commission`] from the provided [`Row`] of
/// [`COMMISSION_COLUMNS`].
fn commission_from_row(row: &Row) -> Commission {
    Commission {
        id: row.get("id"),
        affiliate_id: row.get("affiliate_id"),
        referral_id: row.get("referral_id"),
        amount: row.get("amount"),
        rate: row.get("commission_rate"),
        status: row.get("status"),
        paid_at: row.get("paid_at"),
        payment_method: row.get("payment_method"),
        payment_reference: row.get("payment_reference"),
        created_at: row.get("created_at"),
    }
}

impl<C, IDs> Database<Select<By<HashMap<commission::Id, Commission>, IDs>>>
    for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[commission::Id]>,
{
    type Ok = HashMap<commission::Id, Commission>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<commission::Id, Commission>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[commission::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            "SELECT {COMMISSION_COLUMNS} \
             FROM affiliate_commissions \
             WHERE id = ANY($1::UUID[])"
        );
        Ok(self
            .query(&sql, &[&ids])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| {
                let commission = commission_from_row(row);
                (commission.id, commission)
            })
            .collect())
    }
}

impl<C> Database<Select<By<Option<Commission>, commission::Id>>>
    for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<commission::Id, Commission>, [commission::Id; 1]>>,
        Ok = HashMap<commission::Id, Commission>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Commission>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Commission>, commission::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl<C> Database<Select<By<Vec<Commission>, affiliate::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Commission>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Commission>, affiliate::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let affiliate_id = by.into_inner();

        let sql = format!(
            "SELECT {COMMISSION_COLUMNS} \
             FROM affiliate_commissions \
             WHERE affiliate_id = $1::UUID \
             ORDER BY created_at DESC"
        );
        Ok(self
            .query(&sql, &[&affiliate_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(commission_from_row)
            .collect())
    }
}

impl<C> Database<Lock<By<Commission, commission::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Commission, commission::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM affiliate_commissions \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Update<ledger::Entry>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(entry): Update<ledger::Entry>,
    ) -> Result<Self::Ok, Self::Err> {
        let (commission, adjustment) = entry.into_parts();
        let Commission {
            id,
            affiliate_id,
            referral_id,
            amount,
            rate,
            status,
            paid_at,
            payment_method,
            payment_reference,
            created_at,
        } = commission;

        let sql = format!(
            "INSERT INTO affiliate_commissions ({COMMISSION_COLUMNS}) \
             VALUES (\
                 $1::UUID, $2::UUID, $3::UUID, \
                 $4::NUMERIC, $5::NUMERIC, $6::VARCHAR, \
                 $7::TIMESTAMPTZ, $8::VARCHAR, $9::VARCHAR, \
                 $10::TIMESTAMPTZ\
             ) \
             ON CONFLICT (id) DO UPDATE \
             SET status = EXCLUDED.status, \
                 paid_at = EXCLUDED.paid_at, \
                 payment_method = EXCLUDED.payment_method, \
                 payment_reference = EXCLUDED.payment_reference"
        );
        self.exec(
            &sql,
            &[
                &id,
                &affiliate_id,
                &referral_id,
                &amount,
                &rate,
                &status,
                &paid_at,
                &payment_method,
                &payment_reference,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())?;

        const CREDIT_SQL: &str = "\
            UPDATE affiliate_partners \
            SET total_earnings = total_earnings + $2::NUMERIC \
            WHERE id = $1::UUID";
        const DEBIT_SQL: &str = "\
            UPDATE affiliate_partners \
            SET total_earnings = GREATEST(total_earnings - $2::NUMERIC, 0) \
            WHERE id = $1::UUID";
        let (sql, amount) = match adjustment {
            Adjustment::None => return Ok(()),
            Adjustment::Credit(amount) => (CREDIT_SQL, amount),
            Adjustment::Debit(amount) => (DEBIT_SQL, amount),
        };
        self.exec(sql, &[&affiliate_id, &amount])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
