//! [`Command`] for converting a [`Referral`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime, Money,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        access::{self, Action, Resource},
        affiliate::{self, ledger, referral, Commission, Partner, Referral},
        user, Actor, User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for converting a pending [`Referral`] once the referred
/// [`User`] subscribes, accruing a [`Commission`] to its [`Partner`].
#[derive(Clone, Copy, Debug)]
pub struct ConvertReferral {
    /// ID of the [`Referral`] to be converted.
    pub referral_id: referral::Id,

    /// Amount of the subscription the referred [`User`] has purchased.
    pub subscription_amount: Money,

    /// ID of the [`User`] converting the [`Referral`].
    pub initiator_id: user::Id,
}

/// Output of [`ConvertReferral`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// Converted [`Referral`].
    pub referral: Referral,

    /// Accrued [`Commission`].
    pub commission: Commission,
}

impl<Db> Command<ConvertReferral> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Referral, referral::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Referral>, referral::Id>>,
            Ok = Option<Referral>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Partner, affiliate::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Partner>, affiliate::Id>>,
            Ok = Option<Partner>,
            Err = Traced<database::Error>,
        > + Database<Update<Referral>, Err = Traced<database::Error>>
        + Database<Update<ledger::Entry>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: ConvertReferral,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ConvertReferral {
            referral_id,
            subscription_amount,
            initiator_id,
        } = cmd;

        let initiator = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(initiator_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(initiator_id))
            .map_err(tracerr::wrap!())?;

        if !access::can_perform(
            &Actor::from(&initiator),
            Action::ManageAffiliates,
            Resource::None,
        ) {
            return Err(tracerr::new!(E::Forbidden(initiator_id)));
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid double conversions.
        tx.execute(Lock(By::new(referral_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut referral = tx
            .execute(Select(By::<Option<Referral>, _>::new(referral_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ReferralNotExists(referral_id))
            .map_err(tracerr::wrap!())?;

        let now = DateTime::now();
        referral
            .convert(subscription_amount, now)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        tx.execute(Lock(By::<Partner, _>::new(referral.affiliate_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let partner = tx
            .execute(Select(By::<Option<Partner>, _>::new(
                referral.affiliate_id,
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::PartnerNotExists(referral.affiliate_id))
            .map_err(tracerr::wrap!())?;

        tx.execute(Update(referral.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let entry = Commission::accrue(
            partner.id,
            referral.id,
            subscription_amount,
            partner.commission_rate,
            now,
        );
        let commission = entry.commission().clone();
        tx.execute(Update(entry))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(Output {
            referral,
            commission,
        })
    }
}

/// Error of [`ConvertReferral`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Referral`] has been converted already.
    #[display("{_0}")]
    AlreadyConverted(referral::AlreadyConverted),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`User`] is not allowed to manage affiliates.
    #[display("`User(id: {_0})` is not allowed to manage affiliates")]
    #[from(ignore)]
    Forbidden(#[error(not(source))] user::Id),

    /// [`Partner`] of the [`Referral`] does not exist.
    #[display("`Partner(id: {_0})` does not exist")]
    #[from(ignore)]
    PartnerNotExists(#[error(not(source))] affiliate::Id),

    /// [`Referral`] with the provided ID does not exist.
    #[display("`Referral(id: {_0})` does not exist")]
    #[from(ignore)]
    ReferralNotExists(#[error(not(source))] referral::Id),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}
