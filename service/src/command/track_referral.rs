//! [`Command`] for tracking a [`Referral`].

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        affiliate::{self, referral, Partner, Referral},
        user, User,
    },
    infra::{
        database::{self, constraint},
        Database,
    },
    Service,
};

use super::Command;

/// [`Command`] for attributing a signed up [`User`] to an active affiliate
/// [`Partner`].
#[derive(Clone, Debug)]
pub struct TrackReferral {
    /// [`affiliate::Code`] the [`User`] has signed up with.
    pub code: affiliate::Code,

    /// ID of the referred [`User`].
    pub referred_user_id: user::Id,
}

impl<Db> Command<TrackReferral> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + for<'c> Database<
            Select<By<Option<Partner>, &'c affiliate::Code>>,
            Ok = Option<Partner>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Referral>, (affiliate::Id, user::Id)>>,
            Ok = Option<Referral>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Partner, affiliate::Id>>,
            Err = Traced<database::Error>,
        > + Database<Insert<Referral>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Referral;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: TrackReferral,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let TrackReferral {
            code,
            referred_user_id,
        } = cmd;

        let partner = self
            .database()
            .execute(Select(By::<Option<Partner>, _>::new(&code)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(Partner::is_active)
            .ok_or_else(|| E::InvalidCode(code.clone()))
            .map_err(tracerr::wrap!())?;

        self.database()
            .execute(Select(By::<Option<User>, _>::new(referred_user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(referred_user_id))
            .map_err(tracerr::wrap!())
            .map(drop)?;

        let existing = self
            .database()
            .execute(Select(By::<Option<Referral>, _>::new((
                partner.id,
                referred_user_id,
            ))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if existing.is_some() {
            return Err(tracerr::new!(E::AlreadyTracked(referred_user_id)));
        }

        let referral = Referral {
            id: referral::Id::new(),
            affiliate_id: partner.id,
            referred_user_id,
            status: referral::Status::Pending,
            subscription_amount: None,
            converted_at: None,
            created_at: DateTime::now().coerce(),
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // `Partner::total_referrals` is incremented along.
        tx.execute(Lock(By::new(partner.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Insert(referral.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map_err(|e| {
                if matches!(
                    e.as_ref(),
                    E::Db(db) if db.is_unique_violation(
                        Some(constraint::REFERRAL),
                    ),
                ) {
                    tracerr::new!(E::AlreadyTracked(referred_user_id))
                } else {
                    e
                }
            })
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(referral)
    }
}

/// Error of [`TrackReferral`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`User`] has been referred by the [`Partner`] already.
    #[display("Referral of `User(id: {_0})` is tracked already")]
    AlreadyTracked(#[error(not(source))] user::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// No active [`Partner`] owns the [`affiliate::Code`].
    #[display("Invalid or inactive affiliate code `{_0}`")]
    InvalidCode(#[error(not(source))] affiliate::Code),

    /// Referred [`User`] does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}
