//! [`Command`] for creating a new affiliate [`Partner`].

use common::{
    operations::{By, Insert, Select},
    DateTime, Money, Rate,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        access::{self, Action, Resource},
        affiliate::{self, Partner},
        user, Actor, User,
    },
    infra::{
        database::{self, constraint},
        Database,
    },
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`affiliate::Status::Active`] [`Partner`].
#[derive(Clone, Debug)]
pub struct CreateAffiliate {
    /// [`affiliate::Name`] of the new [`Partner`].
    pub name: affiliate::Name,

    /// Referral [`affiliate::Code`] of the new [`Partner`].
    pub code: affiliate::Code,

    /// [`Rate`] of commissions the new [`Partner`] earns.
    pub commission_rate: Rate,

    /// ID of the [`User`] creating the [`Partner`].
    pub initiator_id: user::Id,
}

impl<Db> Command<CreateAffiliate> for Service<Db>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + for<'c> Database<
            Select<By<Option<Partner>, &'c affiliate::Code>>,
            Ok = Option<Partner>,
            Err = Traced<database::Error>,
        > + Database<Insert<Partner>, Err = Traced<database::Error>>,
{
    type Ok = Partner;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateAffiliate,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateAffiliate {
            name,
            code,
            commission_rate,
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

        let existing = self
            .database()
            .execute(Select(By::<Option<Partner>, _>::new(&code)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if existing.is_some() {
            return Err(tracerr::new!(E::CodeOccupied(code)));
        }

        let partner = Partner {
            id: affiliate::Id::new(),
            code,
            name,
            commission_rate,
            status: affiliate::Status::Active,
            total_referrals: 0,
            total_earnings: Money::ZERO,
            created_at: DateTime::now().coerce(),
        };

        self.database()
            .execute(Insert(partner.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map_err(|e| {
                if matches!(
                    e.as_ref(),
                    E::Db(db) if db.is_unique_violation(
                        Some(constraint::AFFILIATE_CODE),
                    ),
                ) {
                    tracerr::new!(E::CodeOccupied(partner.code.clone()))
                } else {
                    e
                }
            })
            .map(drop)?;

        Ok(partner)
    }
}

/// Error of [`CreateAffiliate`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`affiliate::Code`] is used by another [`Partner`] already.
    #[display("`{_0}` affiliate code is occupied")]
    CodeOccupied(#[error(not(source))] affiliate::Code),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`User`] is not allowed to manage affiliates.
    #[display("`User(id: {_0})` is not allowed to manage affiliates")]
    Forbidden(#[error(not(source))] user::Id),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}
