//! [`Query`] collection related to a single affiliate [`Partner`].

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        access::{self, Action, Resource},
        affiliate::{self, Commission, Partner},
        Actor,
    },
    infra::{database, Database},
    read::affiliate::Details,
    Query, Service,
};

/// Queries [`Details`] of a [`Partner`] by its [`affiliate::Id`].
#[derive(Clone, Copy, Debug)]
pub struct ById {
    /// ID of the [`Partner`] to query.
    pub affiliate_id: affiliate::Id,

    /// [`Actor`] viewing the [`Partner`].
    pub viewer: Actor,
}

impl<Db> Query<ById> for Service<Db>
where
    Db: Database<
            Select<By<Option<Partner>, affiliate::Id>>,
            Ok = Option<Partner>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Commission>, affiliate::Id>>,
            Ok = Vec<Commission>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Option<Details>;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        ById {
            affiliate_id,
            viewer,
        }: ById,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        if !access::can_perform(
            &viewer,
            Action::ManageAffiliates,
            Resource::None,
        ) {
            return Err(tracerr::new!(E::Forbidden));
        }

        let Some(partner) = self
            .database()
            .execute(Select(By::<Option<Partner>, _>::new(affiliate_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
        else {
            return Ok(None);
        };

        let commissions = self
            .database()
            .execute(Select(By::<Vec<Commission>, _>::new(affiliate_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(Some(Details {
            partner,
            commissions,
        }))
    }
}

/// Error of [`ById`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Viewer is not allowed to see affiliates.
    #[display("Not allowed to view affiliates")]
    Forbidden,
}
