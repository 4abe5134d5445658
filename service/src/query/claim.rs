//! [`Query`] collection related to a single [`Claim`].

use std::collections::HashMap;

use common::operations::{By, Select};
use tracerr::Traced;

use crate::{
    domain::{
        access::{self, Action, Resource},
        claim, Actor, Claim,
    },
    infra::{database, Database},
    Query, Service,
};

use super::DatabaseQuery;

/// Queries multiple [`Claim`]s by their [`claim::Id`]s, regardless of their
/// visibility.
pub type ByIds = DatabaseQuery<By<HashMap<claim::Id, Claim>, Vec<claim::Id>>>;

/// Queries a [`Claim`] by its [`claim::Id`], if it's visible to the viewer.
#[derive(Clone, Copy, Debug)]
pub struct ById {
    /// ID of the [`Claim`] to query.
    pub claim_id: claim::Id,

    /// [`Actor`] viewing the [`Claim`].
    pub viewer: Actor,
}

impl<Db> Query<ById> for Service<Db>
where
    Db: Database<
        Select<By<Option<Claim>, claim::Id>>,
        Ok = Option<Claim>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Claim>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        ById { claim_id, viewer }: ById,
    ) -> Result<Self::Ok, Self::Err> {
        let claim = self
            .database()
            .execute(Select(By::<Option<Claim>, _>::new(claim_id)))
            .await
            .map_err(tracerr::wrap!())?;

        Ok(claim.filter(|c| {
            access::can_perform(&viewer, Action::ViewClaim, Resource::Claim(c))
        }))
    }
}
