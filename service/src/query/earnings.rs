//! [`Query`] collection related to the [`Earning`]s of a user.

use common::operations::{By, Select};
use tracerr::Traced;

use crate::{
    domain::{user, Earning},
    infra::{database, Database},
    read::earning::{Filter, Summary as EarningsSummary},
    Query, Service,
};

use super::DatabaseQuery;

/// Queries [`Earning`]s of a user, most recently earned first.
pub type List = DatabaseQuery<By<Vec<Earning>, Filter>>;

/// Queries [`EarningsSummary`] of a user's [`Earning`]s.
#[derive(Clone, Copy, Debug)]
pub struct Summary {
    /// ID of the user owning the [`Earning`]s.
    pub user_id: user::Id,
}

impl<Db> Query<Summary> for Service<Db>
where
    Db: Database<
        Select<By<Vec<Earning>, Filter>>,
        Ok = Vec<Earning>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = EarningsSummary;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Summary { user_id }: Summary,
    ) -> Result<Self::Ok, Self::Err> {
        let earnings = self
            .database()
            .execute(Select(By::<Vec<Earning>, _>::new(Filter {
                user_id,
                status: None,
            })))
            .await
            .map_err(tracerr::wrap!())?;

        Ok(EarningsSummary::compute(&earnings))
    }
}
