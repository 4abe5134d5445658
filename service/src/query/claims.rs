//! [`Query`] collection related to the multiple [`Claim`]s.

use std::collections::HashMap;

use common::{
    operations::{By, Select},
    pagination,
};
use tracerr::Traced;

use crate::{
    domain::{claim, Actor, Claim},
    infra::{database, Database},
    read::claim::list,
    Query, Service,
};

/// Queries a [`Page`] of [`Claim`]s visible to the viewer, newest first.
///
/// [`Page`]: pagination::Page
#[derive(Clone, Debug)]
pub struct List {
    /// Pagination [`list::Arguments`].
    pub arguments: list::Arguments,

    /// [`list::Filter`] to apply.
    ///
    /// Its [`list::Filter::visibility`] is always replaced with the viewer's
    /// one.
    pub filter: list::Filter,

    /// [`Actor`] viewing the [`Claim`]s.
    pub viewer: Actor,
}

impl<Db> Query<List> for Service<Db>
where
    Db: Database<
            Select<By<list::Page, list::Selector>>,
            Ok = list::Page,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<HashMap<claim::Id, Claim>, Vec<claim::Id>>>,
            Ok = HashMap<claim::Id, Claim>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = pagination::Page<list::Cursor, Claim>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        List {
            arguments,
            mut filter,
            viewer,
        }: List,
    ) -> Result<Self::Ok, Self::Err> {
        filter.visibility = viewer.claim_visibility();

        let page = self
            .database()
            .execute(Select(By::<list::Page, _>::new(list::Selector {
                arguments,
                filter,
            })))
            .await
            .map_err(tracerr::wrap!())?;

        let ids = page.edges.iter().map(|e| e.node).collect::<Vec<_>>();
        let mut claims = self
            .database()
            .execute(Select(By::<HashMap<_, Claim>, _>::new(ids)))
            .await
            .map_err(tracerr::wrap!())?;

        // Claims deleted in between are skipped.
        Ok(page.filter_map(|id| claims.remove(&id)))
    }
}
