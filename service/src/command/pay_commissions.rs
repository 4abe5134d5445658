//! [`Command`] for paying out [`Commission`]s.

use std::collections::HashMap;

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use itertools::Itertools as _;
use tracerr::Traced;

use crate::{
    domain::{
        access::{self, Action, Resource},
        affiliate::{commission, ledger, Commission},
        user, Actor, User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for paying out a batch of pending [`Commission`]s at once.
///
/// Either all the [`Commission`]s are paid, or none of them.
#[derive(Clone, Debug)]
pub struct PayCommissions {
    /// IDs of the [`Commission`]s to be paid.
    pub commission_ids: Vec<commission::Id>,

    /// [`commission::PaymentMethod`] of the payout.
    pub method: commission::PaymentMethod,

    /// [`commission::PaymentReference`] of the payout.
    pub reference: Option<commission::PaymentReference>,

    /// ID of the [`User`] paying the [`Commission`]s.
    pub initiator_id: user::Id,
}

impl<Db> Command<PayCommissions> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Commission, commission::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<HashMap<commission::Id, Commission>, Vec<commission::Id>>>,
            Ok = HashMap<commission::Id, Commission>,
            Err = Traced<database::Error>,
        > + Database<Update<ledger::Entry>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    /// Paid [`Commission`]s, ordered by their IDs.
    type Ok = Vec<Commission>;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: PayCommissions,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let PayCommissions {
            commission_ids,
            method,
            reference,
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

        // Sorted, so concurrent batches lock rows in the same order.
        let ids = commission_ids.into_iter().sorted().dedup().collect_vec();
        if ids.is_empty() {
            return Err(tracerr::new!(E::EmptyBatch));
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        for id in &ids {
            tx.execute(Lock(By::<Commission, _>::new(*id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }

        let mut found = tx
            .execute(Select(By::<HashMap<_, Commission>, _>::new(ids.clone())))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if !ids.iter().all(|id| {
            found
                .get(id)
                .is_some_and(|c| c.status == commission::Status::Pending)
        }) {
            return Err(tracerr::new!(E::NotPayable));
        }

        let now = DateTime::now();
        let mut paid = Vec::with_capacity(ids.len());
        for id in ids {
            let entry = found
                .remove(&id)
                .ok_or(E::NotPayable)
                .map_err(tracerr::wrap!())?
                .pay(method, reference.clone(), now)
                .map_err(|_| tracerr::new!(E::NotPayable))?;
            paid.push(entry.commission().clone());
            tx.execute(Update(entry))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(paid)
    }
}

/// Error of [`PayCommissions`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// No [`Commission`]s are provided.
    #[display("No commissions to pay")]
    EmptyBatch,

    /// [`User`] is not allowed to manage affiliates.
    #[display("`User(id: {_0})` is not allowed to manage affiliates")]
    Forbidden(#[error(not(source))] user::Id),

    /// Some of the [`Commission`]s are missing or not pending.
    #[display("Some commissions not found or already processed")]
    NotPayable,

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}
