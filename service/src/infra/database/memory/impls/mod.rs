//! [`Database`] implementations.

mod affiliate;
mod claim;
mod earning;
mod firm;
mod notification;
mod user;

use common::operations::{Commit, Transact};
use tracerr::Traced;

use crate::infra::{database, Database};

use super::{Memory, NonTx, Tx};

impl Database<Transact> for Memory<NonTx> {
    type Ok = Memory<Tx>;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(Memory(self.0.begin().await))
    }
}

impl Database<Transact> for Memory<Tx> {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        self.commit().await.map_err(tracerr::wrap!())
    }
}
