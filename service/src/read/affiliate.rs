//! Affiliate [`Partner`] read model definition.

use crate::domain::affiliate::{Commission, Partner};

/// [`Partner`] along with all of its [`Commission`]s, newest first.
#[derive(Clone, Debug)]
pub struct Details {
    /// [`Partner`] itself.
    pub partner: Partner,

    /// [`Commission`]s of the [`Partner`].
    pub commissions: Vec<Commission>,
}
