//! [`Database`]-related implementations.

#[cfg(any(test, feature = "memory"))]
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use derive_more::{Display, Error as StdError, From};

#[cfg(any(test, feature = "memory"))]
pub use self::memory::Memory;
#[cfg(feature = "postgres")]
pub use self::postgres::Postgres;

/// Database operation.
pub use common::Handler as Database;

/// Names of the unique constraints a [`Database`] enforces.
pub mod constraint {
    /// Single [`User`] per email.
    ///
    /// [`User`]: crate::domain::User
    pub const USER_EMAIL: &str = "users_email_key";

    /// Single [`Connection`] per adjuster and firm.
    ///
    /// [`Connection`]: crate::domain::firm::Connection
    pub const FIRM_CONNECTION: &str = "firm_connections_pair_key";

    /// Single [`Partner`] per code.
    ///
    /// [`Partner`]: crate::domain::affiliate::Partner
    pub const AFFILIATE_CODE: &str = "affiliate_partners_code_key";

    /// Single [`Referral`] per partner and referred user.
    ///
    /// [`Referral`]: crate::domain::affiliate::Referral
    pub const REFERRAL: &str = "referrals_pair_key";
}

/// [`Database`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    #[cfg(any(test, feature = "memory"))]
    /// [`Memory`] error.
    Memory(memory::Error),

    #[cfg(feature = "postgres")]
    /// [`Postgres`] error.
    Postgres(postgres::Error),
}

impl Error {
    /// Checks if the error is a unique violation of the specified constraint
    /// (any one, if [`None`]).
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            #[cfg(any(test, feature = "memory"))]
            Self::Memory(e) => e.is_unique_violation(constraint),
            #[cfg(feature = "postgres")]
            Self::Postgres(e) => e.is_unique_violation(constraint),
        }
    }
}
