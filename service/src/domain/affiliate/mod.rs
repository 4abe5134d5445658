//! Affiliate [`Partner`] definitions.

pub mod commission;
pub mod ledger;
pub mod referral;

use std::sync::LazyLock;

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf, Money, Rate};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use self::{commission::Commission, referral::Referral};

/// Partner referring new users to the platform in exchange for commissions.
#[derive(Clone, Debug)]
pub struct Partner {
    /// ID of this [`Partner`].
    pub id: Id,

    /// Referral [`Code`] of this [`Partner`].
    pub code: Code,

    /// [`Name`] of this [`Partner`].
    pub name: Name,

    /// [`Rate`] of commissions this [`Partner`] earns on conversions.
    pub commission_rate: Rate,

    /// [`Status`] of this [`Partner`].
    pub status: Status,

    /// Number of [`Referral`]s tracked for this [`Partner`].
    pub total_referrals: u32,

    /// Running total of [`Commission`]s earned by this [`Partner`].
    ///
    /// Only changed along with a [`Commission`] through a [`ledger::Entry`].
    pub total_earnings: Money,

    /// [`DateTime`] when this [`Partner`] was created.
    pub created_at: CreationDateTime,
}

impl Partner {
    /// Indicates whether this [`Partner`] accepts new [`Referral`]s.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }
}

/// ID of a [`Partner`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Referral code of a [`Partner`].
///
/// Upper-case alphanumeric, so lower-case input is normalized.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq, Serialize)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Code(String);

impl Code {
    /// Creates a new [`Code`] if the given `code` is valid.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Option<Self> {
        let code = code.into().to_uppercase();
        Self::check(&code).then_some(Self(code))
    }

    /// Checks whether the given `code` is a valid [`Code`].
    fn check(code: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Code`] format.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^[A-Z0-9]{3,32}$").expect("valid regex")
        });

        REGEX.is_match(code.as_ref())
    }
}

impl FromStr for Code {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Code`")
    }
}

/// Name of a [`Partner`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq, Serialize)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Name(String);

impl Name {
    /// Creates a new [`Name`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        (name.trim() == name && !name.is_empty() && name.len() <= 256)
            .then_some(Self(name))
    }
}

impl FromStr for Name {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Name`")
    }
}

common::define_kind! {
    #[doc = "Status of a [`Partner`]."]
    enum Status {
        #[doc = "Awaiting activation."]
        Pending,

        #[doc = "Accepting referrals."]
        Active,

        #[doc = "Not accepting referrals anymore."]
        Suspended,
    }
}

/// [`DateTime`] when a [`Partner`] was created.
pub type CreationDateTime = DateTimeOf<(Partner, unit::Creation)>;

#[cfg(test)]
mod spec {
    use super::Code;

    #[test]
    fn normalizes_code() {
        assert_eq!(Code::new("summer24").unwrap().to_string(), "SUMMER24");
        assert!(Code::new("AB").is_none());
        assert!(Code::new("SUMMER-24").is_none());
        assert!(Code::new(" SUMMER24").is_none());
    }
}
