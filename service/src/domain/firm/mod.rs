//! [`Firm`] definitions.

pub mod connection;

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use self::connection::Connection;

/// Organization posting claims to be handled by adjusters.
#[derive(Clone, Debug)]
pub struct Firm {
    /// ID of this [`Firm`].
    pub id: Id,

    /// [`Name`] of this [`Firm`].
    pub name: Name,

    /// [`DateTime`] when this [`Firm`] was created.
    pub created_at: CreationDateTime,
}

/// ID of a [`Firm`].
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

/// Name of a [`Firm`].
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

/// [`DateTime`] when a [`Firm`] was created.
pub type CreationDateTime = DateTimeOf<(Firm, unit::Creation)>;
