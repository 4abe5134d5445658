//! [`Notification`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::user;

/// Message informing a user about something happened on the platform.
///
/// Never changed once created, except being marked as read.
#[derive(Clone, Debug)]
pub struct Notification {
    /// ID of this [`Notification`].
    pub id: Id,

    /// ID of the user this [`Notification`] is addressed to.
    pub user_id: user::Id,

    /// [`Title`] of this [`Notification`].
    pub title: Title,

    /// [`Content`] of this [`Notification`].
    pub content: Content,

    /// [`Kind`] of this [`Notification`].
    pub kind: Kind,

    /// Indicator whether this [`Notification`] has been read.
    pub is_read: bool,

    /// [`DateTime`] when this [`Notification`] was created.
    pub created_at: CreationDateTime,
}

/// ID of a [`Notification`].
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

common::define_kind! {
    #[doc = "Kind of a [`Notification`]."]
    enum Kind {
        #[doc = "Claim has been assigned to the user."]
        ClaimAssigned,

        #[doc = "Claim has been taken from the user."]
        ClaimUnassigned,

        #[doc = "Status of a claim assigned to the user has changed."]
        ClaimStatusChanged,

        #[doc = "New earning has been recorded for the user."]
        EarningCreated,

        #[doc = "Firm connection of the user has been reviewed."]
        FirmConnection,
    }
}

/// Title of a [`Notification`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq, Serialize)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Title(String);

impl Title {
    /// Creates a new [`Title`] if the given `title` is valid.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Option<Self> {
        let title = title.into();
        (!title.trim().is_empty() && title.len() <= 256).then_some(Self(title))
    }
}

impl FromStr for Title {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Title`")
    }
}

/// Content of a [`Notification`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq, Serialize)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Content(String);

impl Content {
    /// Creates a new [`Content`] if the given `text` is valid.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        (!text.trim().is_empty() && text.len() <= 4096).then_some(Self(text))
    }
}

impl FromStr for Content {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Content`")
    }
}

/// [`DateTime`] when a [`Notification`] was created.
pub type CreationDateTime = DateTimeOf<(Notification, unit::Creation)>;
