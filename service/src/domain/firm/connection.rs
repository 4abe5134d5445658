//! [`Connection`] between an adjuster and a [`Firm`].

use common::{unit, DateTime, DateTimeOf};
use derive_more::{AsRef, Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::Firm;
use crate::domain::{firm, user, Decision};

/// Approval gate between an adjuster and a [`Firm`], required before the
/// [`Firm`]'s administrator may assign claims to the adjuster.
///
/// At most one [`Connection`] exists per adjuster and [`Firm`] pair.
#[derive(Clone, Debug)]
pub struct Connection {
    /// ID of this [`Connection`].
    pub id: Id,

    /// ID of the adjuster requesting this [`Connection`].
    pub adjuster_id: user::Id,

    /// ID of the [`Firm`] this [`Connection`] is requested to.
    pub firm_id: firm::Id,

    /// [`Status`] of this [`Connection`].
    pub status: Status,

    /// [`Message`] attached to the request.
    pub message: Option<Message>,

    /// [`DateTime`] when this [`Connection`] was requested.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Connection`] was approved.
    pub connected_at: Option<ConnectionDateTime>,
}

impl Connection {
    /// Indicates whether this [`Connection`] has been approved.
    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.status == Status::Approved
    }

    /// Applies the review [`Decision`] to this [`Connection`].
    ///
    /// # Errors
    ///
    /// If this [`Connection`] has been reviewed already.
    pub fn review(
        &mut self,
        decision: Decision,
        at: DateTime,
    ) -> Result<(), AlreadyReviewed> {
        if self.status != Status::Pending {
            return Err(AlreadyReviewed(self.status));
        }
        match decision {
            Decision::Approve => {
                self.status = Status::Approved;
                self.connected_at = Some(at.coerce());
            }
            Decision::Reject => self.status = Status::Rejected,
        }
        Ok(())
    }
}

/// Error of reviewing a non-pending [`Connection`].
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("`Connection` is already {_0}")]
pub struct AlreadyReviewed(#[error(not(source))] pub Status);

/// ID of a [`Connection`].
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
    #[doc = "Status of a [`Connection`]."]
    enum Status {
        #[doc = "Awaiting a review."]
        Pending,

        #[doc = "Approved by the firm."]
        Approved,

        #[doc = "Rejected by the firm."]
        Rejected,
    }
}

/// Message an adjuster attaches to a [`Connection`] request.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq, Serialize)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Message(String);

impl Message {
    /// Creates a new [`Message`] if the given `text` is valid.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        (!text.trim().is_empty() && text.len() <= 2048).then_some(Self(text))
    }
}

impl FromStr for Message {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Message`")
    }
}

/// [`DateTime`] when a [`Connection`] was requested.
pub type CreationDateTime = DateTimeOf<(Connection, unit::Creation)>;

/// [`DateTime`] when a [`Connection`] was approved.
pub type ConnectionDateTime = DateTimeOf<(Connection, unit::Approval)>;

#[cfg(test)]
mod spec {
    use common::DateTime;

    use crate::domain::{firm, user, Decision};

    use super::{Connection, Id, Status};

    fn pending() -> Connection {
        Connection {
            id: Id::new(),
            adjuster_id: user::Id::new(),
            firm_id: firm::Id::new(),
            status: Status::Pending,
            message: None,
            created_at: DateTime::now().coerce(),
            connected_at: None,
        }
    }

    #[test]
    fn approves_pending() {
        let mut conn = pending();
        conn.review(Decision::Approve, DateTime::now()).unwrap();

        assert!(conn.is_approved());
        assert!(conn.connected_at.is_some());
    }

    #[test]
    fn rejects_pending() {
        let mut conn = pending();
        conn.review(Decision::Reject, DateTime::now()).unwrap();

        assert_eq!(conn.status, Status::Rejected);
        assert!(conn.connected_at.is_none());
    }

    #[test]
    fn reviews_only_once() {
        let mut conn = pending();
        conn.review(Decision::Reject, DateTime::now()).unwrap();

        let err = conn.review(Decision::Approve, DateTime::now()).unwrap_err();
        assert_eq!(err.0, Status::Rejected);
        assert_eq!(conn.status, Status::Rejected);
    }
}
