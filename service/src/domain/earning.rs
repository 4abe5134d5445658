//! [`Earning`] definitions.

use common::{unit, DateTime, DateTimeOf, Money};
use derive_more::{AsRef, Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{claim, user};

/// Monetary record owed to a user for the work performed.
///
/// `paid_at` is set if and only if `status` is [`Status::Paid`], which is a
/// terminal [`Status`].
#[derive(Clone, Debug)]
pub struct Earning {
    /// ID of this [`Earning`].
    pub id: Id,

    /// ID of the user this [`Earning`] is owed to.
    pub user_id: user::Id,

    /// ID of the claim this [`Earning`] is for, if any.
    pub claim_id: Option<claim::Id>,

    /// Positive amount of this [`Earning`].
    pub amount: Money,

    /// [`Kind`] of this [`Earning`].
    pub kind: Kind,

    /// [`Status`] of this [`Earning`].
    pub status: Status,

    /// [`Description`] of this [`Earning`].
    pub description: Option<Description>,

    /// [`DateTime`] when this [`Earning`] was earned.
    pub earned_at: EarningDateTime,

    /// [`DateTime`] when this [`Earning`] was paid.
    pub paid_at: Option<PaymentDateTime>,

    /// [`DateTime`] when this [`Earning`] was created.
    pub created_at: CreationDateTime,
}

impl Earning {
    /// Indicates whether this [`Earning`] has been paid already.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.status == Status::Paid
    }

    /// Changes [`Status`] of this [`Earning`] at the given [`DateTime`].
    ///
    /// # Errors
    ///
    /// With [`AlreadyPaid`] if this [`Earning`] is paid and the new [`Status`]
    /// is not [`Status::Paid`].
    pub fn set_status(
        &mut self,
        status: Status,
        at: DateTime,
    ) -> Result<(), AlreadyPaid> {
        match (self.status, status) {
            (Status::Paid, Status::Paid) => {}
            (Status::Paid, Status::Pending | Status::Disputed) => {
                return Err(AlreadyPaid(self.id));
            }
            (Status::Pending | Status::Disputed, Status::Paid) => {
                self.paid_at = Some(at.coerce());
            }
            (
                Status::Pending | Status::Disputed,
                Status::Pending | Status::Disputed,
            ) => self.paid_at = None,
        }
        self.status = status;
        Ok(())
    }
}

/// Error of changing a paid [`Earning`].
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("`Earning(id: {_0})` is paid already")]
pub struct AlreadyPaid(#[error(not(source))] pub Id);

/// ID of an [`Earning`].
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
    #[doc = "Status of an [`Earning`]."]
    enum Status {
        #[doc = "Awaiting payment."]
        Pending,

        #[doc = "Paid out."]
        Paid,

        #[doc = "Disputed by one of the sides."]
        Disputed,
    }
}

/// Free-form kind of an [`Earning`] (`CLAIM_FEE`, `BONUS`, etc).
#[derive(
    AsRef, Clone, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Kind(String);

impl Kind {
    /// [`Kind`] of [`Earning`]s created on a claim assignment.
    pub const CLAIM_FEE: &'static str = "CLAIM_FEE";

    /// Creates a new [`Kind`] if the given `kind` is valid.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Option<Self> {
        let kind = kind.into();
        (kind.trim() == kind && !kind.is_empty() && kind.len() <= 64)
            .then_some(Self(kind))
    }

    /// Returns the [`Kind`] of [`Earning`]s created on a claim assignment.
    #[must_use]
    pub fn claim_fee() -> Self {
        Self(Self::CLAIM_FEE.to_owned())
    }
}

impl FromStr for Kind {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Kind`")
    }
}

/// Description of an [`Earning`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq, Serialize)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Description(String);

impl Description {
    /// Creates a new [`Description`] if the given `text` is valid.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        (!text.trim().is_empty() && text.len() <= 2048).then_some(Self(text))
    }
}

impl FromStr for Description {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Description`")
    }
}

/// [`DateTime`] when an [`Earning`] was created.
pub type CreationDateTime = DateTimeOf<(Earning, unit::Creation)>;

/// [`DateTime`] when an [`Earning`] was earned.
pub type EarningDateTime = DateTimeOf<(Earning, unit::Accrual)>;

/// [`DateTime`] when an [`Earning`] was paid.
pub type PaymentDateTime = DateTimeOf<(Earning, unit::Payment)>;

#[cfg(test)]
mod spec {
    use common::{DateTime, Money};

    use crate::domain::user;

    use super::{Earning, Id, Kind, Status};

    fn earning(status: Status) -> Earning {
        let now = DateTime::now();
        Earning {
            id: Id::new(),
            user_id: user::Id::new(),
            claim_id: None,
            amount: "120.50".parse::<Money>().unwrap(),
            kind: Kind::claim_fee(),
            status,
            description: None,
            earned_at: now.coerce(),
            paid_at: (status == Status::Paid).then(|| now.coerce()),
            created_at: now.coerce(),
        }
    }

    #[test]
    fn pays_pending() {
        let mut e = earning(Status::Pending);
        e.set_status(Status::Paid, DateTime::now()).unwrap();

        assert!(e.is_paid());
        assert!(e.paid_at.is_some());
    }

    #[test]
    fn keeps_paid_date_on_repeated_payment() {
        let mut e = earning(Status::Paid);
        let paid_at = e.paid_at;

        e.set_status(Status::Paid, DateTime::now()).unwrap();

        assert_eq!(e.paid_at, paid_at);
    }

    #[test]
    fn never_leaves_paid() {
        for status in [Status::Pending, Status::Disputed] {
            let mut e = earning(Status::Paid);
            assert!(e.set_status(status, DateTime::now()).is_err());
            assert!(e.is_paid());
            assert!(e.paid_at.is_some());
        }
    }

    #[test]
    fn disputes_pending() {
        let mut e = earning(Status::Pending);
        e.set_status(Status::Disputed, DateTime::now()).unwrap();

        assert_eq!(e.status, Status::Disputed);
        assert!(e.paid_at.is_none());
    }
}
