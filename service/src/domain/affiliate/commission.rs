//! [`Commission`] definitions.

use common::{unit, DateTime, DateTimeOf, Money, Rate};
use derive_more::{AsRef, Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::affiliate::{Partner, Referral};
use crate::domain::{
    affiliate::{
        self,
        ledger::{Adjustment, Entry},
        referral,
    },
    Decision,
};

/// Payout owed to a [`Partner`] for a converted [`Referral`].
///
/// [`Status::Paid`] is terminal.
#[derive(Clone, Debug)]
pub struct Commission {
    /// ID of this [`Commission`].
    pub id: Id,

    /// ID of the [`Partner`] this [`Commission`] is owed to.
    pub affiliate_id: affiliate::Id,

    /// ID of the [`Referral`] this [`Commission`] is for.
    pub referral_id: referral::Id,

    /// Amount of this [`Commission`].
    pub amount: Money,

    /// [`Rate`] of the [`Partner`] at the moment of conversion.
    pub rate: Rate,

    /// [`Status`] of this [`Commission`].
    pub status: Status,

    /// [`DateTime`] when this [`Commission`] was paid.
    pub paid_at: Option<PaymentDateTime>,

    /// [`PaymentMethod`] this [`Commission`] was paid with.
    pub payment_method: Option<PaymentMethod>,

    /// [`PaymentReference`] of this [`Commission`]'s payout.
    pub payment_reference: Option<PaymentReference>,

    /// [`DateTime`] when this [`Commission`] was created.
    pub created_at: CreationDateTime,
}

impl Commission {
    /// Creates a new [`Status::Pending`] [`Commission`] for the converted
    /// [`Referral`], crediting its amount to the [`Partner`].
    #[must_use]
    pub fn accrue(
        affiliate_id: affiliate::Id,
        referral_id: referral::Id,
        subscription_amount: Money,
        rate: Rate,
        at: DateTime,
    ) -> Entry {
        let amount = rate.apply(subscription_amount);
        Entry::new(
            Self {
                id: Id::new(),
                affiliate_id,
                referral_id,
                amount,
                rate,
                status: Status::Pending,
                paid_at: None,
                payment_method: None,
                payment_reference: None,
                created_at: at.coerce(),
            },
            Adjustment::Credit(amount),
        )
    }

    /// Approves or rejects this [`Status::Pending`] [`Commission`].
    ///
    /// # Errors
    ///
    /// If this [`Commission`] is not [`Status::Pending`].
    pub fn process(self, decision: Decision) -> Result<Entry, TransitionError> {
        if self.status != Status::Pending {
            return Err(TransitionError::NotPending(self.id));
        }
        let status = match decision {
            Decision::Approve => Status::Approved,
            Decision::Reject => Status::Cancelled,
        };
        Ok(Entry::new(Self { status, ..self }, Adjustment::None))
    }

    /// Marks this [`Status::Pending`] [`Commission`] as paid.
    ///
    /// # Errors
    ///
    /// If this [`Commission`] is not [`Status::Pending`].
    pub fn pay(
        self,
        method: PaymentMethod,
        reference: Option<PaymentReference>,
        at: DateTime,
    ) -> Result<Entry, TransitionError> {
        if self.status != Status::Pending {
            return Err(TransitionError::NotPending(self.id));
        }
        Ok(Entry::new(
            Self {
                status: Status::Paid,
                paid_at: Some(at.coerce()),
                payment_method: Some(method),
                payment_reference: reference,
                ..self
            },
            Adjustment::None,
        ))
    }

    /// Cancels this [`Commission`], debiting its amount from the [`Partner`]
    /// if it has been [`Status::Approved`].
    ///
    /// # Errors
    ///
    /// If this [`Commission`] is [`Status::Paid`] or [`Status::Cancelled`]
    /// already.
    pub fn cancel(self) -> Result<Entry, TransitionError> {
        let adjustment = match self.status {
            Status::Approved => Adjustment::Debit(self.amount),
            Status::Pending => Adjustment::None,
            Status::Paid => return Err(TransitionError::Paid(self.id)),
            Status::Cancelled => {
                return Err(TransitionError::Cancelled(self.id))
            }
        };
        Ok(Entry::new(
            Self {
                status: Status::Cancelled,
                ..self
            },
            adjustment,
        ))
    }
}

/// Error of changing a [`Status`] of a [`Commission`].
#[derive(Clone, Copy, Debug, Display, Error, Eq, PartialEq)]
pub enum TransitionError {
    /// [`Commission`] has been processed already.
    #[display("`Commission(id: {_0})` is not pending")]
    NotPending(#[error(not(source))] Id),

    /// [`Commission`] has been paid already.
    #[display("`Commission(id: {_0})` is paid already")]
    Paid(#[error(not(source))] Id),

    /// [`Commission`] has been cancelled already.
    #[display("`Commission(id: {_0})` is cancelled already")]
    Cancelled(#[error(not(source))] Id),
}

/// ID of a [`Commission`].
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
    Ord,
    PartialEq,
    PartialOrd,
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
    #[doc = "Status of a [`Commission`]."]
    enum Status {
        #[doc = "Awaiting a review."]
        Pending,

        #[doc = "Approved for a payout."]
        Approved,

        #[doc = "Paid out."]
        Paid,

        #[doc = "Rejected or withdrawn."]
        Cancelled,
    }
}

common::define_kind! {
    #[doc = "Method a [`Commission`] is paid out with."]
    enum PaymentMethod {
        #[doc = "Bank transfer."]
        BankTransfer,

        #[doc = "PayPal transfer."]
        Paypal,

        #[doc = "Paper check."]
        Check,

        #[doc = "Wire transfer."]
        Wire,

        #[doc = "Any other method."]
        Other,
    }
}

/// Reference of a [`Commission`] payout in an external payment system.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq, Serialize)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct PaymentReference(String);

impl PaymentReference {
    /// Creates a new [`PaymentReference`] if the given `reference` is valid.
    #[must_use]
    pub fn new(reference: impl Into<String>) -> Option<Self> {
        let reference = reference.into();
        (reference.trim() == reference
            && !reference.is_empty()
            && reference.len() <= 256)
            .then_some(Self(reference))
    }
}

impl FromStr for PaymentReference {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `PaymentReference`")
    }
}

/// [`DateTime`] when a [`Commission`] was created.
pub type CreationDateTime = DateTimeOf<(Commission, unit::Creation)>;

/// [`DateTime`] when a [`Commission`] was paid.
pub type PaymentDateTime = DateTimeOf<(Commission, unit::Payment)>;

#[cfg(test)]
mod spec {
    use common::{DateTime, Money, Rate};

    use crate::domain::{
        affiliate::{self, ledger::Adjustment, referral},
        Decision,
    };

    use super::{Commission, PaymentMethod, Status, TransitionError};

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    fn pending() -> Commission {
        Commission::accrue(
            affiliate::Id::new(),
            referral::Id::new(),
            money("100"),
            "0.20".parse::<Rate>().unwrap(),
            DateTime::now(),
        )
        .into_parts()
        .0
    }

    #[test]
    fn accrues_rated_amount() {
        let (commission, adjustment) = Commission::accrue(
            affiliate::Id::new(),
            referral::Id::new(),
            money("100"),
            "0.20".parse::<Rate>().unwrap(),
            DateTime::now(),
        )
        .into_parts();

        assert_eq!(commission.amount, money("20"));
        assert_eq!(commission.status, Status::Pending);
        assert_eq!(adjustment, Adjustment::Credit(money("20")));
    }

    #[test]
    fn processes_pending() {
        let (approved, adj) =
            pending().process(Decision::Approve).unwrap().into_parts();
        assert_eq!(approved.status, Status::Approved);
        assert_eq!(adj, Adjustment::None);

        let (rejected, adj) =
            pending().process(Decision::Reject).unwrap().into_parts();
        assert_eq!(rejected.status, Status::Cancelled);
        assert_eq!(adj, Adjustment::None);

        assert!(matches!(
            approved.process(Decision::Reject),
            Err(TransitionError::NotPending(_)),
        ));
    }

    #[test]
    fn pays_only_pending() {
        let (paid, _) = pending()
            .pay(PaymentMethod::Wire, None, DateTime::now())
            .unwrap()
            .into_parts();
        assert_eq!(paid.status, Status::Paid);
        assert!(paid.paid_at.is_some());
        assert_eq!(paid.payment_method, Some(PaymentMethod::Wire));

        assert!(paid
            .pay(PaymentMethod::Check, None, DateTime::now())
            .is_err());
    }

    #[test]
    fn cancels_with_compensation() {
        let (approved, _) =
            pending().process(Decision::Approve).unwrap().into_parts();

        let (cancelled, adj) = approved.cancel().unwrap().into_parts();
        assert_eq!(cancelled.status, Status::Cancelled);
        assert_eq!(adj, Adjustment::Debit(money("20")));

        assert!(matches!(
            cancelled.cancel(),
            Err(TransitionError::Cancelled(_)),
        ));
    }

    #[test]
    fn cancels_pending_without_compensation() {
        let (_, adj) = pending().cancel().unwrap().into_parts();
        assert_eq!(adj, Adjustment::None);
    }

    #[test]
    fn never_cancels_paid() {
        let (paid, _) = pending()
            .pay(PaymentMethod::Paypal, None, DateTime::now())
            .unwrap()
            .into_parts();

        assert!(matches!(paid.cancel(), Err(TransitionError::Paid(_))));
    }
}
