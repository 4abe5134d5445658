//! [`Referral`] definitions.

use common::{unit, DateTime, DateTimeOf, Money};
use derive_more::{Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::affiliate::Partner;
use crate::domain::{affiliate, user};

/// User signup attributed to a [`Partner`].
///
/// Unique per [`Partner`] and referred user pair.
#[derive(Clone, Debug)]
pub struct Referral {
    /// ID of this [`Referral`].
    pub id: Id,

    /// ID of the [`Partner`] this [`Referral`] is attributed to.
    pub affiliate_id: affiliate::Id,

    /// ID of the referred user.
    pub referred_user_id: user::Id,

    /// [`Status`] of this [`Referral`].
    pub status: Status,

    /// Amount of the subscription the referred user has purchased.
    pub subscription_amount: Option<Money>,

    /// [`DateTime`] when this [`Referral`] was converted.
    pub converted_at: Option<ConversionDateTime>,

    /// [`DateTime`] when this [`Referral`] was tracked.
    pub created_at: CreationDateTime,
}

impl Referral {
    /// Converts this [`Referral`] with the provided `subscription_amount` at
    /// the given [`DateTime`].
    ///
    /// # Errors
    ///
    /// If this [`Referral`] has been converted already.
    pub fn convert(
        &mut self,
        subscription_amount: Money,
        at: DateTime,
    ) -> Result<(), AlreadyConverted> {
        if self.status != Status::Pending {
            return Err(AlreadyConverted(self.id));
        }
        self.status = Status::Converted;
        self.subscription_amount = Some(subscription_amount);
        self.converted_at = Some(at.coerce());
        Ok(())
    }
}

/// Error of converting a non-pending [`Referral`].
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("`Referral(id: {_0})` is converted already")]
pub struct AlreadyConverted(#[error(not(source))] pub Id);

/// ID of a [`Referral`].
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
    #[doc = "Status of a [`Referral`]."]
    enum Status {
        #[doc = "Referred user has not subscribed yet."]
        Pending,

        #[doc = "Referred user has subscribed."]
        Converted,
    }
}

/// [`DateTime`] when a [`Referral`] was tracked.
pub type CreationDateTime = DateTimeOf<(Referral, unit::Creation)>;

/// [`DateTime`] when a [`Referral`] was converted.
pub type ConversionDateTime = DateTimeOf<(Referral, unit::Conversion)>;
