//! [`Money`]-related definitions.

use std::{fmt, iter, ops, str::FromStr};

#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;

/// Non-negative amount of money with a cent precision.
///
/// The platform settles everything in a single currency, so only the amount
/// is stored.
#[derive(
    Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd,
)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Money(Decimal);

impl Money {
    /// Zero amount of [`Money`].
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Maximum number of fractional digits a [`Money`] amount may have.
    pub const SCALE: u32 = 2;

    /// Creates a new [`Money`] out of the provided `amount`.
    ///
    /// [`None`] is returned if the `amount` is negative or has more than
    /// [`Money::SCALE`] fractional digits.
    #[must_use]
    pub fn new(amount: Decimal) -> Option<Self> {
        let amount = amount.normalize();
        (amount >= Decimal::ZERO && amount.scale() <= Self::SCALE)
            .then_some(Self(amount))
    }

    /// Creates a new [`Money`] rounding the provided non-negative `amount` to
    /// cents (half away from zero).
    #[must_use]
    pub fn rounded(amount: Decimal) -> Option<Self> {
        Self::new(amount.round_dp_with_strategy(
            Self::SCALE,
            rust_decimal::RoundingStrategy::MidpointAwayFromZero,
        ))
    }

    /// Returns the amount of this [`Money`].
    #[must_use]
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Indicates whether this [`Money`] is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Adds the `other` [`Money`] to this one.
    ///
    /// [`None`] is returned on overflow.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Subtracts the `other` [`Money`] from this one.
    ///
    /// [`None`] is returned if the result would be negative.
    #[must_use]
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        (self.0 >= other.0).then(|| Self(self.0 - other.0))
    }

    /// Subtracts the `other` [`Money`] from this one, stopping at zero.
    #[must_use]
    pub fn saturating_sub(self, other: Self) -> Self {
        self.checked_sub(other).unwrap_or(Self::ZERO)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Money {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount = Decimal::from_str(s.trim()).map_err(|_| "invalid amount")?;
        Self::new(amount).ok_or("amount must be non-negative with cents at most")
    }
}

impl ops::Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, ops::Add::add)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

#[cfg(feature = "serde")]
mod serde {
    //! Module providing integration with [`serde`] crate.

    use rust_decimal::Decimal;
    use ::serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    use super::Money;

    /// [`Money`] is serialized as a decimal string with two fractional
    /// digits (`"123.40"`).
    impl Serialize for Money {
        fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
            s.collect_str(self)
        }
    }

    /// [`Money`] is deserialized from either a decimal string or a number.
    impl<'de> Deserialize<'de> for Money {
        fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
            let amount = <Decimal as Deserialize>::deserialize(d)?;
            Self::new(amount).ok_or_else(|| {
                de::Error::custom(
                    "amount must be non-negative with cents at most",
                )
            })
        }
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use rust_decimal::Decimal;

    use super::Money;

    fn decimal(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn from_str() {
        assert_eq!(
            Money::from_str("123.45").unwrap().amount(),
            decimal("123.45"),
        );
        assert_eq!(Money::from_str("500").unwrap().amount(), decimal("500"));
        assert_eq!(
            Money::from_str("12.500").unwrap().amount(),
            decimal("12.5"),
        );

        assert!(Money::from_str("-1").is_err());
        assert!(Money::from_str("1.005").is_err());
        assert!(Money::from_str("12USD").is_err());
        assert!(Money::from_str("").is_err());
    }

    #[test]
    fn to_string() {
        assert_eq!(Money::from_str("123.45").unwrap().to_string(), "123.45");
        assert_eq!(Money::from_str("123").unwrap().to_string(), "123.00");
        assert_eq!(Money::from_str("0.5").unwrap().to_string(), "0.50");
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }

    #[test]
    fn rounds_to_cents() {
        assert_eq!(
            Money::rounded(decimal("19.995")).unwrap().to_string(),
            "20.00",
        );
        assert_eq!(
            Money::rounded(decimal("0.004")).unwrap().to_string(),
            "0.00",
        );
        assert!(Money::rounded(decimal("-0.5")).is_none());
    }

    #[test]
    fn arithmetic() {
        let a = Money::from_str("20").unwrap();
        let b = Money::from_str("7.50").unwrap();

        assert_eq!((a + b).to_string(), "27.50");
        assert_eq!(a.checked_sub(b).unwrap().to_string(), "12.50");
        assert_eq!(b.checked_sub(a), None);
        assert_eq!(b.saturating_sub(a), Money::ZERO);
        assert_eq!([a, b, b].into_iter().sum::<Money>().to_string(), "35.00");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde() {
        let m: Money = serde_json::from_str("\"500.5\"").unwrap();
        assert_eq!(serde_json::to_string(&m).unwrap(), "\"500.50\"");

        let m: Money = serde_json::from_str("42").unwrap();
        assert_eq!(m.to_string(), "42.00");

        assert!(serde_json::from_str::<Money>("-3").is_err());
    }
}
