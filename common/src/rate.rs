//! [`Rate`] definitions.

use std::{fmt, str::FromStr};

#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;

use crate::Money;

/// Fraction in `0..=1` range, used for commission rates.
///
/// `0.10` means ten percent.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Rate(Decimal);

impl Rate {
    /// Creates a new [`Rate`] out of the provided `fraction`.
    ///
    /// [`None`] is returned if the `fraction` lies outside `0..=1` range.
    #[must_use]
    pub fn new(fraction: Decimal) -> Option<Self> {
        (fraction >= Decimal::ZERO && fraction <= Decimal::ONE)
            .then(|| Self(fraction.normalize()))
    }

    /// Returns the fraction of this [`Rate`].
    #[must_use]
    pub fn fraction(&self) -> Decimal {
        self.0
    }

    /// Applies this [`Rate`] to the provided [`Money`] amount, rounding the
    /// result to cents.
    #[must_use]
    pub fn apply(&self, amount: Money) -> Money {
        // Never negative and never above `amount`, so rounding cannot fail.
        Money::rounded(amount.amount() * self.0).unwrap_or(Money::ZERO)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Rate {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fraction =
            Decimal::from_str(s.trim()).map_err(|_| "invalid rate")?;
        Self::new(fraction).ok_or("rate must be within `0..=1` range")
    }
}

#[cfg(feature = "serde")]
mod serde {
    //! Module providing integration with [`serde`] crate.

    use ::serde::{de, Deserialize, Deserializer, Serialize, Serializer};
    use rust_decimal::Decimal;

    use super::Rate;

    impl Serialize for Rate {
        fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
            Serialize::serialize(&self.0, s)
        }
    }

    impl<'de> Deserialize<'de> for Rate {
        fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
            let fraction = <Decimal as Deserialize>::deserialize(d)?;
            Self::new(fraction).ok_or_else(|| {
                de::Error::custom("rate must be within `0..=1` range")
            })
        }
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use crate::Money;

    use super::Rate;

    #[test]
    fn from_str() {
        assert_eq!(Rate::from_str("0.10").unwrap().to_string(), "0.1");
        assert_eq!(Rate::from_str("1").unwrap().to_string(), "1");
        assert_eq!(Rate::from_str("0").unwrap().to_string(), "0");

        assert!(Rate::from_str("1.01").is_err());
        assert!(Rate::from_str("-0.1").is_err());
        assert!(Rate::from_str("10%").is_err());
    }

    #[test]
    fn applies_to_money() {
        let rate = Rate::from_str("0.10").unwrap();

        assert_eq!(
            rate.apply(Money::from_str("500").unwrap()).to_string(),
            "50.00",
        );
        assert_eq!(
            rate.apply(Money::from_str("99.99").unwrap()).to_string(),
            "10.00",
        );
        assert_eq!(
            Rate::from_str("0.15")
                .unwrap()
                .apply(Money::from_str("33.33").unwrap())
                .to_string(),
            "5.00",
        );
        assert_eq!(rate.apply(Money::ZERO), Money::ZERO);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde() {
        let r: Rate = serde_json::from_str("\"0.10\"").unwrap();
        assert_eq!(serde_json::to_string(&r).unwrap(), "\"0.1\"");

        let r: Rate = serde_json::from_str("1").unwrap();
        assert_eq!(r.to_string(), "1");

        assert!(serde_json::from_str::<Rate>("\"1.5\"").is_err());
        assert!(serde_json::from_str::<Rate>("-0.1").is_err());
    }
}
