//! Ledger of affiliate [`Commission`]s.
//!
//! Every [`Commission`] write goes through an [`Entry`], so the
//! [`Partner::total_earnings`] counter is never changed apart from the
//! [`Commission`] it accounts for.
//!
//! [`Partner::total_earnings`]: super::Partner::total_earnings

use common::Money;

use super::Commission;

/// Persisted [`Commission`] along with the change of its partner's total
/// earnings.
#[derive(Clone, Debug)]
pub struct Entry {
    /// [`Commission`] to be persisted.
    commission: Commission,

    /// [`Adjustment`] of the partner's total earnings.
    adjustment: Adjustment,
}

impl Entry {
    /// Creates a new [`Entry`].
    pub(super) fn new(commission: Commission, adjustment: Adjustment) -> Self {
        Self {
            commission,
            adjustment,
        }
    }

    /// Returns the [`Commission`] of this [`Entry`].
    #[must_use]
    pub fn commission(&self) -> &Commission {
        &self.commission
    }

    /// Returns the [`Adjustment`] of this [`Entry`].
    #[must_use]
    pub fn adjustment(&self) -> Adjustment {
        self.adjustment
    }

    /// Splits this [`Entry`] into its parts.
    #[must_use]
    pub fn into_parts(self) -> (Commission, Adjustment) {
        (self.commission, self.adjustment)
    }
}

/// Change of a partner's total earnings.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Adjustment {
    /// Total stays the same.
    None,

    /// Amount is added to the total.
    Credit(Money),

    /// Amount is subtracted from the total.
    Debit(Money),
}

impl Adjustment {
    /// Applies this [`Adjustment`] to the provided `total`.
    #[must_use]
    pub fn apply_to(self, total: Money) -> Money {
        match self {
            Self::None => total,
            Self::Credit(amount) => total + amount,
            Self::Debit(amount) => total.saturating_sub(amount),
        }
    }
}
