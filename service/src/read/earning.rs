//! [`Earning`] read model definition.

use std::{collections::BTreeMap, fmt};

use common::{DateTime, DateTimeOf, Money};

use crate::domain::{
    earning::{self, Earning},
    user,
};

/// Filter of the [`Earning`]s of a single user, most recently earned first.
#[derive(Clone, Copy, Debug)]
pub struct Filter {
    /// ID of the user owning the [`Earning`]s.
    pub user_id: user::Id,

    /// [`earning::Status`] of the [`Earning`]s, if any.
    pub status: Option<earning::Status>,
}

/// [`earning::Status::Pending`] [`Earning`]s.
///
/// Used to select or delete all the pending [`Earning`]s of a claim at once.
#[derive(Clone, Copy, Debug)]
pub struct Pending;

/// Number and total amount of [`Earning`]s.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Tally {
    /// Number of [`Earning`]s.
    pub count: u64,

    /// Total amount of [`Earning`]s.
    pub amount: Money,
}

impl Tally {
    /// Accounts the provided [`Earning`] in this [`Tally`].
    fn add(&mut self, earning: &Earning) {
        self.count += 1;
        self.amount += earning.amount;
    }
}

/// Calendar month in a `YYYY-MM` format.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Month {
    /// Year of this [`Month`].
    pub year: i32,

    /// Number of this [`Month`] in its year (`1..=12`).
    pub month: u8,
}

impl<Of: ?Sized> From<DateTimeOf<Of>> for Month {
    fn from(dt: DateTimeOf<Of>) -> Self {
        Self {
            year: dt.year(),
            month: dt.month(),
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Summary of a user's [`Earning`]s ledger.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Summary {
    /// [`Tally`] of all the [`Earning`]s.
    pub total: Tally,

    /// [`Tally`] of [`Earning`]s grouped by their [`earning::Status`].
    pub by_status: BTreeMap<earning::Status, Tally>,

    /// [`Tally`] of [`Earning`]s grouped by their [`earning::Kind`].
    pub by_kind: BTreeMap<earning::Kind, Tally>,

    /// [`Tally`] of [`Earning`]s grouped by the [`Month`] they were earned
    /// in.
    pub by_month: BTreeMap<Month, Tally>,
}

impl Summary {
    /// Computes a [`Summary`] of the provided [`Earning`]s.
    #[must_use]
    pub fn compute<'e>(
        earnings: impl IntoIterator<Item = &'e Earning>,
    ) -> Self {
        let mut summary = Self::default();
        for e in earnings {
            summary.total.add(e);
            summary.by_status.entry(e.status).or_default().add(e);
            summary.by_kind.entry(e.kind.clone()).or_default().add(e);
            summary
                .by_month
                .entry(Month::from(e.earned_at))
                .or_default()
                .add(e);
        }
        summary
    }

    /// Returns the [`Tally`] of [`Earning`]s in the provided
    /// [`earning::Status`].
    #[must_use]
    pub fn of_status(&self, status: earning::Status) -> Tally {
        self.by_status.get(&status).copied().unwrap_or_default()
    }

    /// Returns the [`Tally`] of [`Earning`]s earned in the current [`Month`].
    #[must_use]
    pub fn this_month(&self) -> Tally {
        self.by_month
            .get(&Month::from(DateTime::now()))
            .copied()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod spec {
    use common::{DateTime, Money};

    use crate::domain::{
        earning::{self, Earning, Status},
        user,
    };

    use super::{Month, Summary, Tally};

    fn earning(amount: &str, kind: &str, status: Status, at: &str) -> Earning {
        let earned_at = DateTime::from_rfc3339(at).unwrap();
        Earning {
            id: earning::Id::new(),
            user_id: user::Id::new(),
            claim_id: None,
            amount: amount.parse().unwrap(),
            kind: earning::Kind::new(kind).unwrap(),
            status,
            description: None,
            earned_at: earned_at.coerce(),
            paid_at: (status == Status::Paid).then(|| earned_at.coerce()),
            created_at: earned_at.coerce(),
        }
    }

    fn tally(count: u64, amount: &str) -> Tally {
        Tally {
            count,
            amount: amount.parse::<Money>().unwrap(),
        }
    }

    #[test]
    fn summarizes_ledger() {
        let ledger = [
            earning("500", "CLAIM_FEE", Status::Pending, "2024-03-02T10:00:00Z"),
            earning("250.5", "CLAIM_FEE", Status::Paid, "2024-03-20T10:00:00Z"),
            earning("100", "BONUS", Status::Paid, "2024-04-01T00:00:00Z"),
            earning("20", "BONUS", Status::Disputed, "2024-04-15T00:00:00Z"),
        ];

        let s = Summary::compute(&ledger);

        assert_eq!(s.total, tally(4, "870.50"));
        assert_eq!(s.of_status(Status::Pending), tally(1, "500"));
        assert_eq!(s.of_status(Status::Paid), tally(2, "350.50"));
        assert_eq!(s.of_status(Status::Disputed), tally(1, "20"));

        assert_eq!(
            s.by_kind[&earning::Kind::new("CLAIM_FEE").unwrap()],
            tally(2, "750.50"),
        );
        assert_eq!(
            s.by_kind[&earning::Kind::new("BONUS").unwrap()],
            tally(2, "120"),
        );

        let months = s
            .by_month
            .iter()
            .map(|(m, t)| (m.to_string(), *t))
            .collect::<Vec<_>>();
        assert_eq!(
            months,
            [
                ("2024-03".to_owned(), tally(2, "750.50")),
                ("2024-04".to_owned(), tally(2, "120")),
            ],
        );
    }

    #[test]
    fn summarizes_empty_ledger() {
        let s = Summary::compute(&[]);

        assert_eq!(s.total, Tally::default());
        assert_eq!(s.of_status(Status::Paid), Tally::default());
        assert!(s.by_month.is_empty());
    }

    #[test]
    fn formats_month() {
        let m = Month {
            year: 2024,
            month: 3,
        };
        assert_eq!(m.to_string(), "2024-03");
    }
}
