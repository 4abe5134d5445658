//! [`FuzzPattern`] definition.

use postgres_types::{FromSql, ToSql};

use crate::read::claim::list::Search;

/// `ILIKE` patterns matching any word of a [`Search`] query.
///
/// Meant to be bound as `ILIKE ANY($n::VARCHAR[])`.
#[derive(Clone, Debug, Eq, FromSql, PartialEq, ToSql)]
#[postgres(transparent)]
pub struct FuzzPattern(Vec<String>);

impl FuzzPattern {
    /// Creates a new [`FuzzPattern`] out of the given [`Search`] query.
    #[must_use]
    pub fn new(search: &Search) -> Self {
        Self(
            search
                .words()
                .map(|word| {
                    let escaped = word
                        .replace('\\', r"\\")
                        .replace('%', r"\%")
                        .replace('_', r"\_");
                    format!("%{escaped}%")
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod spec {
    use super::{FuzzPattern, Search};

    #[test]
    fn escapes_wildcards() {
        let search = Search::new("roof 100%  water_damage").unwrap();

        assert_eq!(
            FuzzPattern::new(&search).0,
            vec![
                "%roof%".to_owned(),
                r"%100\%%".to_owned(),
                r"%water\_damage%".to_owned(),
            ],
        );
    }
}
