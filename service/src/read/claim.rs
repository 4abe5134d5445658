//! [`Claim`] read model definition.
//!
//! [`Claim`]: crate::domain::Claim

pub mod list {
    //! [`Claim`]s list definitions.

    use std::str::FromStr;

    use common::define_pagination;
    use derive_more::{AsRef, Display};

    #[cfg(doc)]
    use crate::domain::Claim;
    use crate::domain::{access::Visibility, claim, firm, user};

    define_pagination!(Cursor, Node, Filter);

    /// Node in a [`Page`].
    pub type Node = claim::Id;

    /// Cursor pointing to a specific [`Claim`] in a list.
    ///
    /// [`Claim`]s are listed from the newest to the oldest one.
    pub type Cursor = claim::Number;

    /// Filter for [`Selector`].
    #[derive(Clone, Debug, Default)]
    pub struct Filter {
        /// [`claim::Status`] of the listed [`Claim`]s.
        pub status: Option<claim::Status>,

        /// ID of the firm owning the listed [`Claim`]s.
        pub firm_id: Option<firm::Id>,

        /// ID of the adjuster the listed [`Claim`]s are assigned to.
        pub adjuster_id: Option<user::Id>,

        /// [`Search`] query matched against [`Claim`]'s number, title and
        /// description.
        pub search: Option<Search>,

        /// [`Visibility`] of [`Claim`]s for the viewer.
        pub visibility: Visibility,
    }

    /// Text to fuzzy search [`Claim`]s for.
    #[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
    #[as_ref(str, String)]
    pub struct Search(String);

    impl Search {
        /// Creates a new [`Search`] if the given `query` is valid.
        #[must_use]
        pub fn new(query: impl AsRef<str>) -> Option<Self> {
            let query = query.as_ref().trim();
            (!query.is_empty() && query.len() <= 128)
                .then(|| Self(query.to_owned()))
        }

        /// Returns the words of this [`Search`] query.
        pub fn words(&self) -> impl Iterator<Item = &str> {
            self.0.split_ascii_whitespace()
        }

        /// Indicates whether the provided `text` contains any of the words
        /// of this [`Search`] query, ignoring the case.
        #[must_use]
        pub fn matches(&self, text: &str) -> bool {
            let text = text.to_lowercase();
            self.words().any(|w| text.contains(&w.to_lowercase()))
        }
    }

    impl FromStr for Search {
        type Err = &'static str;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            Self::new(s).ok_or("invalid `Search`")
        }
    }
}
