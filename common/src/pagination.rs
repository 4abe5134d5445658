//! Abstractions for cursor-based pagination.

/// Page of nodes, each one paired with its cursor.
#[derive(Clone, Debug)]
pub struct Page<C, I> {
    /// [`Edge`]s in this [`Page`].
    pub edges: Vec<Edge<C, I>>,

    /// Indicator whether there are more nodes after this [`Page`].
    pub has_next_page: bool,
}

impl<C, I> Page<C, I> {
    /// Creates a new [`Page`] out of the `fetched` [`Edge`]s.
    ///
    /// `fetched` is expected to contain up to [`Arguments::fetch_limit()`]
    /// items: the extra one only indicates that a next page exists.
    #[must_use]
    pub fn new(
        args: &Arguments<C>,
        fetched: impl IntoIterator<Item = impl Into<Edge<C, I>>>,
    ) -> Self {
        let mut edges =
            fetched.into_iter().map(Into::into).collect::<Vec<_>>();
        let has_next_page = edges.len() > args.first;
        edges.truncate(args.first);
        Self {
            edges,
            has_next_page,
        }
    }

    /// Returns the cursor of the last [`Edge`] on this [`Page`], if any.
    #[must_use]
    pub fn end_cursor(&self) -> Option<&C> {
        self.edges.last().map(|e| &e.cursor)
    }

    /// Maps nodes of this [`Page`] with the provided function, dropping the
    /// ones it returns [`None`] for.
    #[must_use]
    pub fn filter_map<T>(
        self,
        mut f: impl FnMut(I) -> Option<T>,
    ) -> Page<C, T> {
        Page {
            edges: self
                .edges
                .into_iter()
                .filter_map(|Edge { cursor, node }| {
                    f(node).map(|node| Edge { cursor, node })
                })
                .collect(),
            has_next_page: self.has_next_page,
        }
    }
}

/// An edge in a [`Page`].
#[derive(Clone, Copy, Debug)]
pub struct Edge<C, I> {
    /// Cursor of this [`Edge`].
    pub cursor: C,

    /// Node of this [`Edge`].
    pub node: I,
}

impl<C, I> From<(C, I)> for Edge<C, I> {
    fn from((cursor, node): (C, I)) -> Self {
        Self { cursor, node }
    }
}

/// Pagination arguments.
#[derive(Clone, Copy, Debug)]
pub struct Arguments<C> {
    /// Number of items to return.
    pub first: usize,

    /// Cursor after which to return items.
    pub after: Option<C>,
}

impl<C> Arguments<C> {
    /// Maximum number of items a single [`Page`] may contain.
    pub const MAX_LIMIT: usize = 100;

    /// Creates new [`Arguments`], falling back to the `default` limit.
    ///
    /// [`None`] is returned if the requested limit is zero or exceeds
    /// [`Arguments::MAX_LIMIT`].
    #[must_use]
    pub fn new(
        first: Option<usize>,
        after: Option<C>,
        default: usize,
    ) -> Option<Self> {
        let first = first.unwrap_or(default);
        (1..=Self::MAX_LIMIT)
            .contains(&first)
            .then_some(Self { first, after })
    }

    /// Returns the number of items to fetch from storage for a [`Page`]
    /// (one more than requested, to detect a next page).
    #[must_use]
    pub fn fetch_limit(&self) -> usize {
        self.first + 1
    }
}

/// Pagination selector.
#[derive(Clone, Debug)]
pub struct Selector<C, F> {
    /// Pagination [`Arguments`].
    pub arguments: Arguments<C>,

    /// Additional filter being applied to the result.
    pub filter: F,
}

/// Defines pagination types.
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_pagination {
    ($cursor:ty, $node:ty, $filter:ty) => {
        #[doc = "Edge of a [`Page`]."]
        pub type Edge = $crate::pagination::Edge<$cursor, $node>;

        #[doc = "A [`Page`] of nodes."]
        pub type Page = $crate::pagination::Page<$cursor, $node>;

        #[doc = "Arguments for selecting a [`Page`]."]
        pub type Arguments = $crate::pagination::Arguments<$cursor>;

        #[doc = "[`Page`] selector."]
        pub type Selector = $crate::pagination::Selector<$cursor, $filter>;
    };
}

#[cfg(test)]
mod spec {
    use super::{Arguments, Page};

    #[test]
    fn validates_limit() {
        assert_eq!(Arguments::<u8>::new(None, None, 20).unwrap().first, 20);
        assert_eq!(Arguments::<u8>::new(Some(5), None, 20).unwrap().first, 5);
        assert!(Arguments::<u8>::new(Some(0), None, 20).is_none());
        assert!(Arguments::<u8>::new(Some(101), None, 20).is_none());
    }

    #[test]
    fn detects_next_page() {
        let args = Arguments::<u8>::new(Some(2), None, 20).unwrap();
        assert_eq!(args.fetch_limit(), 3);

        let page = Page::<u8, &str>::new(&args, [(1, "a"), (2, "b"), (3, "c")]);
        assert!(page.has_next_page);
        assert_eq!(page.edges.len(), 2);
        assert_eq!(page.end_cursor(), Some(&2));

        let page = Page::<u8, &str>::new(&args, [(1, "a")]);
        assert!(!page.has_next_page);
        assert_eq!(page.end_cursor(), Some(&1));
    }

    #[test]
    fn filter_maps_nodes() {
        let args = Arguments::<u8>::new(Some(3), None, 20).unwrap();
        let page = Page::<u8, u8>::new(&args, [(1, 10), (2, 20), (3, 30)])
            .filter_map(|n| (n != 20).then_some(n * 2));

        assert_eq!(
            page.edges.iter().map(|e| e.node).collect::<Vec<_>>(),
            [20, 60],
        );
    }
}
