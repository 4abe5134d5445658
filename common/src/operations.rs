//! Abstract operations.

use std::marker::PhantomData;

use crate::Handler;

/// Operation to insert a value.
#[derive(Clone, Copy, Debug)]
pub struct Insert<T>(pub T);

/// Operation to update a value.
#[derive(Clone, Copy, Debug)]
pub struct Update<T>(pub T);

/// Operation to delete a value.
#[derive(Clone, Copy, Debug)]
pub struct Delete<T>(pub T);

/// Operation to select a value.
#[derive(Clone, Copy, Debug)]
pub struct Select<T>(pub T);

/// Operation to lock a value until the end of the current transaction.
#[derive(Clone, Copy, Debug)]
pub struct Lock<T>(pub T);

/// Operation to obtain the next value of a sequence.
#[derive(Clone, Copy, Debug)]
pub struct Next<T>(pub T);

/// Operation to start a transaction.
#[derive(Clone, Copy, Debug)]
pub struct Transact;

/// [`Transact`]ed value.
pub type Transacted<T> = <T as Handler<Transact>>::Ok;

/// Operation to commit a transaction.
#[derive(Clone, Copy, Debug)]
pub struct Commit;

/// Selector of `W` by `B`.
#[derive(Clone, Copy, Debug)]
pub struct By<W, B> {
    /// Type of the value to select.
    _what: PhantomData<W>,

    /// Value to select by.
    by: B,
}

impl<W, B> By<W, B> {
    /// Creates a new [`By`] with the given value.
    #[must_use]
    pub fn new(by: B) -> Self {
        Self {
            _what: PhantomData,
            by,
        }
    }

    /// Consumes this [`By`] and returns the inner value.
    #[must_use]
    pub fn into_inner(self) -> B {
        self.by
    }
}

/// Value `W` which is written only if the stored one is still in the
/// `expected` state.
///
/// Used as a compare-and-set: the operation reports whether the write has
/// actually been applied.
#[derive(Clone, Copy, Debug)]
pub struct Expecting<W, E> {
    /// New value to be written.
    pub value: W,

    /// State the stored value is expected to be in.
    pub expected: E,
}

impl<W, E> Expecting<W, E> {
    /// Creates a new [`Expecting`] writing the `value` only if the stored one
    /// is in the `expected` state.
    #[must_use]
    pub fn new(value: W, expected: E) -> Self {
        Self { value, expected }
    }
}
