//! [`Handler`] abstractions.

use std::future::Future;

/// Executable handler.
///
/// Commands, queries and [`operations`] upon a database are all expressed as
/// a [`Handler`] of some `Args`, so a single type may implement it many times.
///
/// [`operations`]: crate::operations
pub trait Handler<Args = ()> {
    /// Type of successful [`Handler`] result.
    type Ok;

    /// Type of this [`Handler`] error.
    type Err;

    /// Executes this [`Handler`] with the provided arguments.
    fn execute(
        &self,
        args: Args,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>>;
}
