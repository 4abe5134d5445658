//! [`Query`] collection related to the [`Notification`]s of a user.

use common::operations::By;

#[cfg(doc)]
use crate::Query;
use crate::{domain::Notification, read::notification::Filter};

use super::DatabaseQuery;

/// Queries [`Notification`]s of a user, newest first.
pub type List = DatabaseQuery<By<Vec<Notification>, Filter>>;
