//! [`Notification`] read model definition.
//!
//! [`Notification`]: crate::domain::Notification

use crate::domain::user;

/// Filter of the [`Notification`]s of a single user, newest first.
///
/// [`Notification`]: crate::domain::Notification
#[derive(Clone, Copy, Debug)]
pub struct Filter {
    /// ID of the user the [`Notification`]s are addressed to.
    ///
    /// [`Notification`]: crate::domain::Notification
    pub user_id: user::Id,

    /// Indicator whether only unread [`Notification`]s should be selected.
    ///
    /// [`Notification`]: crate::domain::Notification
    pub unread_only: bool,
}
