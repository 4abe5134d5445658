//! Access control.
//!
//! Every [`Command`] asks [`can_perform()`] whether its initiating [`Actor`]
//! may perform the [`Action`] upon the [`Resource`].
//!
//! [`Command`]: crate::Command

use crate::domain::{
    claim, firm,
    user::{self, Role},
    Claim, Earning, Notification, User,
};

/// User performing an [`Action`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Actor {
    /// ID of this [`Actor`].
    pub id: user::Id,

    /// [`Role`] of this [`Actor`].
    pub role: Role,

    /// ID of the [`Firm`] this [`Actor`] administers, if any.
    ///
    /// [`Firm`]: crate::domain::Firm
    pub firm_id: Option<firm::Id>,

    /// Indicator whether this [`Actor`] is allowed to act at all.
    pub is_active: bool,
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            role: user.role,
            firm_id: user.firm_id,
            is_active: user.is_active,
        }
    }
}

impl Actor {
    /// Indicates whether this [`Actor`] administers the [`Firm`] with the
    /// provided ID.
    ///
    /// [`Firm`]: crate::domain::Firm
    #[must_use]
    pub fn administers(&self, firm_id: firm::Id) -> bool {
        self.role == Role::FirmAdmin && self.firm_id == Some(firm_id)
    }

    /// Returns the [`Visibility`] of [`Claim`]s for this [`Actor`].
    #[must_use]
    pub fn claim_visibility(&self) -> Visibility {
        if !self.is_active {
            return Visibility::Nothing;
        }
        match (self.role, self.firm_id) {
            (Role::Admin, _) => Visibility::All,
            (Role::FirmAdmin, Some(firm_id)) => Visibility::Firm(firm_id),
            (Role::FirmAdmin, None) => Visibility::Nothing,
            (Role::Adjuster, _) => Visibility::AvailableOr(self.id),
        }
    }
}

/// Action an [`Actor`] may perform.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Action {
    /// Create a [`Claim`].
    CreateClaim,

    /// View a [`Claim`].
    ViewClaim,

    /// Assign a [`Claim`] to the adjuster with the provided ID.
    AssignClaim {
        /// ID of the adjuster to assign the [`Claim`] to.
        target: user::Id,
    },

    /// Unassign a [`Claim`] from its adjuster.
    UnassignClaim,

    /// Update fields or status of a [`Claim`].
    UpdateClaim,

    /// Delete a [`Claim`].
    DeleteClaim,

    /// Create, update or delete an [`Earning`].
    ManageEarning,

    /// Manage affiliate partners, referrals and commissions.
    ManageAffiliates,

    /// Create firms.
    ManageFirms,

    /// Request a connection to a firm.
    RequestFirmConnection,

    /// Approve or reject a connection to a firm.
    ReviewFirmConnection,

    /// Read a [`Notification`].
    ReadNotification,
}

/// Resource an [`Action`] is performed upon.
#[derive(Clone, Copy, Debug)]
pub enum Resource<'a> {
    /// Nothing specific.
    None,

    /// [`Firm`] with the provided ID.
    ///
    /// [`Firm`]: crate::domain::Firm
    Firm(firm::Id),

    /// [`Claim`].
    Claim(&'a Claim),

    /// [`Earning`].
    Earning(&'a Earning),

    /// [`firm::Connection`].
    FirmConnection(&'a firm::Connection),

    /// [`Notification`].
    Notification(&'a Notification),
}

/// Claims an [`Actor`] is able to see.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Visibility {
    /// Every [`Claim`].
    All,

    /// [`Claim`]s of the firm with the provided ID.
    Firm(firm::Id),

    /// [`claim::Status::Available`] [`Claim`]s and the ones assigned to the
    /// adjuster with the provided ID.
    AvailableOr(user::Id),

    /// No [`Claim`]s at all.
    #[default]
    Nothing,
}

impl Visibility {
    /// Indicates whether the provided [`Claim`] is visible.
    #[must_use]
    pub fn covers(&self, claim: &Claim) -> bool {
        match *self {
            Self::All => true,
            Self::Firm(firm_id) => claim.firm_id == firm_id,
            Self::AvailableOr(adjuster_id) => {
                claim.status == claim::Status::Available
                    || claim.adjuster_id == Some(adjuster_id)
            }
            Self::Nothing => false,
        }
    }
}

/// Checks whether the [`Actor`] may perform the [`Action`] upon the
/// [`Resource`].
#[must_use]
pub fn can_perform(
    actor: &Actor,
    action: Action,
    resource: Resource<'_>,
) -> bool {
    use Action as A;
    use Resource as R;

    if !actor.is_active {
        return false;
    }
    let is_admin = actor.role == Role::Admin;

    match (action, resource) {
        (A::CreateClaim, R::Firm(firm_id)) => {
            is_admin || actor.administers(firm_id)
        }
        (A::ViewClaim, R::Claim(claim)) => {
            actor.claim_visibility().covers(claim)
        }
        (A::AssignClaim { target }, R::Claim(claim)) => {
            if target == actor.id {
                actor.role == Role::Adjuster
            } else {
                is_admin || actor.administers(claim.firm_id)
            }
        }
        (A::UnassignClaim | A::UpdateClaim, R::Claim(claim)) => {
            is_admin
                || actor.administers(claim.firm_id)
                || (claim.adjuster_id == Some(actor.id))
        }
        (A::DeleteClaim, R::Claim(claim)) => {
            is_admin || actor.administers(claim.firm_id)
        }
        (A::ManageEarning, R::Earning(earning)) => earning.user_id == actor.id,
        (A::ManageEarning, R::None) => true,
        (A::ManageAffiliates | A::ManageFirms, R::None) => is_admin,
        (A::RequestFirmConnection, R::Firm(_)) => {
            actor.role == Role::Adjuster
        }
        (A::ReviewFirmConnection, R::FirmConnection(conn)) => {
            is_admin || actor.administers(conn.firm_id)
        }
        (A::ReadNotification, R::Notification(n)) => n.user_id == actor.id,
        (
            A::CreateClaim
            | A::ViewClaim
            | A::AssignClaim { .. }
            | A::UnassignClaim
            | A::UpdateClaim
            | A::DeleteClaim
            | A::ManageEarning
            | A::ManageAffiliates
            | A::ManageFirms
            | A::RequestFirmConnection
            | A::ReviewFirmConnection
            | A::ReadNotification,
            _,
        ) => false,
    }
}

#[cfg(test)]
mod spec {
    use common::DateTime;

    use crate::domain::{
        claim::{self, Claim},
        firm, user,
        user::Role,
    };

    use super::{can_perform, Action, Actor, Resource, Visibility};

    fn actor(role: Role, firm_id: Option<firm::Id>) -> Actor {
        Actor {
            id: user::Id::new(),
            role,
            firm_id,
            is_active: true,
        }
    }

    fn claim(
        firm_id: firm::Id,
        status: claim::Status,
        adjuster_id: Option<user::Id>,
    ) -> Claim {
        let now = DateTime::now();
        Claim {
            id: claim::Id::new(),
            number: claim::Number::new(2024, 1),
            kind: claim::Kind::Theft,
            status,
            priority: claim::Priority::Low,
            title: claim::Title::new("Stolen bike").unwrap(),
            description: None,
            estimated_value: None,
            final_value: None,
            adjuster_fee: None,
            address: claim::Address::default(),
            incident_at: None,
            reported_at: None,
            deadline: None,
            completed_at: None,
            firm_id,
            adjuster_id,
            created_at: now.coerce(),
            updated_at: now.coerce(),
        }
    }

    #[test]
    fn self_assignment_requires_adjuster() {
        let c = claim(firm::Id::new(), claim::Status::Available, None);

        let adjuster = actor(Role::Adjuster, None);
        assert!(can_perform(
            &adjuster,
            Action::AssignClaim {
                target: adjuster.id,
            },
            Resource::Claim(&c),
        ));

        let admin = actor(Role::Admin, None);
        assert!(!can_perform(
            &admin,
            Action::AssignClaim { target: admin.id },
            Resource::Claim(&c),
        ));
    }

    #[test]
    fn third_party_assignment_requires_ownership() {
        let firm_id = firm::Id::new();
        let c = claim(firm_id, claim::Status::Available, None);
        let target = user::Id::new();
        let assign = Action::AssignClaim { target };

        assert!(can_perform(
            &actor(Role::Admin, None),
            assign,
            Resource::Claim(&c),
        ));
        assert!(can_perform(
            &actor(Role::FirmAdmin, Some(firm_id)),
            assign,
            Resource::Claim(&c),
        ));
        assert!(!can_perform(
            &actor(Role::FirmAdmin, Some(firm::Id::new())),
            assign,
            Resource::Claim(&c),
        ));
        assert!(!can_perform(
            &actor(Role::Adjuster, None),
            assign,
            Resource::Claim(&c),
        ));
    }

    #[test]
    fn assignee_may_unassign_but_not_delete() {
        let adjuster = actor(Role::Adjuster, None);
        let c = claim(
            firm::Id::new(),
            claim::Status::Assigned,
            Some(adjuster.id),
        );

        assert!(can_perform(
            &adjuster,
            Action::UnassignClaim,
            Resource::Claim(&c),
        ));
        assert!(can_perform(
            &adjuster,
            Action::UpdateClaim,
            Resource::Claim(&c),
        ));
        assert!(!can_perform(
            &adjuster,
            Action::DeleteClaim,
            Resource::Claim(&c),
        ));

        let stranger = actor(Role::Adjuster, None);
        assert!(!can_perform(
            &stranger,
            Action::UnassignClaim,
            Resource::Claim(&c),
        ));
    }

    #[test]
    fn inactive_actor_can_do_nothing() {
        let mut admin = actor(Role::Admin, None);
        admin.is_active = false;

        assert!(!can_perform(&admin, Action::ManageFirms, Resource::None));
        assert_eq!(admin.claim_visibility(), Visibility::Nothing);
    }

    #[test]
    fn restricts_claim_visibility() {
        let firm_id = firm::Id::new();
        let adjuster = actor(Role::Adjuster, None);

        let available = claim(firm_id, claim::Status::Available, None);
        let own = claim(firm_id, claim::Status::Assigned, Some(adjuster.id));
        let foreign =
            claim(firm_id, claim::Status::Assigned, Some(user::Id::new()));

        let v = adjuster.claim_visibility();
        assert!(v.covers(&available));
        assert!(v.covers(&own));
        assert!(!v.covers(&foreign));

        let v = actor(Role::FirmAdmin, Some(firm_id)).claim_visibility();
        assert!(v.covers(&foreign));
        let v =
            actor(Role::FirmAdmin, Some(firm::Id::new())).claim_visibility();
        assert!(!v.covers(&available));

        assert!(actor(Role::Admin, None).claim_visibility().covers(&foreign));
    }

    #[test]
    fn only_admins_manage_affiliates() {
        assert!(can_perform(
            &actor(Role::Admin, None),
            Action::ManageAffiliates,
            Resource::None,
        ));
        assert!(!can_perform(
            &actor(Role::FirmAdmin, Some(firm::Id::new())),
            Action::ManageAffiliates,
            Resource::None,
        ));
    }
}
