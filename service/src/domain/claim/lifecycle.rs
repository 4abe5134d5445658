//! [`Claim`] lifecycle.
//!
//! | Event      | From                             | To          |
//! |------------|----------------------------------|-------------|
//! | `Assign`   | AVAILABLE                        | ASSIGNED    |
//! | `Unassign` | ASSIGNED                         | AVAILABLE   |
//! | `Start`    | ASSIGNED                         | IN_PROGRESS |
//! | `Complete` | ASSIGNED, IN_PROGRESS            | COMPLETED   |
//! | `Cancel`   | AVAILABLE, ASSIGNED, IN_PROGRESS | CANCELLED   |
//! | `Reopen`   | CANCELLED                        | AVAILABLE   |

use common::DateTime;
use derive_more::{Display, Error};

use crate::domain::user;

use super::{Claim, Status};

/// Event changing a [`Status`] of a [`Claim`].
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Event {
    /// Assign the [`Claim`] to the adjuster with the provided ID.
    #[display("assign")]
    Assign(user::Id),

    /// Release the [`Claim`] back for assignment.
    #[display("unassign")]
    Unassign,

    /// Start handling the [`Claim`].
    #[display("start")]
    Start,

    /// Finish handling the [`Claim`].
    #[display("complete")]
    Complete,

    /// Withdraw the [`Claim`] from handling.
    #[display("cancel")]
    Cancel,

    /// Return a cancelled [`Claim`] back for assignment.
    #[display("reopen")]
    Reopen,
}

impl Event {
    /// Resolves the [`Event`] moving a [`Claim`] from the `current` [`Status`]
    /// to the `target` one, if any is needed.
    ///
    /// # Errors
    ///
    /// With [`TransitionError::AssignmentRequired`] if the `target` is
    /// [`Status::Assigned`], even when the `current` one is: the assignee must
    /// be specified explicitly.
    pub fn towards(
        current: Status,
        target: Status,
    ) -> Result<Option<Self>, TransitionError> {
        if target == Status::Assigned {
            return Err(TransitionError::AssignmentRequired);
        }
        if current == target {
            return Ok(None);
        }
        Ok(Some(match target {
            Status::Available if current == Status::Cancelled => Self::Reopen,
            Status::Available => Self::Unassign,
            Status::Assigned => return Err(TransitionError::AssignmentRequired),
            Status::InProgress => Self::Start,
            Status::Completed => Self::Complete,
            Status::Cancelled => Self::Cancel,
        }))
    }
}

/// Applied change of a [`Claim`]'s [`Status`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Transition {
    /// [`Status`] before the change.
    pub from: Status,

    /// [`Status`] after the change.
    pub to: Status,

    /// ID of the adjuster the [`Claim`] has been taken from, if any.
    pub released: Option<user::Id>,
}

/// Error of applying an [`Event`] to a [`Claim`].
#[derive(Clone, Copy, Debug, Display, Error, Eq, PartialEq)]
pub enum TransitionError {
    /// [`Claim`] is not [`Status::Available`] for assignment.
    #[display("Claim is not available for assignment")]
    NotAvailable,

    /// [`Claim`] has no adjuster to be unassigned.
    #[display("Claim is not assigned")]
    NotAssigned,

    /// [`Claim`] is being handled or has been handled already.
    #[display("Cannot unassign active or completed claims")]
    ActiveOrCompleted,

    /// [`Status::Assigned`] cannot be reached without an assignee.
    #[display("Claim can be assigned only by assigning an adjuster")]
    AssignmentRequired,

    /// [`Event`] is not applicable to the current [`Status`].
    #[display("Cannot {event} a claim being {from}")]
    Illegal {
        /// [`Status`] the [`Event`] has been applied to.
        #[error(not(source))]
        from: Status,

        /// Rejected [`Event`].
        #[error(not(source))]
        event: Event,
    },
}

impl Claim {
    /// Applies the provided [`Event`] to this [`Claim`] at the given
    /// [`DateTime`].
    ///
    /// Nothing is changed on error.
    ///
    /// # Errors
    ///
    /// If the [`Event`] is not applicable to the current [`Status`] of this
    /// [`Claim`].
    pub fn apply(
        &mut self,
        event: Event,
        at: DateTime,
    ) -> Result<Transition, TransitionError> {
        use Status as S;
        use TransitionError as E;

        let from = self.status;
        let illegal = E::Illegal { from, event };

        let (to, adjuster_id) = match (event, from) {
            (Event::Assign(adjuster), S::Available) => {
                (S::Assigned, Some(adjuster))
            }
            (Event::Assign(_), _) => return Err(E::NotAvailable),

            (Event::Unassign, _) if self.adjuster_id.is_none() => {
                return Err(E::NotAssigned)
            }
            (Event::Unassign, S::InProgress | S::Completed) => {
                return Err(E::ActiveOrCompleted)
            }
            (Event::Unassign, S::Assigned) => (S::Available, None),

            (Event::Start, S::Assigned) => (S::InProgress, self.adjuster_id),

            (Event::Complete, S::Assigned | S::InProgress) => {
                (S::Completed, self.adjuster_id)
            }

            (Event::Cancel, S::Available | S::Assigned | S::InProgress) => {
                (S::Cancelled, None)
            }

            (Event::Reopen, S::Cancelled) => (S::Available, None),

            (
                Event::Unassign
                | Event::Start
                | Event::Complete
                | Event::Cancel
                | Event::Reopen,
                _,
            ) => return Err(illegal),
        };

        let released = self.adjuster_id.filter(|_| adjuster_id.is_none());

        self.status = to;
        self.adjuster_id = adjuster_id;
        self.completed_at = (to == S::Completed).then(|| at.coerce());
        self.updated_at = at.coerce();

        Ok(Transition { from, to, released })
    }
}

#[cfg(test)]
mod spec {
    use common::{DateTime, Money};

    use crate::domain::{
        claim::{self, Claim},
        firm, user,
    };

    use super::{Event, Status, Transition, TransitionError};

    fn claim(status: Status, adjuster_id: Option<user::Id>) -> Claim {
        let now = DateTime::now();
        Claim {
            id: claim::Id::new(),
            number: claim::Number::new(2024, 1),
            kind: claim::Kind::WaterDamage,
            status,
            priority: claim::Priority::Medium,
            title: claim::Title::new("Leaking roof").unwrap(),
            description: None,
            estimated_value: None,
            final_value: None,
            adjuster_fee: Some("500".parse::<Money>().unwrap()),
            address: claim::Address::default(),
            incident_at: None,
            reported_at: None,
            deadline: None,
            completed_at: (status == Status::Completed)
                .then(|| now.coerce()),
            firm_id: firm::Id::new(),
            adjuster_id,
            created_at: now.coerce(),
            updated_at: now.coerce(),
        }
    }

    fn assert_invariants(c: &Claim) {
        assert_eq!(
            c.adjuster_id.is_some(),
            matches!(
                c.status,
                Status::Assigned | Status::InProgress | Status::Completed,
            ),
            "adjuster presence mismatch for {:?}",
            c.status,
        );
        assert_eq!(
            c.completed_at.is_some(),
            c.status == Status::Completed,
            "completion mismatch for {:?}",
            c.status,
        );
    }

    #[test]
    fn assigns_available() {
        let adjuster = user::Id::new();
        let mut c = claim(Status::Available, None);

        let t = c.apply(Event::Assign(adjuster), DateTime::now()).unwrap();

        assert_eq!(
            t,
            Transition {
                from: Status::Available,
                to: Status::Assigned,
                released: None,
            },
        );
        assert_eq!(c.adjuster_id, Some(adjuster));
        assert_invariants(&c);
    }

    #[test]
    fn assigns_only_available() {
        let adjuster = user::Id::new();
        for status in [Status::Assigned, Status::InProgress, Status::Completed]
        {
            let mut c = claim(status, Some(adjuster));
            assert_eq!(
                c.apply(Event::Assign(user::Id::new()), DateTime::now()),
                Err(TransitionError::NotAvailable),
            );
            assert_eq!(c.adjuster_id, Some(adjuster));
        }

        let mut c = claim(Status::Cancelled, None);
        assert_eq!(
            c.apply(Event::Assign(adjuster), DateTime::now()),
            Err(TransitionError::NotAvailable),
        );
    }

    #[test]
    fn unassigns_assigned() {
        let adjuster = user::Id::new();
        let mut c = claim(Status::Assigned, Some(adjuster));

        let t = c.apply(Event::Unassign, DateTime::now()).unwrap();

        assert_eq!(t.to, Status::Available);
        assert_eq!(t.released, Some(adjuster));
        assert_invariants(&c);

        assert_eq!(
            c.apply(Event::Unassign, DateTime::now()),
            Err(TransitionError::NotAssigned),
        );
    }

    #[test]
    fn refuses_unassigning_active_or_completed() {
        for status in [Status::InProgress, Status::Completed] {
            let mut c = claim(status, Some(user::Id::new()));
            assert_eq!(
                c.apply(Event::Unassign, DateTime::now()),
                Err(TransitionError::ActiveOrCompleted),
            );
            assert_eq!(c.status, status);
        }
    }

    #[test]
    fn completes_through_progress() {
        let adjuster = user::Id::new();
        let mut c = claim(Status::Assigned, Some(adjuster));

        _ = c.apply(Event::Start, DateTime::now()).unwrap();
        assert_eq!(c.status, Status::InProgress);
        assert_invariants(&c);

        let t = c.apply(Event::Complete, DateTime::now()).unwrap();
        assert_eq!(t.released, None);
        assert_eq!(c.adjuster_id, Some(adjuster));
        assert!(c.completed_at.is_some());
        assert_invariants(&c);
    }

    #[test]
    fn never_completes_available() {
        let mut c = claim(Status::Available, None);

        assert_eq!(
            c.apply(Event::Complete, DateTime::now()),
            Err(TransitionError::Illegal {
                from: Status::Available,
                event: Event::Complete,
            }),
        );
        assert!(c.completed_at.is_none());
    }

    #[test]
    fn cancels_and_reopens() {
        let adjuster = user::Id::new();
        let mut c = claim(Status::InProgress, Some(adjuster));

        let t = c.apply(Event::Cancel, DateTime::now()).unwrap();
        assert_eq!(t.released, Some(adjuster));
        assert_eq!(c.status, Status::Cancelled);
        assert_invariants(&c);

        _ = c.apply(Event::Reopen, DateTime::now()).unwrap();
        assert_eq!(c.status, Status::Available);
        assert_invariants(&c);
    }

    #[test]
    fn keeps_completed_terminal() {
        for event in [Event::Start, Event::Cancel, Event::Reopen] {
            let mut c = claim(Status::Completed, Some(user::Id::new()));
            assert!(matches!(
                c.apply(event, DateTime::now()),
                Err(TransitionError::Illegal { .. }),
            ));
            assert_invariants(&c);
        }
    }

    #[test]
    fn resolves_events_towards_status() {
        use Status as S;

        assert_eq!(Event::towards(S::InProgress, S::InProgress), Ok(None));
        assert_eq!(
            Event::towards(S::Assigned, S::Assigned),
            Err(super::TransitionError::AssignmentRequired),
        );
        assert_eq!(
            Event::towards(S::Cancelled, S::Available),
            Ok(Some(Event::Reopen)),
        );
        assert_eq!(
            Event::towards(S::Assigned, S::Available),
            Ok(Some(Event::Unassign)),
        );
        assert_eq!(
            Event::towards(S::Assigned, S::InProgress),
            Ok(Some(Event::Start)),
        );
        assert_eq!(
            Event::towards(S::InProgress, S::Completed),
            Ok(Some(Event::Complete)),
        );
        assert_eq!(
            Event::towards(S::Available, S::Cancelled),
            Ok(Some(Event::Cancel)),
        );
        assert_eq!(
            Event::towards(S::Available, S::Assigned),
            Err(super::TransitionError::AssignmentRequired),
        );
    }
}
