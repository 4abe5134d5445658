//! [`Claim`] definitions.

pub mod lifecycle;

use std::sync::LazyLock;

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf, Money};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{firm, user};

pub use self::lifecycle::{Event, Transition, TransitionError};

/// Unit of insurance-adjustment work offered by a firm and performed by an
/// adjuster.
///
/// Invariants, maintained by [`Claim::apply()`]:
/// - `adjuster_id` is set if and only if `status` is one of
///   [`Status::Assigned`], [`Status::InProgress`] or [`Status::Completed`];
/// - `completed_at` is set if and only if `status` is [`Status::Completed`].
#[derive(Clone, Debug)]
pub struct Claim {
    /// ID of this [`Claim`].
    pub id: Id,

    /// Human-readable [`Number`] of this [`Claim`].
    pub number: Number,

    /// [`Kind`] of damage this [`Claim`] is about.
    pub kind: Kind,

    /// [`Status`] of this [`Claim`].
    pub status: Status,

    /// [`Priority`] of this [`Claim`].
    pub priority: Priority,

    /// [`Title`] of this [`Claim`].
    pub title: Title,

    /// [`Description`] of this [`Claim`].
    pub description: Option<Description>,

    /// Estimated value of the damage.
    pub estimated_value: Option<Money>,

    /// Final value of the damage, once adjusted.
    pub final_value: Option<Money>,

    /// Fee an adjuster earns for handling this [`Claim`].
    pub adjuster_fee: Option<Money>,

    /// [`Address`] of the damaged property.
    pub address: Address,

    /// [`DateTime`] when the incident happened.
    pub incident_at: Option<IncidentDateTime>,

    /// [`DateTime`] when the incident was reported.
    pub reported_at: Option<ReportDateTime>,

    /// [`DateTime`] this [`Claim`] should be handled before.
    pub deadline: Option<DeadlineDateTime>,

    /// [`DateTime`] when this [`Claim`] was completed.
    pub completed_at: Option<CompletionDateTime>,

    /// ID of the firm owning this [`Claim`].
    pub firm_id: firm::Id,

    /// ID of the adjuster this [`Claim`] is assigned to.
    pub adjuster_id: Option<user::Id>,

    /// [`DateTime`] when this [`Claim`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Claim`] was modified last time.
    pub updated_at: ModificationDateTime,
}

impl Claim {
    /// Indicates whether this [`Claim`] is being handled or has been handled
    /// already, so cannot be deleted.
    #[must_use]
    pub fn is_active_or_completed(&self) -> bool {
        matches!(self.status, Status::InProgress | Status::Completed)
    }
}

/// ID of a [`Claim`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Human-readable number of a [`Claim`] in a `CLM-<year>-<sequence>` format.
///
/// Sequence restarts every year and is zero-padded to 6 digits, so
/// [`Number`]s of the same year order lexicographically by their creation.
#[derive(
    AsRef,
    Clone,
    Debug,
    Display,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Number(String);

impl Number {
    /// Creates a new [`Number`] out of the provided `year` and `sequence`
    /// number within it.
    #[must_use]
    pub fn new(year: i32, sequence: u32) -> Self {
        Self(format!("CLM-{year:04}-{sequence:06}"))
    }

    /// Checks whether the given `number` is a valid [`Number`].
    fn check(number: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Number`] format.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^CLM-\d{4}-\d{6,}$").expect("valid regex")
        });

        REGEX.is_match(number.as_ref())
    }
}

impl FromStr for Number {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::check(s)
            .then(|| Self(s.to_owned()))
            .ok_or("invalid `Number`")
    }
}

impl<'de> Deserialize<'de> for Number {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(d)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

common::define_kind! {
    #[doc = "Kind of damage a [`Claim`] is about."]
    enum Kind {
        #[doc = "Damage caused by water."]
        WaterDamage,

        #[doc = "Damage caused by fire."]
        FireDamage,

        #[doc = "Damage caused by wind."]
        WindDamage,

        #[doc = "Damage caused by hail."]
        HailDamage,

        #[doc = "Damage caused by flood."]
        FloodDamage,

        #[doc = "Theft of property."]
        Theft,

        #[doc = "Intentional damage of property."]
        Vandalism,

        #[doc = "Vehicle collision."]
        AutoCollision,

        #[doc = "Third-party liability."]
        Liability,

        #[doc = "Anything else."]
        Other,
    }
}

common::define_kind! {
    #[doc = "Status of a [`Claim`] in its lifecycle."]
    enum Status {
        #[doc = "Open for assignment."]
        Available,

        #[doc = "Assigned to an adjuster, but not started yet."]
        Assigned,

        #[doc = "Being handled by the assigned adjuster."]
        InProgress,

        #[doc = "Handled by the assigned adjuster."]
        Completed,

        #[doc = "Withdrawn from handling."]
        Cancelled,
    }
}

common::define_kind! {
    #[doc = "Priority of a [`Claim`]."]
    enum Priority {
        #[doc = "Low priority."]
        Low,

        #[doc = "Medium priority."]
        Medium,

        #[doc = "High priority."]
        High,

        #[doc = "Must be handled as soon as possible."]
        Urgent,
    }
}

/// Title of a [`Claim`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq, Serialize)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Title(String);

impl Title {
    /// Creates a new [`Title`] if the given `title` is valid.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Option<Self> {
        let title = title.into();
        Self::check(&title).then_some(Self(title))
    }

    /// Checks whether the given `title` is a valid [`Title`].
    fn check(title: impl AsRef<str>) -> bool {
        let title = title.as_ref();
        title.trim() == title && !title.is_empty() && title.len() <= 256
    }
}

impl FromStr for Title {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Title`")
    }
}

/// Description of a [`Claim`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq, Serialize)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Description(String);

impl Description {
    /// Creates a new [`Description`] if the given `text` is valid.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        (!text.trim().is_empty() && text.len() <= 8192).then_some(Self(text))
    }
}

impl FromStr for Description {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Description`")
    }
}

/// Address of a property a [`Claim`] is about.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Address {
    /// Street line, including a house number.
    pub street: Option<AddressPart>,

    /// City name.
    pub city: Option<AddressPart>,

    /// State or region.
    pub state: Option<AddressPart>,

    /// Postal code.
    pub zip_code: Option<AddressPart>,
}

/// Single part of an [`Address`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq, Serialize)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct AddressPart(String);

impl AddressPart {
    /// Creates a new [`AddressPart`] if the given `part` is valid.
    #[must_use]
    pub fn new(part: impl Into<String>) -> Option<Self> {
        let part = part.into();
        (part.trim() == part && !part.is_empty() && part.len() <= 256)
            .then_some(Self(part))
    }
}

impl FromStr for AddressPart {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid address")
    }
}

/// [`DateTime`] when a [`Claim`] was created.
pub type CreationDateTime = DateTimeOf<(Claim, unit::Creation)>;

/// [`DateTime`] when a [`Claim`] was modified.
pub type ModificationDateTime = DateTimeOf<(Claim, unit::Modification)>;

/// [`DateTime`] when a [`Claim`] was completed.
pub type CompletionDateTime = DateTimeOf<(Claim, unit::Completion)>;

/// [`DateTime`] a [`Claim`] should be handled before.
pub type DeadlineDateTime = DateTimeOf<(Claim, unit::Deadline)>;

/// [`DateTime`] when an incident of a [`Claim`] happened.
pub type IncidentDateTime = DateTimeOf<(Claim, unit::Incident)>;

/// [`DateTime`] when an incident of a [`Claim`] was reported.
pub type ReportDateTime = DateTimeOf<(Claim, unit::Report)>;

#[cfg(test)]
mod spec {
    use super::Number;

    #[test]
    fn formats_number() {
        assert_eq!(Number::new(2024, 7).to_string(), "CLM-2024-000007");
        assert_eq!(
            Number::new(2025, 1_234_567).to_string(),
            "CLM-2025-1234567",
        );
    }

    #[test]
    fn parses_number() {
        assert!("CLM-2024-000001".parse::<Number>().is_ok());
        assert!("CLM-24-000001".parse::<Number>().is_err());
        assert!("clm-2024-000001".parse::<Number>().is_err());
        assert!("CLM-2024-1".parse::<Number>().is_err());
    }

    #[test]
    fn orders_numbers_by_creation() {
        assert!(Number::new(2024, 9) < Number::new(2024, 10));
        assert!(Number::new(2024, 999_999) < Number::new(2025, 1));
    }
}
