//! Marker types describing what a [`DateTimeOf`] stands for.
//!
//! [`DateTimeOf`]: crate::DateTimeOf

/// Marker type describing an entity creation.
#[derive(Clone, Copy, Debug)]
pub struct Creation;

/// Marker type describing an entity modification.
#[derive(Clone, Copy, Debug)]
pub struct Modification;

/// Marker type describing a completion of some work.
#[derive(Clone, Copy, Debug)]
pub struct Completion;

/// Marker type describing a payment.
#[derive(Clone, Copy, Debug)]
pub struct Payment;

/// Marker type describing a deadline.
#[derive(Clone, Copy, Debug)]
pub struct Deadline;

/// Marker type describing an expiration.
#[derive(Clone, Copy, Debug)]
pub struct Expiration;

/// Marker type describing an approval.
#[derive(Clone, Copy, Debug)]
pub struct Approval;

/// Marker type describing a conversion.
#[derive(Clone, Copy, Debug)]
pub struct Conversion;

/// Marker type describing an incident occurrence.
#[derive(Clone, Copy, Debug)]
pub struct Incident;

/// Marker type describing a report filing.
#[derive(Clone, Copy, Debug)]
pub struct Report;

/// Marker type describing an earning accrual.
#[derive(Clone, Copy, Debug)]
pub struct Accrual;
