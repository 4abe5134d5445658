//! Read entities definitions.

pub mod affiliate;
pub mod claim;
pub mod earning;
pub mod notification;
