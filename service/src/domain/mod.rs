//! Domain definitions.

pub mod access;
pub mod affiliate;
pub mod claim;
pub mod earning;
pub mod firm;
pub mod notification;
pub mod user;

pub use self::{
    access::Actor, claim::Claim, earning::Earning, firm::Firm,
    notification::Notification, user::User,
};

common::define_kind! {
    #[doc = "Decision made upon a pending request."]
    enum Decision {
        #[doc = "The request is accepted."]
        Approve,

        #[doc = "The request is declined."]
        Reject,
    }
}
