//! Data models for Rollcall

mod admin;
mod attendee;
mod event;

pub use admin::*;
pub use attendee::*;
pub use event::*;
