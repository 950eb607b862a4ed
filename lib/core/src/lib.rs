//! Core domain types and utilities for duebell.
//!
//! This crate provides the identifiers, error alias, and clock shared by the
//! hierarchy, task lifecycle, meeting, notification, and scheduler crates.

pub mod clock;
pub mod error;
pub mod id;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::Result;
pub use id::{MeetingId, NotificationId, ParseIdError, TaskId, TaskMessageId, UserId};
