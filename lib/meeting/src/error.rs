//! Error types for the meeting crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `MeetingError`: Rejected drafts, missing meetings, and store failures

use duebell_core::MeetingId;
use std::fmt;

/// Errors from meeting operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeetingError {
    /// A draft field is missing or malformed.
    Validation { field: &'static str, reason: String },
    /// No meeting with this ID is visible to the caller.
    NotFound { id: MeetingId },
    /// The backing store failed.
    StorageFailed { reason: String },
}

impl MeetingError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for MeetingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation { field, reason } => write!(f, "invalid {field}: {reason}"),
            Self::NotFound { id } => write!(f, "meeting not found: {id}"),
            Self::StorageFailed { reason } => write!(f, "meeting storage failed: {reason}"),
        }
    }
}

impl std::error::Error for MeetingError {}
