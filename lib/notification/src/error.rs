//! Error types for the notification crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `NotificationError`: Failures of the notification store and inbox

use duebell_core::{NotificationId, UserId};
use std::fmt;

/// Errors from notification operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    /// No notification exists with the given ID.
    NotFound { id: NotificationId },
    /// The actor may not touch another user's notification.
    PermissionDenied { actor: UserId, id: NotificationId },
    /// The backing store failed.
    StorageFailed { reason: String },
}

impl fmt::Display for NotificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { id } => write!(f, "notification not found: {id}"),
            Self::PermissionDenied { actor, id } => {
                write!(f, "{actor} may not access notification {id}")
            }
            Self::StorageFailed { reason } => {
                write!(f, "notification storage failed: {reason}")
            }
        }
    }
}

impl std::error::Error for NotificationError {}
