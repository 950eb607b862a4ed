//! Error types for the tasks crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `TaskError`: Rejected lifecycle transitions and store failures. Directory
//!   failures are wrapped with `StorageFailed` as context.

use duebell_core::{TaskId, UserId};
use std::fmt;

/// Errors from task operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Malformed input. Nothing was changed.
    Validation { reason: String },
    /// The actor may not perform this operation. Nothing was changed.
    PermissionDenied { actor: UserId, reason: &'static str },
    /// The operation does not fit the task's current state. Nothing was changed.
    Conflict { task: TaskId, reason: &'static str },
    /// No task exists with the given ID.
    NotFound { id: TaskId },
    /// A store or directory call failed.
    StorageFailed { reason: String },
}

impl TaskError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    pub(crate) fn denied(actor: UserId, reason: &'static str) -> Self {
        Self::PermissionDenied { actor, reason }
    }

    pub(crate) fn storage(reason: impl Into<String>) -> Self {
        Self::StorageFailed {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation { reason } => write!(f, "invalid task request: {reason}"),
            Self::PermissionDenied { actor, reason } => {
                write!(f, "{actor} is not allowed: {reason}")
            }
            Self::Conflict { task, reason } => write!(f, "conflict on {task}: {reason}"),
            Self::NotFound { id } => write!(f, "task not found: {id}"),
            Self::StorageFailed { reason } => write!(f, "task storage failed: {reason}"),
        }
    }
}

impl std::error::Error for TaskError {}
