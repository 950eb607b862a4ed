//! Error types for the org crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `DirectoryError`: Failures of the user directory collaborator
//! - `HierarchyError`: Rejected hierarchy edits (wraps directory failures via context)

use duebell_core::UserId;
use std::fmt;

/// Errors from user directory operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// No user exists with the given ID.
    UserNotFound { id: UserId },
    /// The store refused a manager edge that would close a loop.
    EdgeRejected { employee: UserId, manager: UserId },
    /// The backing store failed.
    StorageFailed { reason: String },
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserNotFound { id } => write!(f, "user not found: {id}"),
            Self::EdgeRejected { employee, manager } => {
                write!(f, "refused manager edge {manager} -> {employee}")
            }
            Self::StorageFailed { reason } => write!(f, "user directory storage failed: {reason}"),
        }
    }
}

impl std::error::Error for DirectoryError {}

/// Errors from hierarchy edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    /// Assigning the manager would make the employee an ancestor of its own manager.
    WouldCreateCycle { employee: UserId, manager: UserId },
    /// The proposed manager does not exist.
    ManagerNotFound { manager: UserId },
    /// A directory lookup failed while evaluating the edit (use as context wrapper).
    Lookup { employee: UserId },
}

impl fmt::Display for HierarchyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WouldCreateCycle { employee, manager } => {
                write!(f, "making {manager} the manager of {employee} would create a cycle")
            }
            Self::ManagerNotFound { manager } => write!(f, "manager not found: {manager}"),
            Self::Lookup { employee } => {
                write!(f, "hierarchy lookup failed while editing {employee}")
            }
        }
    }
}

impl std::error::Error for HierarchyError {}
