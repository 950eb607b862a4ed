//! Collaborator traits for reading and editing the user directory.
//!
//! The hierarchy algorithms only need [`DirectReports`]; assignment pickers
//! and edge writes need the richer [`UserDirectory`].

use crate::error::DirectoryError;
use crate::user::User;
use async_trait::async_trait;
use duebell_core::{Result, UserId};
use std::sync::Arc;

/// Lookup of a manager's direct reports.
#[async_trait]
pub trait DirectReports: Send + Sync {
    /// Returns the users whose manager is `manager`.
    ///
    /// An unknown `manager` has no reports; implementations return an empty
    /// list rather than an error.
    async fn direct_reports_of(&self, manager: UserId) -> Result<Vec<UserId>, DirectoryError>;
}

/// Full user directory.
#[async_trait]
pub trait UserDirectory: DirectReports {
    /// Finds a user by ID.
    async fn find_user(&self, id: UserId) -> Result<Option<User>, DirectoryError>;

    /// Lists every user, active or not.
    async fn list_users(&self) -> Result<Vec<User>, DirectoryError>;

    /// Overwrites the manager pointer of `employee`.
    ///
    /// Implementations must refuse an edge that would make `employee` an
    /// ancestor of `manager` with [`DirectoryError::EdgeRejected`], checking
    /// and writing as one step so that concurrent edits cannot close a loop.
    /// Callers normally go through
    /// [`HierarchyGraph::reassign_manager`](crate::HierarchyGraph::reassign_manager).
    async fn set_manager(
        &self,
        employee: UserId,
        manager: Option<UserId>,
    ) -> Result<(), DirectoryError>;
}

#[async_trait]
impl<T: DirectReports + ?Sized> DirectReports for Arc<T> {
    async fn direct_reports_of(&self, manager: UserId) -> Result<Vec<UserId>, DirectoryError> {
        (**self).direct_reports_of(manager).await
    }
}

#[async_trait]
impl<T: UserDirectory + ?Sized> UserDirectory for Arc<T> {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, DirectoryError> {
        (**self).find_user(id).await
    }

    async fn list_users(&self) -> Result<Vec<User>, DirectoryError> {
        (**self).list_users().await
    }

    async fn set_manager(
        &self,
        employee: UserId,
        manager: Option<UserId>,
    ) -> Result<(), DirectoryError> {
        (**self).set_manager(employee, manager).await
    }
}
