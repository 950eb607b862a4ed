//! Storage seams for tasks and task messages.

use crate::discussion::TaskMessage;
use crate::error::TaskError;
use crate::task::{Task, TaskListing};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duebell_core::{Result, TaskId, UserId};
use std::sync::Arc;

/// Persistence for tasks.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn find(&self, id: TaskId) -> Result<Option<Task>, TaskError>;

    async fn insert(&self, task: &Task) -> Result<(), TaskError>;

    /// Replaces a stored task.
    async fn update(&self, task: &Task) -> Result<(), TaskError>;

    /// Deletes a task and its messages.
    async fn delete(&self, id: TaskId) -> Result<(), TaskError>;

    /// Lists a user's tasks, newest first.
    async fn list_for(&self, user: UserId, listing: TaskListing) -> Result<Vec<Task>, TaskError>;

    /// Lists open tasks whose follow-up instant lies within `earliest..=now`,
    /// oldest follow-up first.
    async fn list_due_for_follow_up(
        &self,
        now: DateTime<Utc>,
        earliest: DateTime<Utc>,
    ) -> Result<Vec<Task>, TaskError>;
}

/// Persistence for task discussion messages.
#[async_trait]
pub trait TaskMessageRepository: Send + Sync {
    async fn insert_message(&self, message: &TaskMessage) -> Result<(), TaskError>;

    /// Lists a task's messages, oldest first.
    async fn list_messages(&self, task: TaskId) -> Result<Vec<TaskMessage>, TaskError>;
}

#[async_trait]
impl<T: TaskRepository + ?Sized> TaskRepository for Arc<T> {
    async fn find(&self, id: TaskId) -> Result<Option<Task>, TaskError> {
        (**self).find(id).await
    }

    async fn insert(&self, task: &Task) -> Result<(), TaskError> {
        (**self).insert(task).await
    }

    async fn update(&self, task: &Task) -> Result<(), TaskError> {
        (**self).update(task).await
    }

    async fn delete(&self, id: TaskId) -> Result<(), TaskError> {
        (**self).delete(id).await
    }

    async fn list_for(&self, user: UserId, listing: TaskListing) -> Result<Vec<Task>, TaskError> {
        (**self).list_for(user, listing).await
    }

    async fn list_due_for_follow_up(
        &self,
        now: DateTime<Utc>,
        earliest: DateTime<Utc>,
    ) -> Result<Vec<Task>, TaskError> {
        (**self).list_due_for_follow_up(now, earliest).await
    }
}
