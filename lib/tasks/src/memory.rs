//! In-memory task store.

use crate::discussion::TaskMessage;
use crate::error::TaskError;
use crate::repository::{TaskMessageRepository, TaskRepository};
use crate::task::{Task, TaskListing};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duebell_core::{Result, TaskId, UserId};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Tables {
    tasks: HashMap<TaskId, Task>,
    messages: Vec<TaskMessage>,
}

/// Tasks and their messages kept in memory.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tables: Mutex<Tables>,
}

impl InMemoryTaskStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskStore {
    async fn find(&self, id: TaskId) -> Result<Option<Task>, TaskError> {
        Ok(self.tables().tasks.get(&id).cloned())
    }

    async fn insert(&self, task: &Task) -> Result<(), TaskError> {
        self.tables().tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn update(&self, task: &Task) -> Result<(), TaskError> {
        let mut tables = self.tables();
        match tables.tasks.get_mut(&task.id) {
            Some(slot) => {
                *slot = task.clone();
                Ok(())
            }
            None => Err(TaskError::NotFound { id: task.id }.into()),
        }
    }

    async fn delete(&self, id: TaskId) -> Result<(), TaskError> {
        let mut tables = self.tables();
        tables.tasks.remove(&id);
        tables.messages.retain(|m| m.task_id != id);
        Ok(())
    }

    async fn list_for(&self, user: UserId, listing: TaskListing) -> Result<Vec<Task>, TaskError> {
        let mut out: Vec<Task> = self
            .tables()
            .tasks
            .values()
            .filter(|t| listing.matches(t, user))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(out)
    }

    async fn list_due_for_follow_up(
        &self,
        now: DateTime<Utc>,
        earliest: DateTime<Utc>,
    ) -> Result<Vec<Task>, TaskError> {
        let mut out: Vec<Task> = self
            .tables()
            .tasks
            .values()
            .filter(|t| t.status.is_open())
            .filter(|t| t.follow_up_at.is_some_and(|at| (earliest..=now).contains(&at)))
            .cloned()
            .collect();
        out.sort_by_key(|t| (t.follow_up_at, t.id));
        Ok(out)
    }
}

#[async_trait]
impl TaskMessageRepository for InMemoryTaskStore {
    async fn insert_message(&self, message: &TaskMessage) -> Result<(), TaskError> {
        self.tables().messages.push(message.clone());
        Ok(())
    }

    async fn list_messages(&self, task: TaskId) -> Result<Vec<TaskMessage>, TaskError> {
        Ok(self
            .tables()
            .messages
            .iter()
            .filter(|m| m.task_id == task)
            .cloned()
            .collect())
    }
}
