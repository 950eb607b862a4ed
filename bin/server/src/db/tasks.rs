//! Tasks and task messages.

use super::{decode, decode_opt};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use duebell_core::{Result, TaskId, UserId};
use duebell_tasks::{
    Task, TaskError, TaskListing, TaskMessage, TaskMessageRepository, TaskPriority,
    TaskRepository, TaskStatus,
};
use rootcause::Report;
use sqlx::{FromRow, PgPool};
use tracing::instrument;

const TASK_COLUMNS: &str = "id, title, status, priority, date, assignee_id, created_by, \
     close_requested, close_requested_at, closed_at, closed_by, follow_up_at, created_at";

/// Row type for task queries.
#[derive(FromRow)]
struct TaskRow {
    id: String,
    title: String,
    status: String,
    priority: String,
    date: Option<NaiveDate>,
    assignee_id: String,
    created_by: String,
    close_requested: bool,
    close_requested_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
    closed_by: Option<String>,
    follow_up_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TaskRow {
    fn try_into_task(self) -> sqlx::Result<Task> {
        Ok(Task {
            id: decode("task id", &self.id)?,
            title: self.title,
            status: decode::<TaskStatus>("status", &self.status)?,
            priority: decode::<TaskPriority>("priority", &self.priority)?,
            date: self.date,
            assignee: decode("assignee id", &self.assignee_id)?,
            created_by: decode("creator id", &self.created_by)?,
            close_requested: self.close_requested,
            close_requested_at: self.close_requested_at,
            closed_at: self.closed_at,
            closed_by: decode_opt("closer id", self.closed_by.as_deref())?,
            follow_up_at: self.follow_up_at,
            created_at: self.created_at,
        })
    }
}

/// Row type for message queries.
#[derive(FromRow)]
struct MessageRow {
    id: String,
    task_id: String,
    sender_id: String,
    body: String,
    created_at: DateTime<Utc>,
}

impl MessageRow {
    fn try_into_message(self) -> sqlx::Result<TaskMessage> {
        Ok(TaskMessage {
            id: decode("message id", &self.id)?,
            task_id: decode("task id", &self.task_id)?,
            sender: decode("sender id", &self.sender_id)?,
            body: self.body,
            created_at: self.created_at,
        })
    }
}

fn failed(err: sqlx::Error) -> Report<TaskError> {
    TaskError::StorageFailed {
        reason: err.to_string(),
    }
    .into()
}

fn into_tasks(rows: Vec<TaskRow>) -> Result<Vec<Task>, TaskError> {
    rows.into_iter()
        .map(|r| r.try_into_task().map_err(failed))
        .collect()
}

/// The filter for a listing. `$1` is the user.
fn listing_filter(listing: TaskListing) -> &'static str {
    match listing {
        TaskListing::Visible => "assignee_id = $1 OR created_by = $1",
        TaskListing::Assigned => "assignee_id = $1",
        TaskListing::Created => "created_by = $1",
        TaskListing::Done => "assignee_id = $1 AND status = 'DONE'",
    }
}

/// Tasks in the `tasks` table, messages in `task_messages`.
#[derive(Debug, Clone)]
pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRepository for PgTaskStore {
    async fn find(&self, id: TaskId) -> Result<Option<Task>, TaskError> {
        let row: Option<TaskRow> =
            sqlx::query_as(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(failed)?;
        row.map(TaskRow::try_into_task).transpose().map_err(failed)
    }

    #[instrument(skip_all, fields(task = %task.id))]
    async fn insert(&self, task: &Task) -> Result<(), TaskError> {
        sqlx::query(
            r#"
            INSERT INTO tasks (id, title, status, priority, date, assignee_id, created_by,
                close_requested, close_requested_at, closed_at, closed_by, follow_up_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(task.id.to_string())
        .bind(&task.title)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.date)
        .bind(task.assignee.to_string())
        .bind(task.created_by.to_string())
        .bind(task.close_requested)
        .bind(task.close_requested_at)
        .bind(task.closed_at)
        .bind(task.closed_by.map(|u| u.to_string()))
        .bind(task.follow_up_at)
        .bind(task.created_at)
        .execute(&self.pool)
        .await
        .map_err(failed)?;
        Ok(())
    }

    #[instrument(skip_all, fields(task = %task.id))]
    async fn update(&self, task: &Task) -> Result<(), TaskError> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET title = $2, status = $3, priority = $4, date = $5, assignee_id = $6,
                close_requested = $7, close_requested_at = $8, closed_at = $9,
                closed_by = $10, follow_up_at = $11
            WHERE id = $1
            "#,
        )
        .bind(task.id.to_string())
        .bind(&task.title)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.date)
        .bind(task.assignee.to_string())
        .bind(task.close_requested)
        .bind(task.close_requested_at)
        .bind(task.closed_at)
        .bind(task.closed_by.map(|u| u.to_string()))
        .bind(task.follow_up_at)
        .execute(&self.pool)
        .await
        .map_err(failed)?;

        if result.rows_affected() == 0 {
            return Err(TaskError::NotFound { id: task.id }.into());
        }
        Ok(())
    }

    async fn delete(&self, id: TaskId) -> Result<(), TaskError> {
        // task_messages rows go with it (ON DELETE CASCADE).
        sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(failed)?;
        Ok(())
    }

    async fn list_for(&self, user: UserId, listing: TaskListing) -> Result<Vec<Task>, TaskError> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE {} ORDER BY created_at DESC, id DESC",
            listing_filter(listing)
        );
        let rows: Vec<TaskRow> = sqlx::query_as(&sql)
            .bind(user.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(failed)?;
        into_tasks(rows)
    }

    async fn list_due_for_follow_up(
        &self,
        now: DateTime<Utc>,
        earliest: DateTime<Utc>,
    ) -> Result<Vec<Task>, TaskError> {
        let rows: Vec<TaskRow> = sqlx::query_as(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE status <> 'DONE'
              AND follow_up_at IS NOT NULL
              AND follow_up_at >= $2
              AND follow_up_at <= $1
            ORDER BY follow_up_at, id
            "#
        ))
        .bind(now)
        .bind(earliest)
        .fetch_all(&self.pool)
        .await
        .map_err(failed)?;
        into_tasks(rows)
    }
}

#[async_trait]
impl TaskMessageRepository for PgTaskStore {
    async fn insert_message(&self, message: &TaskMessage) -> Result<(), TaskError> {
        sqlx::query(
            r#"
            INSERT INTO task_messages (id, task_id, sender_id, body, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(message.id.to_string())
        .bind(message.task_id.to_string())
        .bind(message.sender.to_string())
        .bind(&message.body)
        .bind(message.created_at)
        .execute(&self.pool)
        .await
        .map_err(failed)?;
        Ok(())
    }

    async fn list_messages(&self, task: TaskId) -> Result<Vec<TaskMessage>, TaskError> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            r#"
            SELECT id, task_id, sender_id, body, created_at
            FROM task_messages
            WHERE task_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(task.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(failed)?;
        rows.into_iter()
            .map(|r| r.try_into_message().map_err(failed))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_filters_bind_only_the_user() {
        for listing in [
            TaskListing::Visible,
            TaskListing::Assigned,
            TaskListing::Created,
            TaskListing::Done,
        ] {
            let filter = listing_filter(listing);
            assert!(filter.contains("$1"));
            assert!(!filter.contains("$2"));
        }
        assert!(listing_filter(TaskListing::Done).contains("'DONE'"));
    }
}
