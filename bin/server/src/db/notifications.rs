//! In-app notifications.

use super::{decode, decode_opt};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duebell_core::{Clock, NotificationId, Result, UserId};
use duebell_notification::{
    InAppNotification, NewNotification, NotificationError, NotificationInbox, NotificationKind,
    NotificationSink,
};
use rootcause::Report;
use sqlx::{FromRow, PgPool, Postgres};
use std::sync::Arc;

const COLUMNS: &str =
    "id, kind, recipient_id, title, body, meeting_id, task_id, created_at, read_at";

/// Row type for notification queries.
#[derive(FromRow)]
struct NotificationRow {
    id: String,
    kind: String,
    recipient_id: String,
    title: String,
    body: String,
    meeting_id: Option<String>,
    task_id: Option<String>,
    created_at: DateTime<Utc>,
    read_at: Option<DateTime<Utc>>,
}

impl NotificationRow {
    fn try_into_notification(self) -> sqlx::Result<InAppNotification> {
        Ok(InAppNotification {
            id: decode("notification id", &self.id)?,
            kind: decode::<NotificationKind>("kind", &self.kind)?,
            recipient: decode("recipient id", &self.recipient_id)?,
            title: self.title,
            body: self.body,
            meeting_id: decode_opt("meeting id", self.meeting_id.as_deref())?,
            task_id: decode_opt("task id", self.task_id.as_deref())?,
            created_at: self.created_at,
            read_at: self.read_at,
        })
    }
}

fn failed(err: sqlx::Error) -> Report<NotificationError> {
    NotificationError::StorageFailed {
        reason: err.to_string(),
    }
    .into()
}

/// Inserts a notification through any executor, so the trigger ledger can
/// reuse it inside its transaction.
pub(crate) async fn insert_notification<'e, E>(
    executor: E,
    id: NotificationId,
    notification: &NewNotification,
    created_at: DateTime<Utc>,
) -> sqlx::Result<()>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO in_app_notifications
            (id, kind, recipient_id, title, body, meeting_id, task_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(id.to_string())
    .bind(notification.kind().as_str())
    .bind(notification.recipient().to_string())
    .bind(notification.title())
    .bind(notification.body())
    .bind(notification.meeting_id().map(|m| m.to_string()))
    .bind(notification.task_id().map(|t| t.to_string()))
    .bind(created_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Notifications in `in_app_notifications`.
pub struct PgNotificationStore {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl PgNotificationStore {
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

#[async_trait]
impl NotificationSink for PgNotificationStore {
    async fn create(
        &self,
        notification: NewNotification,
    ) -> Result<NotificationId, NotificationError> {
        let id = NotificationId::new();
        insert_notification(&self.pool, id, &notification, self.clock.now())
            .await
            .map_err(failed)?;
        Ok(id)
    }
}

#[async_trait]
impl NotificationInbox for PgNotificationStore {
    async fn list_for(
        &self,
        recipient: UserId,
        unread_only: bool,
        limit: usize,
    ) -> Result<Vec<InAppNotification>, NotificationError> {
        let rows: Vec<NotificationRow> = sqlx::query_as(&format!(
            r#"
            SELECT {COLUMNS}
            FROM in_app_notifications
            WHERE recipient_id = $1 AND (NOT $2 OR read_at IS NULL)
            ORDER BY created_at DESC, id DESC
            LIMIT $3
            "#
        ))
        .bind(recipient.to_string())
        .bind(unread_only)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(failed)?;

        rows.into_iter()
            .map(|r| r.try_into_notification().map_err(failed))
            .collect()
    }

    async fn find(
        &self,
        id: NotificationId,
    ) -> Result<Option<InAppNotification>, NotificationError> {
        let row: Option<NotificationRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM in_app_notifications WHERE id = $1"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(failed)?;

        row.map(NotificationRow::try_into_notification)
            .transpose()
            .map_err(failed)
    }

    async fn mark_read(
        &self,
        id: NotificationId,
        at: DateTime<Utc>,
    ) -> Result<InAppNotification, NotificationError> {
        let row: Option<NotificationRow> = sqlx::query_as(&format!(
            r#"
            UPDATE in_app_notifications
            SET read_at = COALESCE(read_at, $2)
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id.to_string())
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(failed)?;

        match row {
            Some(r) => r.try_into_notification().map_err(failed),
            None => Err(NotificationError::NotFound { id }.into()),
        }
    }
}
