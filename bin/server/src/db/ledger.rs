//! The trigger ledger, and the outbox that commits a ledger row together
//! with its notification.

use super::notifications::insert_notification;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duebell_core::{Clock, NotificationId, Result};
use duebell_notification::NewNotification;
use duebell_scheduler::{DedupLedger, Delivery, LedgerError, RecordOutcome, TriggerKey, TriggerOutbox};
use rootcause::Report;
use sqlx::{PgPool, Postgres};
use std::sync::Arc;
use tracing::instrument;

fn failed(err: sqlx::Error) -> Report<LedgerError> {
    LedgerError::StorageFailed {
        reason: err.to_string(),
    }
    .into()
}

/// Inserts the ledger row unless the key is taken. Returns whether it
/// inserted.
async fn claim<'e, E>(
    executor: E,
    key: &TriggerKey,
    fired_at: DateTime<Utc>,
    notification: Option<NotificationId>,
) -> sqlx::Result<bool>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO trigger_ledger (subject_kind, subject_id, offset_key, fired_at, notification_id)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (subject_kind, subject_id, offset_key) DO NOTHING
        "#,
    )
    .bind(key.subject.kind())
    .bind(key.subject.to_string())
    .bind(key.offset.storage_key())
    .bind(fired_at)
    .bind(notification.map(|n| n.to_string()))
    .execute(executor)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Fired triggers in `trigger_ledger`.
pub struct PgTriggerLedger {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl PgTriggerLedger {
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

#[async_trait]
impl DedupLedger for PgTriggerLedger {
    async fn has_fired(&self, key: &TriggerKey) -> Result<bool, LedgerError> {
        let found: Option<(i32,)> = sqlx::query_as(
            r#"
            SELECT 1
            FROM trigger_ledger
            WHERE subject_kind = $1 AND subject_id = $2 AND offset_key = $3
            "#,
        )
        .bind(key.subject.kind())
        .bind(key.subject.to_string())
        .bind(key.offset.storage_key())
        .fetch_optional(&self.pool)
        .await
        .map_err(failed)?;
        Ok(found.is_some())
    }

    async fn record_fired(
        &self,
        key: &TriggerKey,
        fired_at: DateTime<Utc>,
    ) -> Result<RecordOutcome, LedgerError> {
        let inserted = claim(&self.pool, key, fired_at, None)
            .await
            .map_err(failed)?;
        Ok(if inserted {
            RecordOutcome::Recorded
        } else {
            RecordOutcome::AlreadyFired
        })
    }
}

#[async_trait]
impl TriggerOutbox for PgTriggerLedger {
    /// Both rows commit or neither does. Losing the insert race rolls back
    /// and reports the trigger as already fired.
    #[instrument(skip(self, notification), fields(%key))]
    async fn deliver_once(
        &self,
        key: &TriggerKey,
        fired_at: DateTime<Utc>,
        notification: NewNotification,
    ) -> Result<Delivery, LedgerError> {
        let id = NotificationId::new();
        let mut tx = self.pool.begin().await.map_err(failed)?;

        if !claim(&mut *tx, key, fired_at, Some(id)).await.map_err(failed)? {
            tx.rollback().await.map_err(failed)?;
            return Ok(Delivery::AlreadyFired);
        }
        insert_notification(&mut *tx, id, &notification, self.clock.now())
            .await
            .map_err(failed)?;
        tx.commit().await.map_err(failed)?;
        Ok(Delivery::Delivered(id))
    }
}
