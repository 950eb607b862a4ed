//! The dedup ledger and the outbox that pairs a ledger record with its
//! notification.
//!
//! The outbox is the unit of at-most-once delivery. A database outbox writes
//! the ledger row and the notification in one transaction. [`ClaimFirst`]
//! composes a ledger and a sink that cannot share a transaction. It records
//! the claim first, so a crash or sink failure after the claim loses that
//! notification instead of sending it twice.

use crate::error::LedgerError;
use crate::key::TriggerKey;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duebell_core::{NotificationId, Result};
use duebell_notification::{NewNotification, NotificationSink};
use rootcause::prelude::ResultExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

/// Outcome of recording a fired trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded,
    /// Another run recorded this key first.
    AlreadyFired,
}

/// Outcome of delivering through the outbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered(NotificationId),
    AlreadyFired,
}

/// Durable set of trigger keys that have fired.
#[async_trait]
pub trait DedupLedger: Send + Sync {
    async fn has_fired(&self, key: &TriggerKey) -> Result<bool, LedgerError>;

    /// Inserts the key unless present. Concurrent callers for one key see
    /// exactly one `Recorded`.
    async fn record_fired(
        &self,
        key: &TriggerKey,
        fired_at: DateTime<Utc>,
    ) -> Result<RecordOutcome, LedgerError>;
}

/// Records a trigger and stores its notification as one unit.
#[async_trait]
pub trait TriggerOutbox: DedupLedger {
    async fn deliver_once(
        &self,
        key: &TriggerKey,
        fired_at: DateTime<Utc>,
        notification: NewNotification,
    ) -> Result<Delivery, LedgerError>;
}

#[async_trait]
impl<T: DedupLedger + ?Sized> DedupLedger for Arc<T> {
    async fn has_fired(&self, key: &TriggerKey) -> Result<bool, LedgerError> {
        (**self).has_fired(key).await
    }

    async fn record_fired(
        &self,
        key: &TriggerKey,
        fired_at: DateTime<Utc>,
    ) -> Result<RecordOutcome, LedgerError> {
        (**self).record_fired(key, fired_at).await
    }
}

#[async_trait]
impl<T: TriggerOutbox + ?Sized> TriggerOutbox for Arc<T> {
    async fn deliver_once(
        &self,
        key: &TriggerKey,
        fired_at: DateTime<Utc>,
        notification: NewNotification,
    ) -> Result<Delivery, LedgerError> {
        (**self).deliver_once(key, fired_at, notification).await
    }
}

/// An outbox over a separate ledger and sink.
pub struct ClaimFirst<L, S> {
    ledger: L,
    sink: S,
}

impl<L, S> ClaimFirst<L, S> {
    pub fn new(ledger: L, sink: S) -> Self {
        Self { ledger, sink }
    }
}

#[async_trait]
impl<L: DedupLedger, S: NotificationSink> DedupLedger for ClaimFirst<L, S> {
    async fn has_fired(&self, key: &TriggerKey) -> Result<bool, LedgerError> {
        self.ledger.has_fired(key).await
    }

    async fn record_fired(
        &self,
        key: &TriggerKey,
        fired_at: DateTime<Utc>,
    ) -> Result<RecordOutcome, LedgerError> {
        self.ledger.record_fired(key, fired_at).await
    }
}

#[async_trait]
impl<L: DedupLedger, S: NotificationSink> TriggerOutbox for ClaimFirst<L, S> {
    async fn deliver_once(
        &self,
        key: &TriggerKey,
        fired_at: DateTime<Utc>,
        notification: NewNotification,
    ) -> Result<Delivery, LedgerError> {
        if self.ledger.record_fired(key, fired_at).await? == RecordOutcome::AlreadyFired {
            return Ok(Delivery::AlreadyFired);
        }
        match self.sink.create(notification).await {
            Ok(id) => Ok(Delivery::Delivered(id)),
            Err(report) => {
                warn!(%key, error = %report, "trigger claimed but notification not stored");
                Err(report).context(LedgerError::NotificationLost {
                    key: key.to_string(),
                })
            }
        }
    }
}

/// A ledger kept in memory.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    fired: Mutex<HashMap<TriggerKey, DateTime<Utc>>>,
}

impl InMemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// When the key fired, if it has.
    #[must_use]
    pub fn fired_at(&self, key: &TriggerKey) -> Option<DateTime<Utc>> {
        self.rows().get(key).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }

    fn rows(&self) -> MutexGuard<'_, HashMap<TriggerKey, DateTime<Utc>>> {
        self.fired.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl DedupLedger for InMemoryLedger {
    async fn has_fired(&self, key: &TriggerKey) -> Result<bool, LedgerError> {
        Ok(self.rows().contains_key(key))
    }

    async fn record_fired(
        &self,
        key: &TriggerKey,
        fired_at: DateTime<Utc>,
    ) -> Result<RecordOutcome, LedgerError> {
        let mut rows = self.rows();
        if rows.contains_key(key) {
            return Ok(RecordOutcome::AlreadyFired);
        }
        rows.insert(*key, fired_at);
        Ok(RecordOutcome::Recorded)
    }
}
