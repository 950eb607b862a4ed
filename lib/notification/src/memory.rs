//! In-memory notification store.

use crate::error::NotificationError;
use crate::inbox::NotificationInbox;
use crate::notification::{InAppNotification, NewNotification};
use crate::sink::NotificationSink;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duebell_core::{Clock, NotificationId, Result, SystemClock, UserId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// A notification store kept in a `Vec`, for tests and single-process demos.
#[derive(Debug)]
pub struct InMemoryNotificationStore {
    rows: Mutex<Vec<InAppNotification>>,
    clock: Arc<dyn Clock>,
    failing: AtomicBool,
}

impl Default for InMemoryNotificationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryNotificationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates a store that stamps `created_at` from `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            clock,
            failing: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent write fail until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns every stored notification in insertion order.
    #[must_use]
    pub fn all(&self) -> Vec<InAppNotification> {
        self.rows().clone()
    }

    /// Returns the notifications addressed to `recipient`, in insertion order.
    #[must_use]
    pub fn for_recipient(&self, recipient: UserId) -> Vec<InAppNotification> {
        self.rows()
            .iter()
            .filter(|n| n.recipient == recipient)
            .cloned()
            .collect()
    }

    fn rows(&self) -> MutexGuard<'_, Vec<InAppNotification>> {
        self.rows.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_writable(&self) -> Result<(), NotificationError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotificationError::StorageFailed {
                reason: "store is refusing writes".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for InMemoryNotificationStore {
    async fn create(
        &self,
        notification: NewNotification,
    ) -> Result<NotificationId, NotificationError> {
        self.check_writable()?;
        let id = NotificationId::new();
        let row = InAppNotification::stored(id, notification, self.clock.now());
        self.rows().push(row);
        Ok(id)
    }
}

#[async_trait]
impl NotificationInbox for InMemoryNotificationStore {
    async fn list_for(
        &self,
        recipient: UserId,
        unread_only: bool,
        limit: usize,
    ) -> Result<Vec<InAppNotification>, NotificationError> {
        let rows = self.rows();
        let mut out: Vec<InAppNotification> = rows
            .iter()
            .rev()
            .filter(|n| n.recipient == recipient)
            .filter(|n| !unread_only || n.is_unread())
            .cloned()
            .collect();
        // Stable, so equal timestamps keep newest-inserted first.
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out.truncate(limit);
        Ok(out)
    }

    async fn find(
        &self,
        id: NotificationId,
    ) -> Result<Option<InAppNotification>, NotificationError> {
        Ok(self.rows().iter().find(|n| n.id == id).cloned())
    }

    async fn mark_read(
        &self,
        id: NotificationId,
        at: DateTime<Utc>,
    ) -> Result<InAppNotification, NotificationError> {
        self.check_writable()?;
        let mut rows = self.rows();
        let Some(row) = rows.iter_mut().find(|n| n.id == id) else {
            return Err(NotificationError::NotFound { id }.into());
        };
        row.read_at.get_or_insert(at);
        Ok(row.clone())
    }
}
