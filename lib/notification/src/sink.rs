//! The notification sink and the best-effort side-effect boundary.

use crate::error::NotificationError;
use crate::notification::NewNotification;
use async_trait::async_trait;
use duebell_core::{NotificationId, Result};
use std::sync::Arc;
use tracing::warn;

/// Accepts notifications for persistence.
///
/// Sinks do not deduplicate; at-most-once delivery of scheduled notifications
/// is the trigger engine's job.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Stores a notification and returns its ID.
    async fn create(
        &self,
        notification: NewNotification,
    ) -> Result<NotificationId, NotificationError>;
}

#[async_trait]
impl<T: NotificationSink + ?Sized> NotificationSink for Arc<T> {
    async fn create(
        &self,
        notification: NewNotification,
    ) -> Result<NotificationId, NotificationError> {
        (**self).create(notification).await
    }
}

/// Sends a notification that annotates some other, already decided change.
///
/// A failure is reported to the log and swallowed; the caller's primary
/// operation never sees it.
pub async fn notify_best_effort<S: NotificationSink + ?Sized>(
    sink: &S,
    notification: NewNotification,
) -> Option<NotificationId> {
    let kind = notification.kind();
    let recipient = notification.recipient();
    match sink.create(notification).await {
        Ok(id) => Some(id),
        Err(report) => {
            warn!(%kind, %recipient, error = %report, "dropping notification");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryNotificationStore;
    use crate::notification::NotificationKind;
    use duebell_core::UserId;

    fn note(recipient: UserId) -> NewNotification {
        NewNotification::new(NotificationKind::TaskClosed, recipient, "closed", "")
    }

    #[tokio::test]
    async fn best_effort_returns_id_on_success() {
        let store = InMemoryNotificationStore::new();
        let user = UserId::new();

        let id = notify_best_effort(&store, note(user)).await;

        assert!(id.is_some());
        assert_eq!(store.all().len(), 1);
    }

    #[tokio::test]
    async fn best_effort_swallows_failures() {
        let store = InMemoryNotificationStore::new();
        store.set_failing(true);

        let id = notify_best_effort(&store, note(UserId::new())).await;

        assert!(id.is_none());
        assert!(store.all().is_empty());
    }

    #[tokio::test]
    async fn arc_sink_delegates() {
        let store = Arc::new(InMemoryNotificationStore::new());
        let sink: Arc<dyn NotificationSink> = store.clone();

        sink.create(note(UserId::new())).await.unwrap();

        assert_eq!(store.all().len(), 1);
    }
}
