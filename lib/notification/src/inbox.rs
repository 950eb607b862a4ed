//! Reading and acknowledging in-app notifications.

use crate::error::NotificationError;
use crate::notification::InAppNotification;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duebell_core::{Clock, NotificationId, Result, UserId};
use duebell_org::User;
use std::sync::Arc;
use tracing::instrument;

/// How many notifications `list_mine` returns.
pub const LIST_LIMIT: usize = 200;
/// How many unread notifications `list_mine` returns.
pub const UNREAD_LIST_LIMIT: usize = 50;

/// Storage side of the inbox.
#[async_trait]
pub trait NotificationInbox: Send + Sync {
    /// Lists a recipient's notifications, newest first.
    async fn list_for(
        &self,
        recipient: UserId,
        unread_only: bool,
        limit: usize,
    ) -> Result<Vec<InAppNotification>, NotificationError>;

    /// Finds a notification by ID.
    async fn find(
        &self,
        id: NotificationId,
    ) -> Result<Option<InAppNotification>, NotificationError>;

    /// Stamps `read_at` unless it is already set, and returns the stored row.
    async fn mark_read(
        &self,
        id: NotificationId,
        at: DateTime<Utc>,
    ) -> Result<InAppNotification, NotificationError>;
}

/// User-facing inbox operations.
#[derive(Debug)]
pub struct Inbox<S: ?Sized> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: NotificationInbox + ?Sized> Inbox<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Lists the user's own notifications, newest first.
    pub async fn list_mine(
        &self,
        user: &User,
        unread_only: bool,
    ) -> Result<Vec<InAppNotification>, NotificationError> {
        let limit = if unread_only {
            UNREAD_LIST_LIMIT
        } else {
            LIST_LIMIT
        };
        self.store.list_for(user.id(), unread_only, limit).await
    }

    /// Marks a notification as read.
    ///
    /// Only the recipient or an administrator may do this. Marking twice keeps
    /// the first timestamp.
    #[instrument(skip(self, actor), fields(actor = %actor.id()))]
    pub async fn mark_read(
        &self,
        actor: &User,
        id: NotificationId,
    ) -> Result<InAppNotification, NotificationError> {
        let Some(notification) = self.store.find(id).await? else {
            return Err(NotificationError::NotFound { id }.into());
        };
        if !actor.is_admin() && notification.recipient != actor.id() {
            return Err(NotificationError::PermissionDenied {
                actor: actor.id(),
                id,
            }
            .into());
        }
        if notification.read_at.is_some() {
            return Ok(notification);
        }
        self.store.mark_read(id, self.clock.now()).await
    }
}
