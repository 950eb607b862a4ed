//! In-app notifications for duebell.
//!
//! Notifications are written by the task lifecycle and the trigger engine and
//! polled by clients. This crate owns the record types, the
//! [`NotificationSink`] seam, the best-effort boundary used for side-effect
//! notifications, and the inbox operations.

pub mod error;
pub mod inbox;
pub mod memory;
pub mod notification;
pub mod sink;

pub use error::NotificationError;
pub use inbox::{Inbox, NotificationInbox};
pub use memory::InMemoryNotificationStore;
pub use notification::{InAppNotification, NewNotification, NotificationKind, UnknownKind};
pub use sink::{NotificationSink, notify_best_effort};
