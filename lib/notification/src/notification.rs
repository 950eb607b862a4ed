//! Notification records.

use chrono::{DateTime, Utc};
use duebell_core::{MeetingId, NotificationId, TaskId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum title length, in characters.
pub const MAX_TITLE_CHARS: usize = 180;

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    /// A meeting is coming up (or starting now).
    MeetingReminder,
    /// A task's follow-up instant has arrived.
    #[serde(rename = "TASK_FOLLOWUP")]
    TaskFollowUp,
    /// The assignee asked the creator to close a task.
    TaskCloseRequest,
    /// A task was closed.
    TaskClosed,
    /// Someone posted in a task discussion.
    TaskMessage,
}

impl NotificationKind {
    /// Returns the storage name of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MeetingReminder => "MEETING_REMINDER",
            Self::TaskFollowUp => "TASK_FOLLOWUP",
            Self::TaskCloseRequest => "TASK_CLOSE_REQUEST",
            Self::TaskClosed => "TASK_CLOSED",
            Self::TaskMessage => "TASK_MESSAGE",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for an unrecognized notification kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind(pub String);

impl fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown notification kind: {}", self.0)
    }
}

impl std::error::Error for UnknownKind {}

impl FromStr for NotificationKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MEETING_REMINDER" => Ok(Self::MeetingReminder),
            "TASK_FOLLOWUP" => Ok(Self::TaskFollowUp),
            "TASK_CLOSE_REQUEST" => Ok(Self::TaskCloseRequest),
            "TASK_CLOSED" => Ok(Self::TaskClosed),
            "TASK_MESSAGE" => Ok(Self::TaskMessage),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

/// A notification waiting to be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNotification {
    kind: NotificationKind,
    recipient: UserId,
    title: String,
    body: String,
    meeting_id: Option<MeetingId>,
    task_id: Option<TaskId>,
}

impl NewNotification {
    /// Creates a notification, truncating the title to [`MAX_TITLE_CHARS`].
    #[must_use]
    pub fn new(
        kind: NotificationKind,
        recipient: UserId,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        let mut title: String = title.into();
        if let Some((cut, _)) = title.char_indices().nth(MAX_TITLE_CHARS) {
            title.truncate(cut);
        }
        Self {
            kind,
            recipient,
            title,
            body: body.into(),
            meeting_id: None,
            task_id: None,
        }
    }

    /// Correlates the notification with a meeting.
    #[must_use]
    pub fn about_meeting(mut self, id: MeetingId) -> Self {
        self.meeting_id = Some(id);
        self
    }

    /// Correlates the notification with a task.
    #[must_use]
    pub fn about_task(mut self, id: TaskId) -> Self {
        self.task_id = Some(id);
        self
    }

    #[must_use]
    pub fn kind(&self) -> NotificationKind {
        self.kind
    }

    #[must_use]
    pub fn recipient(&self) -> UserId {
        self.recipient
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    #[must_use]
    pub fn meeting_id(&self) -> Option<MeetingId> {
        self.meeting_id
    }

    #[must_use]
    pub fn task_id(&self) -> Option<TaskId> {
        self.task_id
    }
}

/// A stored in-app notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InAppNotification {
    pub id: NotificationId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub recipient: UserId,
    pub title: String,
    pub body: String,
    pub meeting_id: Option<MeetingId>,
    pub task_id: Option<TaskId>,
    pub created_at: DateTime<Utc>,
    /// Set the first time the recipient (or an admin) reads it.
    pub read_at: Option<DateTime<Utc>>,
}

impl InAppNotification {
    /// Materializes a pending notification.
    #[must_use]
    pub fn stored(id: NotificationId, new: NewNotification, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            kind: new.kind,
            recipient: new.recipient,
            title: new.title,
            body: new.body,
            meeting_id: new.meeting_id,
            task_id: new.task_id,
            created_at,
            read_at: None,
        }
    }

    /// Returns true if nobody has read it yet.
    #[must_use]
    pub fn is_unread(&self) -> bool {
        self.read_at.is_none()
    }
}
