//! Task domain types and request payloads.

use chrono::{DateTime, NaiveDate, Utc};
use duebell_core::{TaskId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum title length, in characters.
pub const MAX_TITLE_CHARS: usize = 200;

/// Work status. Only `Done` is terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "TODO",
            Self::InProgress => "IN_PROGRESS",
            Self::Done => "DONE",
        }
    }

    /// Returns true for any status but `Done`.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Done)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

/// Error returned for an unrecognized status or priority name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownValue(pub String);

impl fmt::Display for UnknownValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value: {}", self.0)
    }
}

impl std::error::Error for UnknownValue {}

impl FromStr for TaskStatus {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TODO" => Ok(Self::Todo),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "DONE" => Ok(Self::Done),
            other => Err(UnknownValue(other.to_string())),
        }
    }
}

impl FromStr for TaskPriority {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            other => Err(UnknownValue(other.to_string())),
        }
    }
}

/// A unit of work assigned by one user to another (or to themselves).
///
/// The close fields record the two-step approval: the assignee requests
/// closure and the creator (or an admin) closes. `follow_up_at` is the
/// creator's reminder to check back; follow-up is enabled exactly when it is
/// set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub date: Option<NaiveDate>,
    pub assignee: UserId,
    pub created_by: UserId,
    pub close_requested: bool,
    pub close_requested_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_by: Option<UserId>,
    pub follow_up_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }

    #[must_use]
    pub fn follow_up_enabled(&self) -> bool {
        self.follow_up_at.is_some()
    }

    #[must_use]
    pub fn is_creator(&self, user: UserId) -> bool {
        self.created_by == user
    }

    #[must_use]
    pub fn is_assignee(&self, user: UserId) -> bool {
        self.assignee == user
    }
}

/// Input for creating a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    pub assignee: UserId,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Defaults to `Todo`. `Done` is rejected.
    #[serde(default)]
    pub status: Option<TaskStatus>,
    /// Defaults to `Medium`.
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub follow_up_enabled: bool,
    #[serde(default)]
    pub follow_up_at: Option<DateTime<Utc>>,
}

impl NewTask {
    /// Creates a request with defaults for everything but title and assignee.
    #[must_use]
    pub fn new(title: impl Into<String>, assignee: UserId) -> Self {
        Self {
            title: title.into(),
            assignee,
            date: None,
            status: None,
            priority: None,
            follow_up_enabled: false,
            follow_up_at: None,
        }
    }
}

/// A partial update. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskPatch {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    #[serde(rename = "assigneeId")]
    pub assignee: Option<UserId>,
    /// `false` clears the follow-up instant.
    pub follow_up_enabled: Option<bool>,
    /// Setting an instant also enables follow-up.
    pub follow_up_at: Option<DateTime<Utc>>,
}

impl TaskPatch {
    /// Returns true if the patch touches anything besides `status`.
    #[must_use]
    pub fn touches_more_than_status(&self) -> bool {
        self.priority.is_some()
            || self.assignee.is_some()
            || self.follow_up_enabled.is_some()
            || self.follow_up_at.is_some()
    }
}

/// Which of a user's tasks to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskListing {
    /// Assigned to or created by the user.
    Visible,
    Assigned,
    Created,
    /// Assigned to the user and done.
    Done,
}

impl TaskListing {
    /// Returns true if `task` belongs in this listing for `user`.
    #[must_use]
    pub fn matches(&self, task: &Task, user: UserId) -> bool {
        match self {
            Self::Visible => task.is_assignee(user) || task.is_creator(user),
            Self::Assigned => task.is_assignee(user),
            Self::Created => task.is_creator(user),
            Self::Done => task.is_assignee(user) && task.is_done(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_and_priority_names() {
        assert_eq!("IN_PROGRESS".parse::<TaskStatus>(), Ok(TaskStatus::InProgress));
        assert_eq!(TaskStatus::default(), TaskStatus::Todo);
        assert_eq!(TaskPriority::default(), TaskPriority::Medium);
        assert!(!TaskStatus::Done.is_open());
        assert!("CLOSED".parse::<TaskStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&TaskPriority::High).expect("serialize"),
            "\"HIGH\""
        );
    }

    #[test]
    fn patch_scope_detection() {
        let status_only = TaskPatch {
            status: Some(TaskStatus::InProgress),
            ..TaskPatch::default()
        };
        assert!(!status_only.touches_more_than_status());

        let with_priority = TaskPatch {
            priority: Some(TaskPriority::High),
            ..status_only
        };
        assert!(with_priority.touches_more_than_status());
    }

    #[test]
    fn patch_deserializes_client_field_names() {
        let assignee = UserId::new();
        let json = format!(
            r#"{{"assigneeId":"{}","followUpEnabled":false}}"#,
            assignee.as_ulid()
        );
        let patch: TaskPatch = serde_json::from_str(&json).expect("parse");
        assert_eq!(patch.assignee, Some(assignee));
        assert_eq!(patch.follow_up_enabled, Some(false));
        assert_eq!(patch.status, None);
    }
}
