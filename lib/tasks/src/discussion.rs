//! Task discussion: messages between a task's creator and assignee.
//!
//! Admins can read and post too. Posting notifies the other participants.

use crate::error::TaskError;
use crate::lifecycle::{can_access, display_name};
use crate::repository::{TaskMessageRepository, TaskRepository};
use crate::task::Task;
use chrono::{DateTime, Utc};
use duebell_core::{Clock, Result, TaskId, TaskMessageId, UserId};
use duebell_notification::{NewNotification, NotificationKind, NotificationSink, notify_best_effort};
use duebell_org::User;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

/// Longest accepted message body, in characters.
pub const MAX_BODY_CHARS: usize = 4000;
/// Length of the body excerpt carried in notifications, in characters.
pub const PREVIEW_CHARS: usize = 220;

/// A message posted on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMessage {
    pub id: TaskMessageId,
    pub task_id: TaskId,
    pub sender: UserId,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Posting and reading task messages.
pub struct TaskDiscussion {
    tasks: Arc<dyn TaskRepository>,
    messages: Arc<dyn TaskMessageRepository>,
    notifications: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
}

impl TaskDiscussion {
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        messages: Arc<dyn TaskMessageRepository>,
        notifications: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tasks,
            messages,
            notifications,
            clock,
        }
    }

    /// Lists a task's messages, oldest first.
    pub async fn list(&self, actor: &User, task: TaskId) -> Result<Vec<TaskMessage>, TaskError> {
        self.accessible_task(actor, task).await?;
        self.messages.list_messages(task).await
    }

    /// Posts a message and notifies the creator and assignee, minus the sender.
    #[instrument(skip(self, actor, body), fields(actor = %actor.id()))]
    pub async fn post(&self, actor: &User, task: TaskId, body: &str) -> Result<TaskMessage, TaskError> {
        let task = self.accessible_task(actor, task).await?;
        let body = body.trim();
        if body.is_empty() {
            return Err(TaskError::invalid("message body is required").into());
        }
        if body.chars().count() > MAX_BODY_CHARS {
            return Err(TaskError::invalid(format!(
                "message must be at most {MAX_BODY_CHARS} characters"
            ))
            .into());
        }

        let message = TaskMessage {
            id: TaskMessageId::new(),
            task_id: task.id,
            sender: actor.id(),
            body: body.to_string(),
            created_at: self.clock.now(),
        };
        self.messages.insert_message(&message).await?;

        let preview = preview(actor, body);
        for recipient in recipients(&task, actor.id()) {
            let note = NewNotification::new(
                NotificationKind::TaskMessage,
                recipient,
                format!("New message on task: {}", task.title),
                preview.clone(),
            )
            .about_task(task.id);
            notify_best_effort(self.notifications.as_ref(), note).await;
        }
        Ok(message)
    }

    async fn accessible_task(&self, actor: &User, id: TaskId) -> Result<Task, TaskError> {
        let Some(task) = self.tasks.find(id).await? else {
            return Err(TaskError::NotFound { id }.into());
        };
        if !can_access(actor, &task) {
            return Err(TaskError::denied(actor.id(), "not a participant of this task").into());
        }
        Ok(task)
    }
}

/// Creator then assignee, deduplicated, without the sender.
fn recipients(task: &Task, sender: UserId) -> Vec<UserId> {
    let mut out = vec![task.created_by];
    if task.assignee != task.created_by {
        out.push(task.assignee);
    }
    out.retain(|id| *id != sender);
    out
}

/// `"<sender>: <text>"` with newlines flattened and the text cut to
/// [`PREVIEW_CHARS`] plus an ellipsis.
fn preview(sender: &User, body: &str) -> String {
    let flat = body.replace('\n', " ");
    let flat = flat.trim();
    let text = match flat.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}…", &flat[..cut]),
        None => flat.to_string(),
    };
    format!("{}: {}", display_name(sender), text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryTaskStore;
    use crate::task::{TaskPriority, TaskStatus};
    use duebell_core::SystemClock;
    use duebell_notification::InMemoryNotificationStore;
    use duebell_org::Role;

    struct Fixture {
        creator: User,
        assignee: User,
        admin: User,
        outsider: User,
        task: Task,
        notes: Arc<InMemoryNotificationStore>,
        discussion: TaskDiscussion,
    }

    fn named(name: &str, role: Role) -> User {
        let mut user = User::new(format!("{name}@example.com"), role);
        user.set_display_name(Some(name.to_string()));
        user
    }

    async fn fixture() -> Fixture {
        let creator = named("Cora", Role::Staff);
        let assignee = named("Ash", Role::Staff);
        let store = Arc::new(InMemoryTaskStore::new());
        let task = Task {
            id: TaskId::new(),
            title: "Audit".to_string(),
            status: TaskStatus::Todo,
            priority: TaskPriority::Low,
            date: None,
            assignee: assignee.id(),
            created_by: creator.id(),
            close_requested: false,
            close_requested_at: None,
            closed_at: None,
            closed_by: None,
            follow_up_at: None,
            created_at: Utc::now(),
        };
        store.insert(&task).await.unwrap();
        let notes = Arc::new(InMemoryNotificationStore::new());
        let discussion = TaskDiscussion::new(
            store.clone(),
            store,
            notes.clone(),
            Arc::new(SystemClock),
        );
        Fixture {
            creator,
            assignee,
            admin: named("Root", Role::Admin),
            outsider: named("Olga", Role::Staff),
            task,
            notes,
            discussion,
        }
    }

    #[tokio::test]
    async fn post_notifies_other_participants() {
        let f = fixture().await;

        let message = f
            .discussion
            .post(&f.assignee, f.task.id, "  done with\npart one  ")
            .await
            .unwrap();
        assert_eq!(message.body, "done with\npart one");

        assert!(f.notes.for_recipient(f.assignee.id()).is_empty());
        let to_creator = f.notes.for_recipient(f.creator.id());
        assert_eq!(to_creator.len(), 1);
        assert_eq!(to_creator[0].kind, NotificationKind::TaskMessage);
        assert_eq!(to_creator[0].title, "New message on task: Audit");
        assert_eq!(to_creator[0].body, "Ash: done with part one");
    }

    #[tokio::test]
    async fn admin_post_notifies_both_participants() {
        let f = fixture().await;
        f.discussion.post(&f.admin, f.task.id, "status?").await.unwrap();

        assert_eq!(f.notes.all().len(), 2);
        let listed = f.discussion.list(&f.creator, f.task.id).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn outsiders_cannot_read_or_post() {
        let f = fixture().await;

        let err = f.discussion.post(&f.outsider, f.task.id, "hi").await.unwrap_err();
        assert!(matches!(err.current_context(), TaskError::PermissionDenied { .. }));
        assert!(f.discussion.list(&f.outsider, f.task.id).await.is_err());
    }

    #[tokio::test]
    async fn body_is_required_and_capped() {
        let f = fixture().await;

        for body in ["   ".to_string(), "x".repeat(MAX_BODY_CHARS + 1)] {
            let err = f.discussion.post(&f.creator, f.task.id, &body).await.unwrap_err();
            assert!(matches!(err.current_context(), TaskError::Validation { .. }));
        }
        assert!(f.discussion.list(&f.creator, f.task.id).await.unwrap().is_empty());
        assert!(
            f.discussion
                .post(&f.creator, f.task.id, &"x".repeat(MAX_BODY_CHARS))
                .await
                .is_ok()
        );
    }

    #[test]
    fn preview_is_truncated_with_ellipsis() {
        let sender = named("Sam", Role::Staff);
        let long = "é".repeat(PREVIEW_CHARS + 10);

        let text = preview(&sender, &long);

        assert!(text.starts_with("Sam: "));
        assert!(text.ends_with('…'));
        assert_eq!(text.chars().count(), "Sam: ".len() + PREVIEW_CHARS + 1);
    }

    #[test]
    fn preview_falls_back_to_email() {
        let sender = User::new("anon@example.com".to_string(), Role::Staff);
        assert_eq!(preview(&sender, "hi"), "anon@example.com: hi");
    }

    #[test]
    fn self_task_has_no_recipients_for_its_owner() {
        let owner = UserId::new();
        let task = Task {
            id: TaskId::new(),
            title: "solo".to_string(),
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            date: None,
            assignee: owner,
            created_by: owner,
            close_requested: false,
            close_requested_at: None,
            closed_at: None,
            closed_by: None,
            follow_up_at: None,
            created_at: Utc::now(),
        };
        assert!(recipients(&task, owner).is_empty());
        assert_eq!(recipients(&task, UserId::new()), vec![owner]);
    }
}
