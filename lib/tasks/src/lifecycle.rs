//! The task lifecycle state machine.
//!
//! Status moves freely between the open values (`TODO`, `IN_PROGRESS`) and
//! only reaches `DONE` through the close workflow: the assignee requests
//! closure, then the creator (or an admin) closes. Once `DONE`, a task never
//! changes again; closing it a second time is a no-op.
//!
//! Every rejection happens before the first write. Notifications annotate a
//! change that already committed and go through the best-effort boundary.

use crate::error::TaskError;
use crate::repository::TaskRepository;
use crate::task::{MAX_TITLE_CHARS, NewTask, Task, TaskListing, TaskPatch, TaskStatus};
use duebell_core::{Clock, Result, TaskId, UserId};
use duebell_notification::{NewNotification, NotificationKind, NotificationSink, notify_best_effort};
use duebell_org::{HierarchyGraph, User, UserDirectory};
use rootcause::prelude::ResultExt;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Name used in notification texts for a user without a display name.
pub(crate) fn display_name(user: &User) -> &str {
    user.display_name().unwrap_or(user.email())
}

/// Request-scoped task operations.
pub struct TaskLifecycle {
    tasks: Arc<dyn TaskRepository>,
    hierarchy: HierarchyGraph<dyn UserDirectory>,
    notifications: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
}

impl TaskLifecycle {
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        hierarchy: HierarchyGraph<dyn UserDirectory>,
        notifications: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tasks,
            hierarchy,
            notifications,
            clock,
        }
    }

    /// Lists the actor's tasks, newest first.
    pub async fn list(&self, actor: &User, listing: TaskListing) -> Result<Vec<Task>, TaskError> {
        self.tasks.list_for(actor.id(), listing).await
    }

    /// Reads a task as an admin, its creator, or its assignee.
    pub async fn get(&self, actor: &User, id: TaskId) -> Result<Task, TaskError> {
        let task = self.load(id).await?;
        if !can_access(actor, &task) {
            return Err(TaskError::denied(actor.id(), "not a participant of this task").into());
        }
        Ok(task)
    }

    /// Creates a task assigned to `input.assignee`.
    #[instrument(skip(self, actor, input), fields(actor = %actor.id(), assignee = %input.assignee))]
    pub async fn create(&self, actor: &User, input: NewTask) -> Result<Task, TaskError> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(TaskError::invalid("title is required").into());
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(TaskError::invalid(format!(
                "title must be at most {MAX_TITLE_CHARS} characters"
            ))
            .into());
        }
        let status = input.status.unwrap_or_default();
        if !status.is_open() {
            return Err(TaskError::invalid("a task cannot be created closed").into());
        }
        if input.follow_up_enabled && input.follow_up_at.is_none() {
            return Err(
                TaskError::invalid("followUpAt is required when followUpEnabled=true").into(),
            );
        }

        let assignee = self.authorize_assignment(actor, input.assignee).await?;

        let task = Task {
            id: TaskId::new(),
            title: title.to_string(),
            status,
            priority: input.priority.unwrap_or_default(),
            date: input.date,
            assignee: assignee.id(),
            created_by: actor.id(),
            close_requested: false,
            close_requested_at: None,
            closed_at: None,
            closed_by: None,
            follow_up_at: input.follow_up_at,
            created_at: self.clock.now(),
        };
        self.tasks.insert(&task).await?;
        info!(task = %task.id, "task created");
        Ok(task)
    }

    /// Applies a partial update.
    ///
    /// An assignee who is neither the creator nor an admin may only change
    /// `status`; a patch touching anything else is refused as a whole.
    #[instrument(skip(self, actor, patch), fields(actor = %actor.id()))]
    pub async fn update(&self, actor: &User, id: TaskId, patch: TaskPatch) -> Result<Task, TaskError> {
        let mut task = self.load(id).await?;
        let me = actor.id();
        let is_creator = task.is_creator(me);
        let is_assignee = task.is_assignee(me);

        if !(actor.is_admin() || is_creator || is_assignee) {
            return Err(TaskError::denied(me, "not allowed to update this task").into());
        }
        if task.is_done() {
            return Err(TaskError::Conflict {
                task: id,
                reason: "task is already closed",
            }
            .into());
        }
        if patch.status == Some(TaskStatus::Done) {
            return Err(TaskError::invalid("tasks are finished through close, not update").into());
        }

        if is_assignee && !is_creator && !actor.is_admin() {
            if patch.touches_more_than_status() {
                return Err(TaskError::denied(me, "assignee can only update status").into());
            }
            if let Some(status) = patch.status {
                task.status = status;
            }
        } else {
            if let Some(status) = patch.status {
                task.status = status;
            }
            if let Some(priority) = patch.priority {
                task.priority = priority;
            }
            if let Some(assignee) = patch.assignee {
                task.assignee = self.authorize_assignment(actor, assignee).await?.id();
            }
            match (patch.follow_up_enabled, patch.follow_up_at) {
                (_, Some(at)) => task.follow_up_at = Some(at),
                (Some(false), None) => task.follow_up_at = None,
                (Some(true), None) if task.follow_up_at.is_none() => {
                    return Err(TaskError::invalid(
                        "followUpAt is required when followUpEnabled=true",
                    )
                    .into());
                }
                _ => {}
            }
        }

        self.tasks.update(&task).await?;
        debug!(task = %id, status = task.status.as_str(), "task updated");
        Ok(task)
    }

    /// Asks the creator to close the task.
    ///
    /// Requesting twice is a no-op; only the first request notifies.
    #[instrument(skip(self, actor), fields(actor = %actor.id()))]
    pub async fn request_close(&self, actor: &User, id: TaskId) -> Result<Task, TaskError> {
        let mut task = self.load(id).await?;
        if !(actor.is_admin() || task.is_assignee(actor.id())) {
            return Err(TaskError::denied(actor.id(), "only the assignee can request close").into());
        }
        if task.is_done() {
            return Err(TaskError::Conflict {
                task: id,
                reason: "task is already closed",
            }
            .into());
        }
        if task.close_requested {
            return Ok(task);
        }

        task.close_requested = true;
        task.close_requested_at = Some(self.clock.now());
        self.tasks.update(&task).await?;
        info!(task = %id, "close requested");

        if !task.is_creator(actor.id()) {
            let note = NewNotification::new(
                NotificationKind::TaskCloseRequest,
                task.created_by,
                format!("Close requested: {}", task.title),
                format!(
                    "{} asked to close this task.\nOpen the task to close it.",
                    display_name(actor)
                ),
            )
            .about_task(id);
            notify_best_effort(self.notifications.as_ref(), note).await;
        }
        Ok(task)
    }

    /// Closes the task.
    ///
    /// Closing a `DONE` task returns it unchanged. A non-admin creator needs a
    /// pending close request unless they also own the task as assignee.
    #[instrument(skip(self, actor), fields(actor = %actor.id()))]
    pub async fn close(&self, actor: &User, id: TaskId) -> Result<Task, TaskError> {
        let mut task = self.load(id).await?;
        let me = actor.id();
        if !(actor.is_admin() || task.is_creator(me)) {
            return Err(TaskError::denied(me, "only the creator or an admin can close").into());
        }
        if task.is_done() {
            return Ok(task);
        }
        if !actor.is_admin() {
            let self_task = task.is_creator(me) && task.is_assignee(me);
            if !self_task && !task.close_requested {
                return Err(TaskError::Conflict {
                    task: id,
                    reason: "assignee must request close first",
                }
                .into());
            }
        }

        let now = self.clock.now();
        task.status = TaskStatus::Done;
        task.closed_at = Some(now);
        task.closed_by = Some(me);
        if !task.close_requested {
            task.close_requested = true;
            task.close_requested_at = Some(now);
        }
        self.tasks.update(&task).await?;
        info!(task = %id, "task closed");

        if !task.is_assignee(me) {
            let note = NewNotification::new(
                NotificationKind::TaskClosed,
                task.assignee,
                format!("Task closed: {}", task.title),
                format!("{} closed this task.", display_name(actor)),
            )
            .about_task(id);
            notify_best_effort(self.notifications.as_ref(), note).await;
        }
        Ok(task)
    }

    /// Deletes the task. Only its creator or an admin may.
    #[instrument(skip(self, actor), fields(actor = %actor.id()))]
    pub async fn delete(&self, actor: &User, id: TaskId) -> Result<(), TaskError> {
        let task = self.load(id).await?;
        if !actor.is_admin() && !task.is_creator(actor.id()) {
            return Err(TaskError::denied(actor.id(), "only the creator or an admin can delete").into());
        }
        self.tasks.delete(id).await?;
        info!(task = %id, "task deleted");
        Ok(())
    }

    async fn load(&self, id: TaskId) -> Result<Task, TaskError> {
        match self.tasks.find(id).await? {
            Some(task) => Ok(task),
            None => Err(TaskError::NotFound { id }.into()),
        }
    }

    /// Resolves `assignee` and checks that `actor` may hand them work.
    ///
    /// Administrators only ever receive work from themselves. Everyone else
    /// may assign to themselves or anyone below them.
    async fn authorize_assignment(&self, actor: &User, assignee: UserId) -> Result<User, TaskError> {
        let Some(assignee) = self
            .hierarchy
            .directory()
            .find_user(assignee)
            .await
            .context(TaskError::storage("assignee lookup failed"))?
        else {
            return Err(TaskError::invalid("assignee not found").into());
        };

        if assignee.is_admin() && assignee.id() != actor.id() {
            return Err(TaskError::denied(actor.id(), "cannot assign tasks to an admin").into());
        }
        if !actor.is_admin() && assignee.id() != actor.id() {
            let manages = self
                .hierarchy
                .is_manager_of(actor.id(), assignee.id())
                .await
                .context(TaskError::storage("hierarchy lookup failed"))?;
            if !manages {
                return Err(TaskError::denied(actor.id(), "not allowed to assign to this user").into());
            }
        }
        Ok(assignee)
    }
}

/// Admins, creators, and assignees may read a task and its discussion.
pub(crate) fn can_access(actor: &User, task: &Task) -> bool {
    actor.is_admin() || task.is_creator(actor.id()) || task.is_assignee(actor.id())
}
