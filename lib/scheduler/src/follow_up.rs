//! Task follow-ups: one reminder to the creator at the task's follow-up
//! instant.

use crate::adapter::TriggerAdapter;
use crate::error::AdapterError;
use crate::key::{OffsetKey, PlannedTrigger, ScanWindow, SubjectRef};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use duebell_core::Result;
use duebell_notification::{NewNotification, NotificationKind};
use duebell_org::UserDirectory;
use duebell_tasks::{Task, TaskRepository};
use rootcause::prelude::ResultExt;
use std::sync::Arc;

/// Shown when the assignee has no display name or no longer exists.
const UNKNOWN_ASSIGNEE: &str = "(unknown)";

/// Reminds task creators to check back on delegated work.
pub struct TaskFollowUps {
    tasks: Arc<dyn TaskRepository>,
    directory: Arc<dyn UserDirectory>,
    zone: Tz,
}

impl TaskFollowUps {
    pub fn new(tasks: Arc<dyn TaskRepository>, directory: Arc<dyn UserDirectory>, zone: Tz) -> Self {
        Self {
            tasks,
            directory,
            zone,
        }
    }

    async fn assignee_name(&self, task: &Task) -> Result<String, AdapterError> {
        let user = self
            .directory
            .find_user(task.assignee)
            .await
            .context(AdapterError::Lookup {
                what: format!("assignee of {}", task.id),
            })?;
        Ok(user
            .as_ref()
            .and_then(|u| u.display_name())
            .unwrap_or(UNKNOWN_ASSIGNEE)
            .to_string())
    }
}

#[async_trait]
impl TriggerAdapter for TaskFollowUps {
    type Subject = Task;

    fn name(&self) -> &'static str {
        "task-follow-ups"
    }

    async fn candidates(&self, window: &ScanWindow) -> Result<Vec<Task>, AdapterError> {
        self.tasks
            .list_due_for_follow_up(window.now, window.earliest)
            .await
            .context(AdapterError::CandidateFetch {
                adapter: self.name(),
            })
    }

    fn subject_ref(&self, task: &Task) -> SubjectRef {
        SubjectRef::Task(task.id)
    }

    fn is_active(&self, task: &Task) -> bool {
        task.status.is_open() && task.follow_up_enabled()
    }

    fn plan(&self, task: &Task) -> Result<Vec<PlannedTrigger>, AdapterError> {
        Ok(task
            .follow_up_at
            .map(|at| PlannedTrigger {
                offset: OffsetKey::At(at),
                fires_at: at,
            })
            .into_iter()
            .collect())
    }

    async fn compose(
        &self,
        task: &Task,
        trigger: &PlannedTrigger,
    ) -> Result<NewNotification, AdapterError> {
        let assignee = self.assignee_name(task).await?;
        let body = format!(
            "This task is assigned to \"{assignee}\".\nFollow-up time: {}\nOpen the task to follow up.",
            local_minute(trigger.fires_at, self.zone)
        );
        Ok(NewNotification::new(
            NotificationKind::TaskFollowUp,
            task.created_by,
            format!("Task follow-up: {}", task.title),
            body,
        )
        .about_task(task.id))
    }
}

/// `YYYY-MM-DD HH:MM` in `zone`.
fn local_minute(at: DateTime<Utc>, zone: Tz) -> String {
    at.with_timezone(&zone).format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TriggerEngine;
    use crate::key::TriggerKey;
    use crate::ledger::{ClaimFirst, InMemoryLedger};
    use chrono::{Duration, TimeZone};
    use duebell_core::{ManualClock, TaskId, UserId};
    use duebell_notification::InMemoryNotificationStore;
    use duebell_org::{OrgChart, Role, User};
    use duebell_tasks::{InMemoryTaskStore, TaskPriority, TaskStatus};

    struct Fixture {
        clock: Arc<ManualClock>,
        tasks: Arc<InMemoryTaskStore>,
        ledger: Arc<InMemoryLedger>,
        notes: Arc<InMemoryNotificationStore>,
        engine: TriggerEngine,
        adapter: TaskFollowUps,
        creator: User,
        assignee: User,
    }

    fn follow_up() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    fn fixture() -> Fixture {
        let creator = User::new("boss@example.com".to_string(), Role::Staff);
        let mut assignee = User::new("dev@example.com".to_string(), Role::Staff);
        assignee.set_display_name(Some("Dana".to_string()));
        assignee.set_manager(Some(creator.id()));
        let chart = Arc::new(OrgChart::from_users([creator.clone(), assignee.clone()]));

        let clock = Arc::new(ManualClock::new(follow_up()));
        let tasks = Arc::new(InMemoryTaskStore::new());
        let ledger = Arc::new(InMemoryLedger::new());
        let notes = Arc::new(InMemoryNotificationStore::new());
        let engine = TriggerEngine::new(
            Arc::new(ClaimFirst::new(ledger.clone(), notes.clone())),
            clock.clone(),
        );
        let adapter = TaskFollowUps::new(tasks.clone(), chart, chrono_tz::Asia::Tehran);
        Fixture {
            clock,
            tasks,
            ledger,
            notes,
            engine,
            adapter,
            creator,
            assignee,
        }
    }

    fn task(f: &Fixture, at: Option<DateTime<Utc>>) -> Task {
        Task {
            id: TaskId::new(),
            title: "Ship report".to_string(),
            status: TaskStatus::InProgress,
            priority: TaskPriority::High,
            date: None,
            assignee: f.assignee.id(),
            created_by: f.creator.id(),
            close_requested: false,
            close_requested_at: None,
            closed_at: None,
            closed_by: None,
            follow_up_at: at,
            created_at: follow_up() - Duration::days(3),
        }
    }

    #[tokio::test]
    async fn fires_once_to_the_creator() {
        let f = fixture();
        let t = task(&f, Some(follow_up()));
        f.tasks.insert(&t).await.unwrap();

        assert_eq!(f.engine.run(&f.adapter).await.unwrap().fired, 1);
        assert_eq!(f.engine.run(&f.adapter).await.unwrap().already_fired, 1);

        let notes = f.notes.for_recipient(f.creator.id());
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, NotificationKind::TaskFollowUp);
        assert_eq!(notes[0].task_id, Some(t.id));
        assert_eq!(notes[0].title, "Task follow-up: Ship report");
        // 09:00 UTC is 12:30 in Tehran.
        assert_eq!(
            notes[0].body,
            "This task is assigned to \"Dana\".\nFollow-up time: 2025-06-01 12:30\nOpen the task to follow up."
        );
    }

    #[tokio::test]
    async fn rescheduled_follow_up_fires_again() {
        let f = fixture();
        let mut t = task(&f, Some(follow_up()));
        f.tasks.insert(&t).await.unwrap();
        f.engine.run(&f.adapter).await.unwrap();

        let later = follow_up() + Duration::days(1);
        t.follow_up_at = Some(later);
        f.tasks.update(&t).await.unwrap();
        f.clock.set(later);
        let report = f.engine.run(&f.adapter).await.unwrap();

        assert_eq!(report.fired, 1);
        assert_eq!(f.ledger.len(), 2);
        assert!(f.ledger.fired_at(&TriggerKey::new(
            SubjectRef::Task(t.id),
            OffsetKey::At(later)
        ))
        .is_some());
        assert_eq!(f.notes.all().len(), 2);
    }

    #[tokio::test]
    async fn done_tasks_stop_firing() {
        let f = fixture();
        let mut t = task(&f, Some(follow_up()));
        t.status = TaskStatus::Done;
        f.tasks.insert(&t).await.unwrap();

        let report = f.engine.run(&f.adapter).await.unwrap();

        assert_eq!(report.fired, 0);
        assert!(f.notes.all().is_empty());
    }

    #[tokio::test]
    async fn follow_ups_older_than_lookback_never_fire() {
        let f = fixture();
        f.tasks.insert(&task(&f, Some(follow_up()))).await.unwrap();

        f.clock.set(follow_up() + Duration::hours(48) + Duration::minutes(1));
        let report = f.engine.run(&f.adapter).await.unwrap();

        assert_eq!(report.fired, 0);
        assert!(f.ledger.is_empty());
    }

    #[tokio::test]
    async fn unknown_assignee_uses_placeholder() {
        let f = fixture();
        let mut t = task(&f, Some(follow_up()));
        t.assignee = UserId::new();
        f.tasks.insert(&t).await.unwrap();

        f.engine.run(&f.adapter).await.unwrap();

        let notes = f.notes.all();
        assert!(notes[0].body.contains("\"(unknown)\""));
    }

    #[test]
    fn disabled_or_closed_tasks_are_inactive() {
        let f = fixture();
        assert!(f.adapter.is_active(&task(&f, Some(follow_up()))));
        assert!(!f.adapter.is_active(&task(&f, None)));
        let mut done = task(&f, Some(follow_up()));
        done.status = TaskStatus::Done;
        assert!(!f.adapter.is_active(&done));
    }

    #[test]
    fn local_minute_truncates_seconds() {
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 59).unwrap();
        assert_eq!(local_minute(at, chrono_tz::Asia::Tehran), "2025-06-01 12:30");
    }
}
