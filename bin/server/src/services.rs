//! Wiring of collaborators into the domain services and trigger engines.

use crate::config::SchedulerConfig;
use crate::db::{PgMeetingStore, PgNotificationStore, PgTaskStore, PgTriggerLedger, PgUserDirectory};
use chrono_tz::Tz;
use duebell_core::Clock;
use duebell_meeting::{MeetingBook, MeetingStore};
use duebell_notification::{Inbox, NotificationInbox, NotificationSink};
use duebell_org::{HierarchyGraph, UserDirectory};
use duebell_scheduler::{
    MeetingReminders, RunnerConfig, TaskFollowUps, TriggerEngine, TriggerOutbox, run_fixed_delay,
};
use duebell_tasks::{TaskDiscussion, TaskLifecycle, TaskMessageRepository, TaskRepository};
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// The storage seams every service is built from.
pub struct Collaborators {
    pub directory: Arc<dyn UserDirectory>,
    pub tasks: Arc<dyn TaskRepository>,
    pub messages: Arc<dyn TaskMessageRepository>,
    pub meetings: Arc<dyn MeetingStore>,
    pub sink: Arc<dyn NotificationSink>,
    pub inbox: Arc<dyn NotificationInbox>,
    pub outbox: Arc<dyn TriggerOutbox>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// Postgres-backed collaborators sharing one pool.
    pub fn postgres(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        let tasks = Arc::new(PgTaskStore::new(pool.clone()));
        let notifications = Arc::new(PgNotificationStore::new(pool.clone(), clock.clone()));
        Self {
            directory: Arc::new(PgUserDirectory::new(pool.clone())),
            tasks: tasks.clone(),
            messages: tasks,
            meetings: Arc::new(PgMeetingStore::new(pool.clone())),
            sink: notifications.clone(),
            inbox: notifications,
            outbox: Arc::new(PgTriggerLedger::new(pool, clock.clone())),
            clock,
        }
    }
}

/// Request-scoped services plus the two background engines.
pub struct Services {
    pub hierarchy: HierarchyGraph<dyn UserDirectory>,
    pub tasks: TaskLifecycle,
    pub discussion: TaskDiscussion,
    pub meetings: MeetingBook<dyn MeetingStore>,
    pub inbox: Inbox<dyn NotificationInbox>,
    pub engine: Arc<TriggerEngine>,
    pub reminders: Arc<MeetingReminders>,
    pub follow_ups: Arc<TaskFollowUps>,
}

impl Services {
    pub fn new(parts: Collaborators, zone: Tz, scheduler: &SchedulerConfig) -> Self {
        let hierarchy = HierarchyGraph::new(parts.directory.clone());
        let engine = TriggerEngine::new(parts.outbox, parts.clock.clone())
            .with_lookback(scheduler.lookback());
        Self {
            tasks: TaskLifecycle::new(
                parts.tasks.clone(),
                hierarchy.clone(),
                parts.sink.clone(),
                parts.clock.clone(),
            ),
            discussion: TaskDiscussion::new(
                parts.tasks.clone(),
                parts.messages,
                parts.sink,
                parts.clock.clone(),
            ),
            meetings: MeetingBook::new(parts.meetings.clone(), parts.clock.clone()),
            inbox: Inbox::new(parts.inbox, parts.clock),
            engine: Arc::new(engine),
            reminders: Arc::new(
                MeetingReminders::new(parts.meetings, zone)
                    .with_lookahead(scheduler.meeting_lookahead()),
            ),
            follow_ups: Arc::new(TaskFollowUps::new(parts.tasks, parts.directory, zone)),
            hierarchy,
        }
    }

    /// Starts both engines on their own fixed-delay loops.
    pub fn spawn_engines(
        &self,
        runner: RunnerConfig,
        shutdown: &watch::Receiver<bool>,
    ) -> Vec<JoinHandle<()>> {
        let reminders = {
            let engine = self.engine.clone();
            let adapter = self.reminders.clone();
            tokio::spawn(run_fixed_delay(
                "meeting-reminders",
                runner,
                shutdown.clone(),
                move || {
                    let engine = engine.clone();
                    let adapter = adapter.clone();
                    async move { engine.run(adapter.as_ref()).await }
                },
            ))
        };
        let follow_ups = {
            let engine = self.engine.clone();
            let adapter = self.follow_ups.clone();
            tokio::spawn(run_fixed_delay(
                "task-follow-ups",
                runner,
                shutdown.clone(),
                move || {
                    let engine = engine.clone();
                    let adapter = adapter.clone();
                    async move { engine.run(adapter.as_ref()).await }
                },
            ))
        };
        vec![reminders, follow_ups]
    }
}
