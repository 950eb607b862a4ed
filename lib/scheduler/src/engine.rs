//! The trigger engine: one scan over an adapter's subjects.

use crate::adapter::TriggerAdapter;
use crate::error::SchedulerError;
use crate::key::{PlannedTrigger, ScanWindow, TriggerKey};
use crate::ledger::{Delivery, TriggerOutbox};
use chrono::Duration;
use duebell_core::{Clock, Result};
use rootcause::prelude::ResultExt;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// How far back a missed trigger may still fire.
pub const DEFAULT_LOOKBACK_HOURS: i64 = 48;

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub candidates: usize,
    pub inactive: usize,
    pub not_yet_due: usize,
    /// Triggers older than the lookback window. They never fire.
    pub expired: usize,
    pub already_fired: usize,
    pub fired: usize,
    /// Subjects that could not be planned, plus single triggers that failed
    /// to fire. Both are retried next run unless already claimed.
    pub failed: usize,
}

impl RunReport {
    #[must_use]
    pub fn did_work(&self) -> bool {
        self.fired > 0 || self.failed > 0
    }
}

/// Fires due triggers through an outbox.
pub struct TriggerEngine {
    outbox: Arc<dyn TriggerOutbox>,
    clock: Arc<dyn Clock>,
    lookback: Duration,
}

impl TriggerEngine {
    pub fn new(outbox: Arc<dyn TriggerOutbox>, clock: Arc<dyn Clock>) -> Self {
        Self {
            outbox,
            clock,
            lookback: Duration::hours(DEFAULT_LOOKBACK_HOURS),
        }
    }

    #[must_use]
    pub fn with_lookback(mut self, lookback: Duration) -> Self {
        self.lookback = lookback;
        self
    }

    /// The window a run starting now would scan for `adapter`.
    pub fn window_for<A: TriggerAdapter + ?Sized>(&self, adapter: &A) -> ScanWindow {
        let now = self.clock.now();
        ScanWindow {
            now,
            earliest: now - self.lookback,
            latest: now + adapter.lookahead(),
        }
    }

    /// Runs one scan.
    ///
    /// Only a failure to list candidates fails the run. A subject that cannot
    /// be planned, or a single trigger that cannot be delivered, is logged and
    /// counted, and the scan moves on.
    #[instrument(skip_all, fields(adapter = adapter.name()))]
    pub async fn run<A: TriggerAdapter + ?Sized>(
        &self,
        adapter: &A,
    ) -> Result<RunReport, SchedulerError> {
        let window = self.window_for(adapter);
        let subjects = adapter
            .candidates(&window)
            .await
            .context(SchedulerError::Run {
                adapter: adapter.name(),
            })?;

        let mut report = RunReport {
            candidates: subjects.len(),
            ..RunReport::default()
        };
        for subject in &subjects {
            if !adapter.is_active(subject) {
                report.inactive += 1;
                continue;
            }
            let subject_ref = adapter.subject_ref(subject);
            if let Err(error) = self.fire_due(adapter, subject, &window, &mut report).await {
                report.failed += 1;
                warn!(subject = %subject_ref, %error, "skipping subject");
            }
        }

        if report.did_work() {
            info!(?report, "trigger run finished");
        } else {
            debug!(?report, "trigger run finished");
        }
        Ok(report)
    }

    async fn fire_due<A: TriggerAdapter + ?Sized>(
        &self,
        adapter: &A,
        subject: &A::Subject,
        window: &ScanWindow,
        report: &mut RunReport,
    ) -> Result<(), SchedulerError> {
        let planned = adapter.plan(subject).context(SchedulerError::Subject {
            adapter: adapter.name(),
            subject: adapter.subject_ref(subject).to_string(),
        })?;
        for trigger in planned {
            if trigger.fires_at > window.now {
                report.not_yet_due += 1;
                continue;
            }
            if !window.is_due(trigger.fires_at) {
                report.expired += 1;
                continue;
            }
            let key = TriggerKey::new(adapter.subject_ref(subject), trigger.offset);
            match self.deliver(adapter, subject, &key, &trigger, window).await {
                Ok(Delivery::Delivered(id)) => {
                    report.fired += 1;
                    debug!(%key, notification = %id, "trigger fired");
                }
                Ok(Delivery::AlreadyFired) => report.already_fired += 1,
                Err(error) => {
                    report.failed += 1;
                    warn!(%key, %error, "trigger failed");
                }
            }
        }
        Ok(())
    }

    async fn deliver<A: TriggerAdapter + ?Sized>(
        &self,
        adapter: &A,
        subject: &A::Subject,
        key: &TriggerKey,
        trigger: &PlannedTrigger,
        window: &ScanWindow,
    ) -> Result<Delivery, SchedulerError> {
        let context = || SchedulerError::Subject {
            adapter: adapter.name(),
            subject: key.subject.to_string(),
        };
        if self.outbox.has_fired(key).await.context(context())? {
            return Ok(Delivery::AlreadyFired);
        }
        let notification = adapter
            .compose(subject, trigger)
            .await
            .context(context())?;
        // AlreadyFired here means a concurrent run won the claim.
        self.outbox
            .deliver_once(key, window.now, notification)
            .await
            .context(context())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdapterError;
    use crate::key::{OffsetKey, SubjectRef};
    use crate::ledger::{ClaimFirst, InMemoryLedger};
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use duebell_core::{ManualClock, TaskId, UserId};
    use duebell_notification::{InMemoryNotificationStore, NewNotification, NotificationKind};

    /// Subjects with fixed instants. Subjects named "broken" fail to plan.
    /// Subjects named "split" plan three triggers a minute apart, and the
    /// earliest of them fails to compose.
    struct Fixed {
        subjects: Vec<(TaskId, &'static str, DateTime<Utc>)>,
        recipient: UserId,
        fail_listing: bool,
    }

    #[async_trait]
    impl TriggerAdapter for Fixed {
        type Subject = (TaskId, &'static str, DateTime<Utc>);

        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn candidates(
            &self,
            _window: &ScanWindow,
        ) -> Result<Vec<Self::Subject>, AdapterError> {
            if self.fail_listing {
                return Err(AdapterError::CandidateFetch { adapter: "fixed" }.into());
            }
            Ok(self.subjects.clone())
        }

        fn subject_ref(&self, subject: &Self::Subject) -> SubjectRef {
            SubjectRef::Task(subject.0)
        }

        fn is_active(&self, _subject: &Self::Subject) -> bool {
            true
        }

        fn plan(&self, subject: &Self::Subject) -> Result<Vec<PlannedTrigger>, AdapterError> {
            if subject.1 == "broken" {
                return Err(AdapterError::Anchor {
                    subject: subject.0.to_string(),
                }
                .into());
            }
            let count = if subject.1 == "split" { 3 } else { 1 };
            Ok((0..count)
                .map(|back| {
                    let at = subject.2 - Duration::minutes(back);
                    PlannedTrigger {
                        offset: OffsetKey::At(at),
                        fires_at: at,
                    }
                })
                .collect())
        }

        async fn compose(
            &self,
            subject: &Self::Subject,
            trigger: &PlannedTrigger,
        ) -> Result<NewNotification, AdapterError> {
            if subject.1 == "split" && trigger.fires_at == subject.2 - Duration::minutes(2) {
                return Err(AdapterError::Lookup {
                    what: "recipient".to_string(),
                }
                .into());
            }
            Ok(NewNotification::new(
                NotificationKind::TaskFollowUp,
                self.recipient,
                subject.1,
                "",
            )
            .about_task(subject.0))
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn engine(
        clock: &Arc<ManualClock>,
    ) -> (TriggerEngine, Arc<InMemoryLedger>, Arc<InMemoryNotificationStore>) {
        let ledger = Arc::new(InMemoryLedger::new());
        let notes = Arc::new(InMemoryNotificationStore::new());
        let engine = TriggerEngine::new(
            Arc::new(ClaimFirst::new(ledger.clone(), notes.clone())),
            clock.clone(),
        );
        (engine, ledger, notes)
    }

    #[tokio::test]
    async fn failing_subject_does_not_stop_the_run() {
        let clock = Arc::new(ManualClock::new(now()));
        let (engine, _, notes) = engine(&clock);
        let adapter = Fixed {
            subjects: vec![
                (TaskId::new(), "first", now()),
                (TaskId::new(), "broken", now()),
                (TaskId::new(), "last", now()),
            ],
            recipient: UserId::new(),
            fail_listing: false,
        };

        let report = engine.run(&adapter).await.unwrap();

        assert_eq!(report.candidates, 3);
        assert_eq!(report.failed, 1);
        assert_eq!(report.fired, 2);
        assert_eq!(notes.all().len(), 2);
    }

    #[tokio::test]
    async fn store_failure_leaves_trigger_claimed() {
        let clock = Arc::new(ManualClock::new(now()));
        let (engine, ledger, notes) = engine(&clock);
        let adapter = Fixed {
            subjects: vec![(TaskId::new(), "only", now())],
            recipient: UserId::new(),
            fail_listing: false,
        };

        notes.set_failing(true);
        let first = engine.run(&adapter).await.unwrap();
        notes.set_failing(false);
        let second = engine.run(&adapter).await.unwrap();

        assert_eq!(first.failed, 1);
        assert_eq!(second.already_fired, 1);
        assert_eq!(ledger.len(), 1);
        assert!(notes.all().is_empty());
    }

    #[tokio::test]
    async fn failing_trigger_does_not_skip_the_subjects_other_triggers() {
        let clock = Arc::new(ManualClock::new(now()));
        let (engine, ledger, notes) = engine(&clock);
        let adapter = Fixed {
            subjects: vec![(TaskId::new(), "split", now())],
            recipient: UserId::new(),
            fail_listing: false,
        };

        let report = engine.run(&adapter).await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.fired, 2);
        assert_eq!(ledger.len(), 2);
        assert_eq!(notes.all().len(), 2);
    }

    #[tokio::test]
    async fn candidate_failure_fails_the_run() {
        let clock = Arc::new(ManualClock::new(now()));
        let (engine, _, _) = engine(&clock);
        let adapter = Fixed {
            subjects: Vec::new(),
            recipient: UserId::new(),
            fail_listing: true,
        };

        let err = engine.run(&adapter).await.unwrap_err();

        assert!(matches!(
            err.current_context(),
            SchedulerError::Run { adapter: "fixed" }
        ));
    }

    #[tokio::test]
    async fn concurrent_runs_deliver_once() {
        let clock = Arc::new(ManualClock::new(now()));
        let ledger = Arc::new(InMemoryLedger::new());
        let notes = Arc::new(InMemoryNotificationStore::new());
        let outbox: Arc<dyn TriggerOutbox> =
            Arc::new(ClaimFirst::new(ledger.clone(), notes.clone()));
        let a = TriggerEngine::new(outbox.clone(), clock.clone());
        let b = TriggerEngine::new(outbox, clock.clone());
        let adapter = Fixed {
            subjects: (0..20)
                .map(|_| (TaskId::new(), "due", now() - Duration::minutes(5)))
                .collect(),
            recipient: UserId::new(),
            fail_listing: false,
        };

        let (ra, rb) = tokio::join!(a.run(&adapter), b.run(&adapter));
        let (ra, rb) = (ra.unwrap(), rb.unwrap());

        assert_eq!(ra.fired + rb.fired, 20);
        assert_eq!(ra.already_fired + rb.already_fired, 20);
        assert_eq!(ledger.len(), 20);
        assert_eq!(notes.all().len(), 20);
    }

    #[tokio::test]
    async fn lookback_is_configurable() {
        let clock = Arc::new(ManualClock::new(now()));
        let (engine, _, _) = engine(&clock);
        let engine = engine.with_lookback(Duration::hours(1));
        let adapter = Fixed {
            subjects: vec![(TaskId::new(), "stale", now() - Duration::hours(2))],
            recipient: UserId::new(),
            fail_listing: false,
        };

        let report = engine.run(&adapter).await.unwrap();

        assert_eq!(report.expired, 1);
        assert_eq!(report.fired, 0);
        assert!(!report.did_work());
    }

    #[test]
    fn report_serializes_counters() {
        let report = RunReport {
            fired: 2,
            already_fired: 1,
            ..RunReport::default()
        };
        let json = serde_json::to_value(report).unwrap();
        assert_eq!(json["fired"], 2);
        assert_eq!(json["already_fired"], 1);
        assert_eq!(json["not_yet_due"], 0);
    }
}
