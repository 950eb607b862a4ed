//! Scheduled triggers for duebell.
//!
//! This crate provides:
//!
//! - **Trigger Engine**: Scans an adapter's subjects and fires due triggers
//!   at most once each
//! - **Dedup Ledger**: The durable record of fired triggers, and the outbox
//!   that pairs a record with its notification
//! - **Adapters**: Meeting reminders and task follow-ups
//! - **Runner**: The fixed-delay background loop

pub mod adapter;
pub mod engine;
pub mod error;
pub mod follow_up;
pub mod key;
pub mod ledger;
pub mod reminders;
pub mod runner;
pub mod zone;

pub use adapter::TriggerAdapter;
pub use engine::{DEFAULT_LOOKBACK_HOURS, RunReport, TriggerEngine};
pub use error::{AdapterError, LedgerError, ScheduleError, SchedulerError};
pub use follow_up::TaskFollowUps;
pub use key::{OffsetKey, PlannedTrigger, ScanWindow, SubjectRef, TriggerKey};
pub use ledger::{ClaimFirst, DedupLedger, Delivery, InMemoryLedger, RecordOutcome, TriggerOutbox};
pub use reminders::{DEFAULT_LOOKAHEAD_DAYS, MeetingReminders};
pub use runner::{RunnerConfig, run_fixed_delay};
pub use zone::{parse_zone, resolve_local};
