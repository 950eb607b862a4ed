//! Identity of a trigger: which subject, and which of its offsets.

use chrono::{DateTime, SecondsFormat, Utc};
use duebell_core::{MeetingId, TaskId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The entity a trigger belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SubjectRef {
    Meeting(MeetingId),
    Task(TaskId),
}

impl SubjectRef {
    /// Stable kind name used in ledger rows.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Meeting(_) => "meeting",
            Self::Task(_) => "task",
        }
    }
}

impl fmt::Display for SubjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Meeting(id) => write!(f, "{id}"),
            Self::Task(id) => write!(f, "{id}"),
        }
    }
}

/// Distinguishes one trigger of a subject from another.
///
/// Meeting reminders are keyed by their offset, so editing the meeting's date
/// does not re-fire offsets that already fired. Task follow-ups are keyed by
/// the instant itself, so moving the follow-up arms a fresh trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetKey {
    MinutesBefore(u32),
    At(DateTime<Utc>),
}

impl OffsetKey {
    /// Text form stored in the ledger's offset column.
    ///
    /// Instants are kept to microseconds, the precision the database stores.
    #[must_use]
    pub fn storage_key(&self) -> String {
        match self {
            Self::MinutesBefore(minutes) => format!("m{minutes}"),
            Self::At(at) => format!("at{}", at.to_rfc3339_opts(SecondsFormat::Micros, true)),
        }
    }
}

impl fmt::Display for OffsetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

/// The dedup key: a trigger fires at most once per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriggerKey {
    pub subject: SubjectRef,
    pub offset: OffsetKey,
}

impl TriggerKey {
    #[must_use]
    pub fn new(subject: SubjectRef, offset: OffsetKey) -> Self {
        Self { subject, offset }
    }
}

impl fmt::Display for TriggerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.subject, self.offset)
    }
}

/// One trigger an adapter plans for a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedTrigger {
    pub offset: OffsetKey,
    pub fires_at: DateTime<Utc>,
}

/// The instants a run considers.
///
/// A trigger is due when `earliest <= fires_at <= now`. `latest` only bounds
/// how far ahead adapters look for candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanWindow {
    pub now: DateTime<Utc>,
    pub earliest: DateTime<Utc>,
    pub latest: DateTime<Utc>,
}

impl ScanWindow {
    #[must_use]
    pub fn is_due(&self, at: DateTime<Utc>) -> bool {
        self.earliest <= at && at <= self.now
    }
}
