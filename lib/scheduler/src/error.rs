//! Error types for the scheduler crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `LedgerError`: Errors from the dedup ledger and trigger outbox
//! - `AdapterError`: Errors from a trigger adapter's data
//! - `ScheduleError`: Errors resolving the configured zone and local times
//! - `SchedulerError`: High-level wrapper for run and subject context

use chrono::NaiveDateTime;
use std::fmt;

/// Errors from ledger operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Storage operation failed.
    StorageFailed { reason: String },
    /// The trigger was claimed but its notification could not be stored.
    /// The claim stands, so the trigger will not fire again.
    NotificationLost { key: String },
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StorageFailed { reason } => write!(f, "trigger ledger storage failed: {reason}"),
            Self::NotificationLost { key } => {
                write!(f, "trigger {key} was claimed but its notification was lost")
            }
        }
    }
}

impl std::error::Error for LedgerError {}

/// Errors from trigger adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// Listing candidate subjects failed.
    CandidateFetch { adapter: &'static str },
    /// A subject's anchor could not be turned into an instant.
    Anchor { subject: String },
    /// A lookup needed to compose a notification failed.
    Lookup { what: String },
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CandidateFetch { adapter } => {
                write!(f, "{adapter} could not list candidates")
            }
            Self::Anchor { subject } => write!(f, "cannot compute anchor for {subject}"),
            Self::Lookup { what } => write!(f, "lookup failed: {what}"),
        }
    }
}

impl std::error::Error for AdapterError {}

/// Errors from zone and local time handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// Invalid timezone.
    InvalidTimezone { timezone: String },
    /// A local time that no nearby instant maps to.
    UnresolvableLocalTime { local: NaiveDateTime },
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTimezone { timezone } => {
                write!(f, "invalid timezone: {timezone}")
            }
            Self::UnresolvableLocalTime { local } => {
                write!(f, "local time {local} does not exist in the configured zone")
            }
        }
    }
}

impl std::error::Error for ScheduleError {}

/// High-level scheduler errors.
///
/// Use these to add context when wrapping lower-level errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// A whole run failed before any subject was processed (use as context wrapper).
    Run { adapter: &'static str },
    /// Processing one subject failed (use as context wrapper).
    Subject { adapter: &'static str, subject: String },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Run { adapter } => write!(f, "{adapter} run failed"),
            Self::Subject { adapter, subject } => {
                write!(f, "{adapter} failed while processing {subject}")
            }
        }
    }
}

impl std::error::Error for SchedulerError {}
