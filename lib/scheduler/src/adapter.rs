//! The seam between the trigger engine and a kind of subject.

use crate::error::AdapterError;
use crate::key::{PlannedTrigger, ScanWindow, SubjectRef};
use async_trait::async_trait;
use chrono::Duration;
use duebell_core::Result;
use duebell_notification::NewNotification;

/// Supplies subjects, their triggers, and the notification each trigger sends.
///
/// The engine owns due checks, dedup, and failure isolation. Adapters only
/// describe their subjects.
#[async_trait]
pub trait TriggerAdapter: Send + Sync {
    type Subject: Send + Sync;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// How far past `now` candidate fetching reaches.
    fn lookahead(&self) -> Duration {
        Duration::zero()
    }

    /// Subjects that may have a trigger due in `window`.
    async fn candidates(&self, window: &ScanWindow) -> Result<Vec<Self::Subject>, AdapterError>;

    fn subject_ref(&self, subject: &Self::Subject) -> SubjectRef;

    /// Inactive subjects fire nothing.
    fn is_active(&self, subject: &Self::Subject) -> bool;

    /// Every trigger the subject currently defines, due or not.
    fn plan(&self, subject: &Self::Subject) -> Result<Vec<PlannedTrigger>, AdapterError>;

    async fn compose(
        &self,
        subject: &Self::Subject,
        trigger: &PlannedTrigger,
    ) -> Result<NewNotification, AdapterError>;
}
