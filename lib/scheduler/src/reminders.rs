//! Meeting reminders: a same-day alert at the start plus one per offset.

use crate::adapter::TriggerAdapter;
use crate::error::AdapterError;
use crate::key::{OffsetKey, PlannedTrigger, ScanWindow, SubjectRef};
use crate::zone::resolve_local;
use async_trait::async_trait;
use chrono::Duration;
use chrono_tz::Tz;
use duebell_core::Result;
use duebell_meeting::{Meeting, MeetingStore};
use duebell_notification::{NewNotification, NotificationKind};
use rootcause::prelude::ResultExt;
use std::sync::Arc;

/// Default reach of the candidate query past now, measured against each
/// meeting's earliest reminder.
pub const DEFAULT_LOOKAHEAD_DAYS: i64 = 30;

/// Reminds meeting owners before their meetings.
///
/// Meeting start times are local to `zone` and become instants only here,
/// at evaluation time.
pub struct MeetingReminders {
    meetings: Arc<dyn MeetingStore>,
    zone: Tz,
    lookahead: Duration,
}

impl MeetingReminders {
    pub fn new(meetings: Arc<dyn MeetingStore>, zone: Tz) -> Self {
        Self {
            meetings,
            zone,
            lookahead: Duration::days(DEFAULT_LOOKAHEAD_DAYS),
        }
    }

    #[must_use]
    pub fn with_lookahead(mut self, lookahead: Duration) -> Self {
        self.lookahead = lookahead;
        self
    }
}

#[async_trait]
impl TriggerAdapter for MeetingReminders {
    type Subject = Meeting;

    fn name(&self) -> &'static str {
        "meeting-reminders"
    }

    fn lookahead(&self) -> Duration {
        self.lookahead
    }

    async fn candidates(&self, window: &ScanWindow) -> Result<Vec<Meeting>, AdapterError> {
        let from = window.earliest.with_timezone(&self.zone).date_naive();
        let to = window.latest.with_timezone(&self.zone).date_naive();
        self.meetings
            .list_reminder_candidates(from, to)
            .await
            .context(AdapterError::CandidateFetch {
                adapter: self.name(),
            })
    }

    fn subject_ref(&self, meeting: &Meeting) -> SubjectRef {
        SubjectRef::Meeting(meeting.id)
    }

    fn is_active(&self, meeting: &Meeting) -> bool {
        meeting.alarm_enabled
    }

    fn plan(&self, meeting: &Meeting) -> Result<Vec<PlannedTrigger>, AdapterError> {
        let start = resolve_local(self.zone, meeting.local_start()).context(
            AdapterError::Anchor {
                subject: meeting.id.to_string(),
            },
        )?;
        Ok(std::iter::once(0)
            .chain(meeting.reminder_offsets.iter())
            .map(|minutes| PlannedTrigger {
                offset: OffsetKey::MinutesBefore(minutes),
                fires_at: start - Duration::minutes(i64::from(minutes)),
            })
            .collect())
    }

    async fn compose(
        &self,
        meeting: &Meeting,
        trigger: &PlannedTrigger,
    ) -> Result<NewNotification, AdapterError> {
        let minutes = match trigger.offset {
            OffsetKey::MinutesBefore(minutes) => minutes,
            OffsetKey::At(_) => 0,
        };
        Ok(NewNotification::new(
            NotificationKind::MeetingReminder,
            meeting.created_by,
            format!("Meeting reminder: {}", meeting.title),
            reminder_body(meeting, minutes),
        )
        .about_meeting(meeting.id))
    }
}

fn reminder_body(meeting: &Meeting, minutes_before: u32) -> String {
    let when = if meeting.all_day {
        "all day".to_string()
    } else {
        meeting.local_start().format("%H:%M").to_string()
    };
    let location = match meeting.location.as_deref().map(str::trim) {
        Some(place) if !place.is_empty() => format!(" • {place}"),
        _ => String::new(),
    };
    format!(
        "Meeting on {} at {when}{location}\nReminder: {}",
        meeting.date,
        before_human(minutes_before)
    )
}

/// Renders an offset in the largest whole unit.
fn before_human(minutes: u32) -> String {
    const DAY: u32 = 24 * 60;
    let (count, unit) = match minutes {
        0 => return "mandatory same-day alert".to_string(),
        m if m % DAY == 0 => (m / DAY, "day"),
        m if m % 60 == 0 => (m / 60, "hour"),
        m => (m, "minute"),
    };
    let plural = if count == 1 { "" } else { "s" };
    format!("{count} {unit}{plural} before")
}
