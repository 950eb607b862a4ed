//! Meeting domain type and draft validation.

use crate::error::MeetingError;
use crate::offsets::ReminderOffsets;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use duebell_core::{MeetingId, Result, UserId};
use serde::{Deserialize, Serialize};

/// Maximum title length, in characters.
pub const MAX_TITLE_CHARS: usize = 140;

/// Local start time used when a meeting has no explicit start.
pub const DEFAULT_START: NaiveTime = match NaiveTime::from_hms_opt(9, 0, 0) {
    Some(t) => t,
    None => panic!("09:00 is a valid time"),
};

/// A calendar entry owned by the user who created it.
///
/// Date and times are local calendar fields in the organization's configured
/// zone; they become instants only when a reminder is evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    pub id: MeetingId,
    pub title: String,
    pub date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub all_day: bool,
    /// When false, no reminder fires, not even the one at start.
    pub alarm_enabled: bool,
    pub location: Option<String>,
    /// Notes.
    pub content: Option<String>,
    /// Conclusions and action items.
    pub outcome: Option<String>,
    pub created_by: UserId,
    #[serde(rename = "reminderMinutesBefore")]
    pub reminder_offsets: ReminderOffsets,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Meeting {
    /// Creates a meeting from validated fields.
    #[must_use]
    pub fn create(owner: UserId, fields: MeetingFields, now: DateTime<Utc>) -> Self {
        let mut meeting = Self {
            id: MeetingId::new(),
            title: String::new(),
            date: fields.date,
            start_time: None,
            end_time: None,
            all_day: true,
            alarm_enabled: true,
            location: None,
            content: None,
            outcome: None,
            created_by: owner,
            reminder_offsets: ReminderOffsets::default(),
            created_at: now,
            updated_at: now,
        };
        meeting.apply(fields, now);
        meeting
    }

    /// Overwrites every editable field.
    pub fn apply(&mut self, fields: MeetingFields, now: DateTime<Utc>) {
        self.title = fields.title;
        self.date = fields.date;
        self.start_time = fields.start_time;
        self.end_time = fields.end_time;
        self.all_day = fields.all_day;
        self.alarm_enabled = fields.alarm_enabled;
        self.location = fields.location;
        self.content = fields.content;
        self.outcome = fields.outcome;
        self.reminder_offsets = fields.reminder_offsets;
        self.updated_at = now;
    }

    /// Returns the local date and time the meeting starts.
    ///
    /// All-day meetings, and meetings without a start time, start at 09:00.
    #[must_use]
    pub fn local_start(&self) -> NaiveDateTime {
        let time = match self.start_time {
            Some(t) if !self.all_day => t,
            _ => DEFAULT_START,
        };
        self.date.and_time(time)
    }

    /// Returns the local date of the earliest reminder, counting the alert
    /// at the start.
    #[must_use]
    pub fn first_reminder_date(&self) -> NaiveDate {
        let lead = Duration::minutes(i64::from(self.reminder_offsets.largest()));
        (self.local_start() - lead).date()
    }
}

/// Meeting input as submitted by a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeetingDraft {
    pub title: Option<String>,
    /// `YYYY-MM-DD`.
    pub date: Option<String>,
    /// `HH:mm`.
    pub start_time: Option<String>,
    /// `HH:mm`.
    pub end_time: Option<String>,
    pub all_day: bool,
    /// Defaults to on for new meetings and to the stored value on update.
    pub alarm_enabled: Option<bool>,
    pub location: Option<String>,
    pub content: Option<String>,
    pub outcome: Option<String>,
    pub reminder_minutes_before: Vec<i64>,
}

/// Validated meeting fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingFields {
    title: String,
    date: NaiveDate,
    start_time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
    all_day: bool,
    alarm_enabled: bool,
    location: Option<String>,
    content: Option<String>,
    outcome: Option<String>,
    reminder_offsets: ReminderOffsets,
}

impl MeetingDraft {
    /// Validates the draft.
    ///
    /// `stored_alarm` is the current alarm flag when updating, `None` when
    /// creating.
    pub fn validate(self, stored_alarm: Option<bool>) -> Result<MeetingFields, MeetingError> {
        let title = self
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| MeetingError::invalid("title", "is required"))?;
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(MeetingError::invalid(
                "title",
                format!("must be at most {MAX_TITLE_CHARS} characters"),
            )
            .into());
        }

        let date = self
            .date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
            .ok_or_else(|| MeetingError::invalid("date", "must be YYYY-MM-DD"))?;

        let (start_time, end_time) = if self.all_day {
            (None, None)
        } else {
            let start = match non_blank(self.start_time.as_deref()) {
                None => {
                    return Err(
                        MeetingError::invalid("startTime", "is required unless allDay").into(),
                    );
                }
                Some(raw) => parse_time(raw)
                    .ok_or_else(|| MeetingError::invalid("startTime", "must be HH:mm"))?,
            };
            let end = match non_blank(self.end_time.as_deref()) {
                None => None,
                Some(raw) => {
                    let end = parse_time(raw)
                        .ok_or_else(|| MeetingError::invalid("endTime", "must be HH:mm"))?;
                    if end <= start {
                        return Err(
                            MeetingError::invalid("endTime", "must be after startTime").into(),
                        );
                    }
                    Some(end)
                }
            };
            (Some(start), end)
        };

        let alarm_enabled = self.alarm_enabled.or(stored_alarm).unwrap_or(true);

        Ok(MeetingFields {
            title: title.to_string(),
            date,
            start_time,
            end_time,
            all_day: self.all_day,
            alarm_enabled,
            location: non_blank(self.location.as_deref()).map(str::to_string),
            content: self.content,
            outcome: self.outcome,
            reminder_offsets: ReminderOffsets::new(self.reminder_minutes_before),
        })
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> MeetingDraft {
        MeetingDraft {
            title: Some("  Weekly sync ".to_string()),
            date: Some("2025-03-10".to_string()),
            start_time: Some("14:30".to_string()),
            end_time: Some("15:00".to_string()),
            reminder_minutes_before: vec![120, 2880, 120, 0],
            ..MeetingDraft::default()
        }
    }

    fn field(err: &rootcause::Report<MeetingError>) -> &'static str {
        match err.current_context() {
            MeetingError::Validation { field, .. } => *field,
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn valid_draft_is_trimmed_and_normalized() {
        let fields = draft().validate(None).unwrap();
        let meeting = Meeting::create(UserId::new(), fields, Utc::now());

        assert_eq!(meeting.title, "Weekly sync");
        assert_eq!(meeting.start_time, NaiveTime::from_hms_opt(14, 30, 0));
        assert!(meeting.alarm_enabled);
        assert_eq!(meeting.reminder_offsets.as_slice(), &[2880, 120]);
        assert!(meeting.id.to_string().starts_with("mtg_"));
    }

    #[test]
    fn title_is_required_and_bounded() {
        let mut d = draft();
        d.title = Some("   ".to_string());
        assert_eq!(field(&d.validate(None).unwrap_err()), "title");

        let mut d = draft();
        d.title = Some("x".repeat(MAX_TITLE_CHARS + 1));
        assert_eq!(field(&d.validate(None).unwrap_err()), "title");
    }

    #[test]
    fn date_must_be_iso() {
        let mut d = draft();
        d.date = Some("10/03/2025".to_string());
        assert_eq!(field(&d.validate(None).unwrap_err()), "date");
    }

    #[test]
    fn timed_meetings_need_a_start_before_the_end() {
        let mut d = draft();
        d.start_time = None;
        assert_eq!(field(&d.validate(None).unwrap_err()), "startTime");

        let mut d = draft();
        d.end_time = Some("14:30".to_string());
        assert_eq!(field(&d.validate(None).unwrap_err()), "endTime");

        let mut d = draft();
        d.start_time = Some("2pm".to_string());
        assert_eq!(field(&d.validate(None).unwrap_err()), "startTime");
    }

    #[test]
    fn all_day_meetings_drop_times_and_start_at_nine() {
        let mut d = draft();
        d.all_day = true;
        d.start_time = Some("garbage".to_string());
        let meeting = Meeting::create(UserId::new(), d.validate(None).unwrap(), Utc::now());

        assert_eq!(meeting.start_time, None);
        assert_eq!(meeting.end_time, None);
        assert_eq!(meeting.local_start().time(), DEFAULT_START);
    }

    #[test]
    fn first_reminder_date_reaches_back_by_the_largest_offset() {
        let mut meeting = Meeting::create(UserId::new(), draft().validate(None).unwrap(), Utc::now());
        assert_eq!(meeting.first_reminder_date(), NaiveDate::from_ymd_opt(2025, 3, 8).unwrap());

        meeting.reminder_offsets = ReminderOffsets::new([86_400]);
        assert_eq!(meeting.first_reminder_date(), NaiveDate::from_ymd_opt(2025, 1, 9).unwrap());

        meeting.reminder_offsets = ReminderOffsets::default();
        assert_eq!(meeting.first_reminder_date(), meeting.date);
    }

    #[test]
    fn alarm_defaults_on_create_and_sticks_on_update() {
        let mut d = draft();
        d.alarm_enabled = None;
        assert!(d.clone().validate(None).unwrap().alarm_enabled);
        assert!(!d.clone().validate(Some(false)).unwrap().alarm_enabled);

        d.alarm_enabled = Some(true);
        assert!(d.validate(Some(false)).unwrap().alarm_enabled);
    }

    #[test]
    fn draft_deserializes_from_client_json() {
        let d: MeetingDraft = serde_json::from_str(
            r#"{"title":"Board","date":"2025-01-02","allDay":true,"reminderMinutesBefore":[1440]}"#,
        )
        .expect("parse");
        assert!(d.all_day);
        assert_eq!(d.reminder_minutes_before, vec![1440]);
        assert_eq!(d.alarm_enabled, None);
    }
}
