//! Meeting storage seam and an in-memory implementation.

use crate::error::MeetingError;
use crate::meeting::Meeting;
use async_trait::async_trait;
use chrono::NaiveDate;
use duebell_core::{MeetingId, Result, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Persistence for meetings.
#[async_trait]
pub trait MeetingStore: Send + Sync {
    /// Finds a meeting by ID, regardless of owner.
    async fn find(&self, id: MeetingId) -> Result<Option<Meeting>, MeetingError>;

    /// Inserts a new meeting.
    async fn insert(&self, meeting: &Meeting) -> Result<(), MeetingError>;

    /// Replaces a stored meeting.
    async fn update(&self, meeting: &Meeting) -> Result<(), MeetingError>;

    /// Deletes a meeting. Deleting a missing meeting is not an error.
    async fn delete(&self, id: MeetingId) -> Result<(), MeetingError>;

    /// Lists one owner's meetings dated within `from..=to`, by date.
    async fn list_owned_between(
        &self,
        owner: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Meeting>, MeetingError>;

    /// Lists every meeting dated on or after `from` whose earliest reminder
    /// falls on or before `to`, for the reminder scan.
    ///
    /// Implementations may return a superset; the engine discards triggers
    /// that are not due.
    async fn list_reminder_candidates(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Meeting>, MeetingError>;
}

#[async_trait]
impl<T: MeetingStore + ?Sized> MeetingStore for Arc<T> {
    async fn find(&self, id: MeetingId) -> Result<Option<Meeting>, MeetingError> {
        (**self).find(id).await
    }

    async fn insert(&self, meeting: &Meeting) -> Result<(), MeetingError> {
        (**self).insert(meeting).await
    }

    async fn update(&self, meeting: &Meeting) -> Result<(), MeetingError> {
        (**self).update(meeting).await
    }

    async fn delete(&self, id: MeetingId) -> Result<(), MeetingError> {
        (**self).delete(id).await
    }

    async fn list_owned_between(
        &self,
        owner: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Meeting>, MeetingError> {
        (**self).list_owned_between(owner, from, to).await
    }

    async fn list_reminder_candidates(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Meeting>, MeetingError> {
        (**self).list_reminder_candidates(from, to).await
    }
}

/// Meetings kept in a map.
#[derive(Debug, Default)]
pub struct InMemoryMeetingStore {
    meetings: Mutex<HashMap<MeetingId, Meeting>>,
}

impl InMemoryMeetingStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn meetings(&self) -> MutexGuard<'_, HashMap<MeetingId, Meeting>> {
        self.meetings.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn matching(&self, keep: impl Fn(&Meeting) -> bool) -> Vec<Meeting> {
        let mut out: Vec<Meeting> = self
            .meetings()
            .values()
            .filter(|m| keep(m))
            .cloned()
            .collect();
        out.sort_by_key(|m| (m.local_start(), m.id));
        out
    }
}

#[async_trait]
impl MeetingStore for InMemoryMeetingStore {
    async fn find(&self, id: MeetingId) -> Result<Option<Meeting>, MeetingError> {
        Ok(self.meetings().get(&id).cloned())
    }

    async fn insert(&self, meeting: &Meeting) -> Result<(), MeetingError> {
        self.meetings().insert(meeting.id, meeting.clone());
        Ok(())
    }

    async fn update(&self, meeting: &Meeting) -> Result<(), MeetingError> {
        let mut meetings = self.meetings();
        match meetings.get_mut(&meeting.id) {
            Some(slot) => {
                *slot = meeting.clone();
                Ok(())
            }
            None => Err(MeetingError::NotFound { id: meeting.id }.into()),
        }
    }

    async fn delete(&self, id: MeetingId) -> Result<(), MeetingError> {
        self.meetings().remove(&id);
        Ok(())
    }

    async fn list_owned_between(
        &self,
        owner: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Meeting>, MeetingError> {
        Ok(self.matching(|m| m.created_by == owner && (from..=to).contains(&m.date)))
    }

    async fn list_reminder_candidates(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Meeting>, MeetingError> {
        Ok(self.matching(|m| m.date >= from && m.first_reminder_date() <= to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offsets::ReminderOffsets;
    use chrono::{NaiveTime, Utc};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn meeting(date: NaiveDate, offsets: &[i64]) -> Meeting {
        let now = Utc::now();
        Meeting {
            id: MeetingId::new(),
            title: "Planning".to_string(),
            date,
            start_time: NaiveTime::from_hms_opt(10, 0, 0),
            end_time: None,
            all_day: false,
            alarm_enabled: true,
            location: None,
            content: None,
            outcome: None,
            created_by: UserId::new(),
            reminder_offsets: ReminderOffsets::new(offsets.to_vec()),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn reminder_candidates_follow_the_earliest_reminder() {
        let store = InMemoryMeetingStore::new();
        let far_with_long_lead = meeting(day(2025, 5, 30), &[86_400]);
        let far_without_lead = meeting(day(2025, 6, 1), &[60]);
        let past = meeting(day(2025, 2, 20), &[]);
        let today = meeting(day(2025, 3, 1), &[]);
        for m in [&far_with_long_lead, &far_without_lead, &past, &today] {
            store.insert(m).await.unwrap();
        }

        let found = store
            .list_reminder_candidates(day(2025, 2, 27), day(2025, 4, 1))
            .await
            .unwrap();

        let ids: Vec<_> = found.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![today.id, far_with_long_lead.id]);
    }
}
