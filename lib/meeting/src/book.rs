//! Owner-scoped meeting operations.
//!
//! Every operation is scoped to the calling owner. Another owner's meeting is
//! reported as not found, so IDs do not leak across calendars.

use crate::error::MeetingError;
use crate::meeting::{Meeting, MeetingDraft};
use crate::store::MeetingStore;
use chrono::NaiveDate;
use duebell_core::{Clock, MeetingId, Result, UserId};
use std::sync::Arc;
use tracing::{debug, instrument};

/// A user's calendar.
#[derive(Debug)]
pub struct MeetingBook<S: ?Sized> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: MeetingStore + ?Sized> MeetingBook<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Lists the owner's meetings dated within `from..=to`.
    pub async fn range(
        &self,
        owner: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Meeting>, MeetingError> {
        if to < from {
            return Err(MeetingError::invalid("to", "must not be before from").into());
        }
        self.store.list_owned_between(owner, from, to).await
    }

    pub async fn get(&self, owner: UserId, id: MeetingId) -> Result<Meeting, MeetingError> {
        match self.store.find(id).await? {
            Some(meeting) if meeting.created_by == owner => Ok(meeting),
            _ => Err(MeetingError::NotFound { id }.into()),
        }
    }

    #[instrument(skip(self, draft))]
    pub async fn create(&self, owner: UserId, draft: MeetingDraft) -> Result<Meeting, MeetingError> {
        let fields = draft.validate(None)?;
        let meeting = Meeting::create(owner, fields, self.clock.now());
        self.store.insert(&meeting).await?;
        debug!(meeting = %meeting.id, "meeting created");
        Ok(meeting)
    }

    #[instrument(skip(self, draft))]
    pub async fn update(
        &self,
        owner: UserId,
        id: MeetingId,
        draft: MeetingDraft,
    ) -> Result<Meeting, MeetingError> {
        let mut meeting = self.get(owner, id).await?;
        let fields = draft.validate(Some(meeting.alarm_enabled))?;
        meeting.apply(fields, self.clock.now());
        self.store.update(&meeting).await?;
        Ok(meeting)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, owner: UserId, id: MeetingId) -> Result<(), MeetingError> {
        self.get(owner, id).await?;
        self.store.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryMeetingStore;
    use chrono::{Duration, TimeZone, Utc};
    use duebell_core::ManualClock;

    fn book() -> (Arc<ManualClock>, MeetingBook<InMemoryMeetingStore>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 3, 1, 6, 0, 0).unwrap(),
        ));
        let book = MeetingBook::new(Arc::new(InMemoryMeetingStore::new()), clock.clone());
        (clock, book)
    }

    fn draft(title: &str, date: &str) -> MeetingDraft {
        MeetingDraft {
            title: Some(title.to_string()),
            date: Some(date.to_string()),
            all_day: true,
            ..MeetingDraft::default()
        }
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn other_owners_meetings_are_not_found() {
        let (_clock, book) = book();
        let (alice, bob) = (UserId::new(), UserId::new());
        let meeting = book.create(alice, draft("Plan", "2025-03-05")).await.unwrap();

        assert_eq!(book.get(alice, meeting.id).await.unwrap(), meeting);
        for result in [
            book.get(bob, meeting.id).await.map(|_| ()),
            book.delete(bob, meeting.id).await,
            book.update(bob, meeting.id, draft("Mine", "2025-03-05"))
                .await
                .map(|_| ()),
        ] {
            let err = result.unwrap_err();
            assert!(matches!(err.current_context(), MeetingError::NotFound { .. }));
        }
        assert!(book.get(alice, meeting.id).await.is_ok());
    }

    #[tokio::test]
    async fn update_keeps_alarm_and_bumps_timestamp() {
        let (clock, book) = book();
        let owner = UserId::new();
        let mut d = draft("Plan", "2025-03-05");
        d.alarm_enabled = Some(false);
        let created = book.create(owner, d).await.unwrap();

        clock.advance(Duration::minutes(5));
        let updated = book
            .update(owner, created.id, draft("Plan v2", "2025-03-06"))
            .await
            .unwrap();

        assert!(!updated.alarm_enabled);
        assert_eq!(updated.title, "Plan v2");
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.updated_at, created.created_at + Duration::minutes(5));
    }

    #[tokio::test]
    async fn range_is_owner_scoped_and_inclusive() {
        let (_clock, book) = book();
        let (alice, bob) = (UserId::new(), UserId::new());
        book.create(alice, draft("a1", "2025-03-01")).await.unwrap();
        book.create(alice, draft("a2", "2025-03-07")).await.unwrap();
        book.create(alice, draft("a3", "2025-03-08")).await.unwrap();
        book.create(bob, draft("b1", "2025-03-02")).await.unwrap();

        let titles: Vec<String> = book
            .range(alice, day("2025-03-01"), day("2025-03-07"))
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert_eq!(titles, vec!["a1", "a2"]);

        assert!(book.range(alice, day("2025-03-07"), day("2025-03-01")).await.is_err());
    }

    #[tokio::test]
    async fn delete_removes_the_meeting() {
        let (_clock, book) = book();
        let owner = UserId::new();
        let meeting = book.create(owner, draft("Gone", "2025-03-05")).await.unwrap();

        book.delete(owner, meeting.id).await.unwrap();

        assert!(book.get(owner, meeting.id).await.is_err());
    }

    #[tokio::test]
    async fn invalid_drafts_are_not_stored() {
        let (_clock, book) = book();
        let owner = UserId::new();

        let err = book.create(owner, draft("", "2025-03-05")).await.unwrap_err();
        assert!(matches!(err.current_context(), MeetingError::Validation { .. }));
        assert!(book
            .range(owner, day("2025-01-01"), day("2025-12-31"))
            .await
            .unwrap()
            .is_empty());
    }
}
