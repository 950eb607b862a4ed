//! Meetings for duebell.
//!
//! A meeting is a dated calendar entry owned by its creator, with an alarm
//! toggle and a normalized list of reminder offsets. The trigger engine reads
//! meetings through [`MeetingStore::list_reminder_candidates`].

pub mod book;
pub mod error;
pub mod meeting;
pub mod offsets;
pub mod store;

pub use book::MeetingBook;
pub use error::MeetingError;
pub use meeting::{DEFAULT_START, Meeting, MeetingDraft, MeetingFields};
pub use offsets::{MAX_OFFSET_MINUTES, ReminderOffsets};
pub use store::{InMemoryMeetingStore, MeetingStore};
