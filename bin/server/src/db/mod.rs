//! Postgres implementations of the collaborator traits.
//!
//! Ids are stored in their prefixed text form (`usr_...`, `task_...`).

pub mod ledger;
pub mod meetings;
pub mod notifications;
pub mod tasks;
pub mod users;

pub use ledger::PgTriggerLedger;
pub use meetings::PgMeetingStore;
pub use notifications::PgNotificationStore;
pub use tasks::PgTaskStore;
pub use users::PgUserDirectory;

use std::fmt::Display;
use std::str::FromStr;

/// Parses a text column, reporting bad data as a decode error.
pub(crate) fn decode<T>(column: &str, raw: &str) -> sqlx::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse().map_err(|e| {
        sqlx::Error::Decode(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("invalid {column} '{raw}': {e}"),
        )))
    })
}

/// Like [`decode`] for nullable columns.
pub(crate) fn decode_opt<T>(column: &str, raw: Option<&str>) -> sqlx::Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    raw.map(|raw| decode(column, raw)).transpose()
}
