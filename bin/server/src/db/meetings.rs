//! Meetings and their reminder offsets.

use super::decode;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use duebell_core::{MeetingId, Result, UserId};
use duebell_meeting::{Meeting, MeetingError, MeetingStore, ReminderOffsets};
use rootcause::Report;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::instrument;

/// Meeting columns plus the aggregated offsets. Expects `FROM meetings m
/// LEFT JOIN meeting_reminders r` and a trailing `GROUP BY m.id`.
const SELECT_MEETINGS: &str = r#"
    SELECT m.id, m.title, m.date, m.start_time, m.end_time, m.all_day, m.alarm_enabled,
           m.location, m.content, m.outcome, m.created_by, m.created_at, m.updated_at,
           COALESCE(
               array_agg(r.minutes_before) FILTER (WHERE r.minutes_before IS NOT NULL),
               '{}'
           ) AS reminder_minutes
    FROM meetings m
    LEFT JOIN meeting_reminders r ON r.meeting_id = m.id
"#;

const ORDER_MEETINGS: &str = "ORDER BY m.date, m.start_time NULLS FIRST, m.id";

/// Row type for meeting queries.
#[derive(FromRow)]
struct MeetingRow {
    id: String,
    title: String,
    date: NaiveDate,
    start_time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
    all_day: bool,
    alarm_enabled: bool,
    location: Option<String>,
    content: Option<String>,
    outcome: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    reminder_minutes: Vec<i32>,
}

impl MeetingRow {
    fn try_into_meeting(self) -> sqlx::Result<Meeting> {
        Ok(Meeting {
            id: decode("meeting id", &self.id)?,
            title: self.title,
            date: self.date,
            start_time: self.start_time,
            end_time: self.end_time,
            all_day: self.all_day,
            alarm_enabled: self.alarm_enabled,
            location: self.location,
            content: self.content,
            outcome: self.outcome,
            created_by: decode("owner id", &self.created_by)?,
            reminder_offsets: self.reminder_minutes.into_iter().map(i64::from).collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn failed(err: sqlx::Error) -> Report<MeetingError> {
    MeetingError::StorageFailed {
        reason: err.to_string(),
    }
    .into()
}

fn into_meetings(rows: Vec<MeetingRow>) -> Result<Vec<Meeting>, MeetingError> {
    rows.into_iter()
        .map(|r| r.try_into_meeting().map_err(failed))
        .collect()
}

/// Rewrites a meeting's offsets inside `tx`.
async fn replace_offsets(
    tx: &mut Transaction<'_, Postgres>,
    id: MeetingId,
    offsets: &ReminderOffsets,
) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM meeting_reminders WHERE meeting_id = $1")
        .bind(id.to_string())
        .execute(&mut **tx)
        .await?;
    let minutes: Vec<i32> = offsets
        .iter()
        .filter_map(|m| i32::try_from(m).ok())
        .collect();
    sqlx::query(
        r#"
        INSERT INTO meeting_reminders (meeting_id, minutes_before)
        SELECT $1, unnest($2::int4[])
        "#,
    )
    .bind(id.to_string())
    .bind(minutes)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Meetings in `meetings`, offsets in `meeting_reminders`.
#[derive(Debug, Clone)]
pub struct PgMeetingStore {
    pool: PgPool,
}

impl PgMeetingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn write(&self, meeting: &Meeting, insert: bool) -> sqlx::Result<u64> {
        let mut tx = self.pool.begin().await?;
        let sql = if insert {
            r#"
            INSERT INTO meetings (id, title, date, start_time, end_time, all_day, alarm_enabled,
                location, content, outcome, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#
        } else {
            r#"
            UPDATE meetings
            SET title = $2, date = $3, start_time = $4, end_time = $5, all_day = $6,
                alarm_enabled = $7, location = $8, content = $9, outcome = $10,
                created_by = $11, created_at = $12, updated_at = $13
            WHERE id = $1
            "#
        };
        let written = sqlx::query(sql)
            .bind(meeting.id.to_string())
            .bind(&meeting.title)
            .bind(meeting.date)
            .bind(meeting.start_time)
            .bind(meeting.end_time)
            .bind(meeting.all_day)
            .bind(meeting.alarm_enabled)
            .bind(&meeting.location)
            .bind(&meeting.content)
            .bind(&meeting.outcome)
            .bind(meeting.created_by.to_string())
            .bind(meeting.created_at)
            .bind(meeting.updated_at)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if written > 0 {
            replace_offsets(&mut tx, meeting.id, &meeting.reminder_offsets).await?;
        }
        tx.commit().await?;
        Ok(written)
    }
}

#[async_trait]
impl MeetingStore for PgMeetingStore {
    async fn find(&self, id: MeetingId) -> Result<Option<Meeting>, MeetingError> {
        let row: Option<MeetingRow> =
            sqlx::query_as(&format!("{SELECT_MEETINGS} WHERE m.id = $1 GROUP BY m.id"))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(failed)?;
        row.map(MeetingRow::try_into_meeting)
            .transpose()
            .map_err(failed)
    }

    #[instrument(skip_all, fields(meeting = %meeting.id))]
    async fn insert(&self, meeting: &Meeting) -> Result<(), MeetingError> {
        self.write(meeting, true).await.map_err(failed)?;
        Ok(())
    }

    #[instrument(skip_all, fields(meeting = %meeting.id))]
    async fn update(&self, meeting: &Meeting) -> Result<(), MeetingError> {
        if self.write(meeting, false).await.map_err(failed)? == 0 {
            return Err(MeetingError::NotFound { id: meeting.id }.into());
        }
        Ok(())
    }

    async fn delete(&self, id: MeetingId) -> Result<(), MeetingError> {
        sqlx::query("DELETE FROM meetings WHERE id = $1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(failed)?;
        Ok(())
    }

    async fn list_owned_between(
        &self,
        owner: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Meeting>, MeetingError> {
        let rows: Vec<MeetingRow> = sqlx::query_as(&format!(
            "{SELECT_MEETINGS} WHERE m.created_by = $1 AND m.date BETWEEN $2 AND $3 \
             GROUP BY m.id {ORDER_MEETINGS}"
        ))
        .bind(owner.to_string())
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(failed)?;
        into_meetings(rows)
    }

    // The HAVING bound ignores the start time and rounds the lead down to
    // whole days, then allows one more day, so it can only over-select.
    #[instrument(skip(self))]
    async fn list_reminder_candidates(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Meeting>, MeetingError> {
        let rows: Vec<MeetingRow> = sqlx::query_as(&format!(
            "{SELECT_MEETINGS} WHERE m.date >= $1 GROUP BY m.id \
             HAVING m.date - (COALESCE(max(r.minutes_before), 0) / 1440) - 1 <= $2 \
             {ORDER_MEETINGS}"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(failed)?;
        into_meetings(rows)
    }
}
