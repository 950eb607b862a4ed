//! The user directory.

use super::{decode, decode_opt};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duebell_core::{Result, UserId};
use duebell_org::{DirectReports, DirectoryError, Role, User, UserDirectory};
use rootcause::Report;
use sqlx::{FromRow, PgPool};
use tracing::instrument;

/// Row type for user queries.
#[derive(FromRow)]
struct UserRow {
    id: String,
    email: String,
    display_name: Option<String>,
    role: String,
    active: bool,
    manager_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn try_into_user(self) -> sqlx::Result<User> {
        Ok(User::with_all_fields(
            decode("user id", &self.id)?,
            self.email,
            self.display_name,
            decode::<Role>("role", &self.role)?,
            self.active,
            decode_opt("manager id", self.manager_id.as_deref())?,
            self.created_at,
            self.updated_at,
        ))
    }
}

/// Advisory lock key serializing manager edge writes.
const MANAGER_EDGE_LOCK: i64 = 0x6475_6562_656c_6c01;

fn failed(err: sqlx::Error) -> Report<DirectoryError> {
    DirectoryError::StorageFailed {
        reason: err.to_string(),
    }
    .into()
}

/// Users and their manager pointers in the `users` table.
#[derive(Debug, Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DirectReports for PgUserDirectory {
    async fn direct_reports_of(&self, manager: UserId) -> Result<Vec<UserId>, DirectoryError> {
        let ids: Vec<(String,)> =
            sqlx::query_as("SELECT id FROM users WHERE manager_id = $1 ORDER BY id")
                .bind(manager.to_string())
                .fetch_all(&self.pool)
                .await
                .map_err(failed)?;
        ids.iter()
            .map(|(id,)| decode("user id", id).map_err(failed))
            .collect()
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, DirectoryError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, email, display_name, role, active, manager_id, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(failed)?;

        row.map(UserRow::try_into_user).transpose().map_err(failed)
    }

    async fn list_users(&self) -> Result<Vec<User>, DirectoryError> {
        let rows: Vec<UserRow> = sqlx::query_as(
            r#"
            SELECT id, email, display_name, role, active, manager_id, created_at, updated_at
            FROM users
            ORDER BY email
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(failed)?;

        rows.into_iter()
            .map(|r| r.try_into_user().map_err(failed))
            .collect()
    }

    #[instrument(skip(self))]
    async fn set_manager(
        &self,
        employee: UserId,
        manager: Option<UserId>,
    ) -> Result<(), DirectoryError> {
        let mut tx = self.pool.begin().await.map_err(failed)?;
        // Edge writes take turns, so each one sees every edge committed before it.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(MANAGER_EDGE_LOCK)
            .execute(&mut *tx)
            .await
            .map_err(failed)?;

        // Refuses the write when `employee` is already above `manager`.
        let result = sqlx::query(
            r#"
            UPDATE users
            SET manager_id = $2, updated_at = now()
            WHERE id = $1
              AND NOT EXISTS (
                  WITH RECURSIVE chain (id) AS (
                      SELECT $2::text
                      UNION
                      SELECT u.manager_id
                      FROM users u
                      JOIN chain c ON u.id = c.id
                      WHERE u.manager_id IS NOT NULL
                  )
                  SELECT 1 FROM chain WHERE chain.id = $1
              )
            "#,
        )
        .bind(employee.to_string())
        .bind(manager.map(|m| m.to_string()))
        .execute(&mut *tx)
        .await
        .map_err(failed)?;

        if result.rows_affected() == 0 {
            let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1")
                .bind(employee.to_string())
                .fetch_optional(&mut *tx)
                .await
                .map_err(failed)?;
            return Err(match (exists, manager) {
                (Some(_), Some(manager)) => DirectoryError::EdgeRejected { employee, manager },
                _ => DirectoryError::UserNotFound { id: employee },
            }
            .into());
        }
        tx.commit().await.map_err(failed)?;
        Ok(())
    }
}
