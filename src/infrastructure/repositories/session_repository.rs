//! Session Repository Implementation
//!
//! PostgreSQL implementation of the SessionRepository trait. Holds the
//! refresh credential for each user; the UNIQUE(user_id) constraint plus
//! the delete-then-insert in `replace_for_user` keep the single-session
//! invariant even under concurrent logins.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{LoginSession, SessionRepository};
use crate::shared::error::AppError;

/// Database row representation matching the login_sessions table schema.
#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: i64,
    user_id: i64,
    token: String,
    created_at: DateTime<Utc>,
}

impl SessionRow {
    /// Convert database row to domain LoginSession entity.
    fn into_session(self) -> LoginSession {
        LoginSession {
            id: self.id,
            user_id: self.user_id,
            token: self.token,
            created_at: self.created_at,
        }
    }
}

/// PostgreSQL session repository implementation.
#[derive(Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    /// Create a new PgSessionRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    /// Replace the stored refresh credential for a user.
    ///
    /// The delete and insert run in one transaction so other devices are
    /// invalidated atomically with the new session becoming visible.
    async fn replace_for_user(&self, user_id: i64, token: &str) -> Result<LoginSession, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM login_sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            INSERT INTO login_sessions (user_id, token)
            VALUES ($1, $2)
            RETURNING id, user_id, token, created_at
            "#,
        )
        .bind(user_id)
        .bind(token)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row.into_session())
    }

    async fn find_by_user(&self, user_id: i64) -> Result<Option<LoginSession>, AppError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, user_id, token, created_at
            FROM login_sessions
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_session()))
    }

    async fn delete_for_user(&self, user_id: i64) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM login_sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
