//! Login session entity and repository trait.
//!
//! Maps to the `login_sessions` table, which holds the refresh credential
//! for each user. The table carries at most one row per user: issuing a new
//! session replaces the previous row, which is what invalidates older
//! logins on every other device.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// The durable pairing of a user with their current refresh credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginSession {
    /// Database-assigned primary key
    pub id: i64,

    /// Owning user; unique across the table
    #[serde(rename = "userId")]
    pub user_id: i64,

    /// The signed refresh credential itself
    #[serde(skip_serializing)]
    pub token: String,

    /// When this session was established
    pub created_at: DateTime<Utc>,
}

/// Repository trait for refresh-session storage.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Store a new refresh credential for a user, deleting any previous
    /// row in the same transaction so at most one session survives.
    async fn replace_for_user(&self, user_id: i64, token: &str) -> Result<LoginSession, AppError>;

    /// Look up the current session for a user.
    async fn find_by_user(&self, user_id: i64) -> Result<Option<LoginSession>, AppError>;

    /// Delete the session for a user (logout / forced invalidation).
    /// Returns the number of rows removed.
    async fn delete_for_user(&self, user_id: i64) -> Result<u64, AppError>;
}
