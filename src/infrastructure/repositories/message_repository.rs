//! Message Repository Implementation
//!
//! PostgreSQL implementation of the MessageRepository trait. The store
//! assigns message ids and timestamps on insert; history queries join the
//! author's username and any attached file metadata.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{FileAttachment, Message, MessageRepository};
use crate::shared::error::AppError;

/// Database row joining messages with users and uploaded_files.
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: i64,
    room_name: String,
    user_id: i64,
    username: String,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    file_id: Option<i64>,
    file_public_id: Option<String>,
    file_secure_url: Option<String>,
    file_format: Option<String>,
    file_resource_type: Option<String>,
    file_size_kb: Option<f64>,
    file_width: Option<i32>,
    file_height: Option<i32>,
    file_original_filename: Option<String>,
    file_created_at: Option<DateTime<Utc>>,
}

impl MessageRow {
    /// Convert database row to domain Message entity.
    fn into_message(self) -> Message {
        let file = match (
            self.file_id,
            self.file_public_id,
            self.file_secure_url,
            self.file_format,
            self.file_resource_type,
            self.file_size_kb,
            self.file_original_filename,
            self.file_created_at,
        ) {
            (
                Some(id),
                Some(public_id),
                Some(secure_url),
                Some(format),
                Some(resource_type),
                Some(size),
                Some(original_filename),
                Some(created_at),
            ) => Some(FileAttachment {
                id,
                public_id,
                secure_url,
                format,
                resource_type,
                size,
                width: self.file_width,
                height: self.file_height,
                original_filename,
                created_at,
            }),
            _ => None,
        };

        Message {
            id: self.id,
            room_name: self.room_name,
            user_id: self.user_id,
            username: self.username,
            content: self.content,
            file,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const SELECT_MESSAGE: &str = r#"
    SELECT m.id, m.room_name, m.user_id, u.username, m.content,
           m.created_at, m.updated_at,
           f.id AS file_id, f.public_id AS file_public_id,
           f.secure_url AS file_secure_url, f.format AS file_format,
           f.resource_type AS file_resource_type, f.size_kb AS file_size_kb,
           f.width AS file_width, f.height AS file_height,
           f.original_filename AS file_original_filename,
           f.created_at AS file_created_at
    FROM messages m
    INNER JOIN users u ON u.id = m.user_id
    LEFT JOIN uploaded_files f ON f.id = m.file_id
"#;

/// PostgreSQL message repository implementation.
#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    /// Create a new PgMessageRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn create(
        &self,
        user_id: i64,
        username: &str,
        room_name: &str,
        content: &str,
        file_id: Option<i64>,
    ) -> Result<Message, AppError> {
        #[derive(sqlx::FromRow)]
        struct InsertedRow {
            id: i64,
            created_at: DateTime<Utc>,
            updated_at: DateTime<Utc>,
        }

        let row = sqlx::query_as::<_, InsertedRow>(
            r#"
            INSERT INTO messages (user_id, room_name, content, file_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(room_name)
        .bind(content)
        .bind(file_id)
        .fetch_one(&self.pool)
        .await?;

        // The attachment join is only needed on the history path; a freshly
        // created message carries the metadata the caller already holds.
        Ok(Message {
            id: row.id,
            room_name: room_name.to_string(),
            user_id,
            username: username.to_string(),
            content: content.to_string(),
            file: None,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn find_recent(&self, room_name: &str, limit: i64) -> Result<Vec<Message>, AppError> {
        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            "{SELECT_MESSAGE} WHERE m.room_name = $1 ORDER BY m.created_at DESC LIMIT $2"
        ))
        .bind(room_name)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_message()).collect())
    }
}
