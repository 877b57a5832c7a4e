//! Message entity, file attachment metadata, and repository trait.
//!
//! Maps to the `messages` and `uploaded_files` tables. Message ids and
//! timestamps are assigned by the store on insert; the realtime layer
//! broadcasts the stored row, never its own copy of the input.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Metadata of a file uploaded to object storage and attached to a message.
///
/// Maps to the `uploaded_files` table. The upload integration itself lives
/// outside this service; only the stored metadata is modeled so history
/// and broadcast frames can carry it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAttachment {
    pub id: i64,

    #[serde(rename = "publicId")]
    pub public_id: String,

    #[serde(rename = "secureUrl")]
    pub secure_url: String,

    pub format: String,

    #[serde(rename = "resourceType")]
    pub resource_type: String,

    /// Size in kilobytes
    #[serde(rename = "bytes")]
    pub size: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i32>,

    #[serde(rename = "originalFilename")]
    pub original_filename: String,

    pub created_at: DateTime<Utc>,
}

/// Represents a message persisted in a room.
///
/// Maps to the `messages` table:
/// - id: BIGSERIAL PRIMARY KEY
/// - room_name: VARCHAR(64) NOT NULL REFERENCES chat_rooms(name)
/// - user_id: BIGINT NOT NULL REFERENCES users(id)
/// - content: TEXT NOT NULL
/// - file_id: BIGINT NULL REFERENCES uploaded_files(id)
/// - created_at / updated_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Store-assigned primary key
    pub id: i64,

    /// Room the message belongs to
    #[serde(rename = "roomName")]
    pub room_name: String,

    /// Author user id
    #[serde(rename = "userId")]
    pub user_id: i64,

    /// Author username, denormalized for history and broadcast frames
    pub username: String,

    /// Message body
    pub content: String,

    /// Attached file metadata, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileAttachment>,

    /// Store-assigned creation timestamp
    pub created_at: DateTime<Utc>,

    /// Store-assigned update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Repository trait for Message data access operations.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Persist a new message and return the stored row with its assigned
    /// id and timestamps.
    async fn create(
        &self,
        user_id: i64,
        username: &str,
        room_name: &str,
        content: &str,
        file_id: Option<i64>,
    ) -> Result<Message, AppError>;

    /// Fetch the most recent messages of a room, newest first.
    async fn find_recent(&self, room_name: &str, limit: i64) -> Result<Vec<Message>, AppError>;
}
