//! Chat room entity and repository trait.
//!
//! Maps to the `chat_rooms` and `room_members` tables. Membership is a
//! durable relation decided over REST; the realtime registry only tracks
//! live sockets and consults membership through this repository.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Represents a chat room.
///
/// Maps to the `chat_rooms` table:
/// - id: BIGSERIAL PRIMARY KEY
/// - name: VARCHAR(64) NOT NULL UNIQUE
/// - description: TEXT NOT NULL DEFAULT ''
/// - code: VARCHAR(16) NOT NULL (opaque join code for private rooms)
/// - private: BOOLEAN NOT NULL DEFAULT FALSE
/// - user_id: BIGINT NOT NULL REFERENCES users(id) (owner)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    /// Database-assigned primary key
    pub id: i64,

    /// Globally unique room name
    pub name: String,

    /// Free-form description shown in the room list
    pub description: String,

    /// Opaque join code; the only way to discover a private room
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Whether the room is hidden from the public listing
    pub private: bool,

    /// Number of durable members
    pub members: i64,

    /// Owning user
    #[serde(rename = "userId")]
    pub user_id: i64,
}

/// Repository trait for Room data access and membership operations.
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// List all rooms with member counts.
    async fn find_all(&self) -> Result<Vec<Room>, AppError>;

    /// Find a room by its unique name.
    async fn find_by_name(&self, name: &str) -> Result<Option<Room>, AppError>;

    /// Find a private room by its join code.
    async fn find_by_code(&self, code: &str) -> Result<Option<Room>, AppError>;

    /// Create a new room, returning the stored row.
    async fn create(
        &self,
        name: &str,
        description: &str,
        code: &str,
        private: bool,
        user_id: i64,
    ) -> Result<Room, AppError>;

    /// Update name/description of an existing room.
    async fn update(&self, room: &Room) -> Result<Room, AppError>;

    /// Delete a room by name (membership rows cascade).
    async fn delete(&self, name: &str) -> Result<(), AppError>;

    /// Check whether a user is a durable member of a room.
    async fn is_member(&self, user_id: i64, room_name: &str) -> Result<bool, AppError>;

    /// Add a membership row.
    async fn add_member(&self, user_id: i64, room_name: &str) -> Result<(), AppError>;

    /// Remove a membership row.
    async fn remove_member(&self, user_id: i64, room_name: &str) -> Result<(), AppError>;

    /// List all rooms a user has joined.
    async fn find_joined(&self, user_id: i64) -> Result<Vec<Room>, AppError>;
}
