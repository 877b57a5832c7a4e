//! Chat Service
//!
//! Room lifecycle, durable membership, and message history/persistence.
//! The realtime layer calls into this service for the membership check
//! that gates a socket upgrade and for persisting inbound messages.

use std::sync::Arc;

use async_trait::async_trait;
use rand::{distr::Alphanumeric, Rng};

use crate::application::services::Identity;
use crate::domain::{Message, MessageRepository, Room, RoomRepository};
use crate::shared::error::AppError;

/// Length of the generated join code for new rooms.
const JOIN_CODE_LEN: usize = 5;

/// Room and message operations exposed to handlers and the realtime entry
/// point.
#[async_trait]
pub trait ChatService: Send + Sync {
    /// List public rooms.
    async fn get_all_rooms(&self) -> Result<Vec<Room>, AppError>;

    /// Fetch a room by name.
    async fn get_room(&self, name: &str) -> Result<Room, AppError>;

    /// Fetch a private room by join code, annotating whether the caller is
    /// already a member.
    async fn get_private_room(&self, code: &str, user_id: i64) -> Result<(Room, bool), AppError>;

    /// Create a room owned by the caller; the owner is joined immediately
    /// and a join code is generated.
    async fn create_room(
        &self,
        user_id: i64,
        name: &str,
        description: &str,
        private: bool,
    ) -> Result<Room, AppError>;

    /// Update a room's mutable fields.
    async fn update_room(&self, room: &Room) -> Result<Room, AppError>;

    /// Delete a room by name.
    async fn delete_room(&self, name: &str) -> Result<(), AppError>;

    /// Check durable membership.
    async fn is_member(&self, user_id: i64, room_name: &str) -> Result<bool, AppError>;

    /// Join a public room by name.
    async fn join_room(&self, user_id: i64, room_name: &str) -> Result<(), AppError>;

    /// Join a private room by its join code.
    async fn join_private_room(&self, code: &str, identity: &Identity) -> Result<Room, AppError>;

    /// List rooms the user has joined.
    async fn joined_rooms(&self, user_id: i64) -> Result<Vec<Room>, AppError>;

    /// Leave a room. The owner cannot leave their own room.
    async fn leave_room(&self, user_id: i64, room_name: &str) -> Result<(), AppError>;

    /// Fetch the most recent messages of a room, newest first.
    async fn old_messages(&self, room_name: &str, limit: i64) -> Result<Vec<Message>, AppError>;

    /// Persist an inbound message; the store assigns id and timestamps.
    async fn create_message(
        &self,
        identity: &Identity,
        room_name: &str,
        content: &str,
    ) -> Result<Message, AppError>;
}

/// ChatService implementation over the room and message repositories.
pub struct ChatServiceImpl<R, M>
where
    R: RoomRepository,
    M: MessageRepository,
{
    room_repo: Arc<R>,
    message_repo: Arc<M>,
}

impl<R, M> ChatServiceImpl<R, M>
where
    R: RoomRepository,
    M: MessageRepository,
{
    /// Create a new ChatServiceImpl
    pub fn new(room_repo: Arc<R>, message_repo: Arc<M>) -> Self {
        Self {
            room_repo,
            message_repo,
        }
    }

    fn generate_join_code() -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(JOIN_CODE_LEN)
            .map(char::from)
            .collect()
    }
}

#[async_trait]
impl<R, M> ChatService for ChatServiceImpl<R, M>
where
    R: RoomRepository + 'static,
    M: MessageRepository + 'static,
{
    async fn get_all_rooms(&self) -> Result<Vec<Room>, AppError> {
        self.room_repo.find_all().await
    }

    async fn get_room(&self, name: &str) -> Result<Room, AppError> {
        self.room_repo
            .find_by_name(name)
            .await?
            .ok_or_else(|| AppError::NotFound("Room not found".into()))
    }

    async fn get_private_room(&self, code: &str, user_id: i64) -> Result<(Room, bool), AppError> {
        let room = self
            .room_repo
            .find_by_code(code)
            .await?
            .ok_or_else(|| AppError::NotFound("Room not found".into()))?;

        let is_member = self.room_repo.is_member(user_id, &room.name).await?;
        Ok((room, is_member))
    }

    async fn create_room(
        &self,
        user_id: i64,
        name: &str,
        description: &str,
        private: bool,
    ) -> Result<Room, AppError> {
        if self.room_repo.find_by_name(name).await?.is_some() {
            return Err(AppError::Conflict("Room name already taken".into()));
        }

        let code = Self::generate_join_code();
        let room = self
            .room_repo
            .create(name, description, &code, private, user_id)
            .await?;

        // The owner is always a member of their own room.
        self.room_repo.add_member(user_id, &room.name).await?;

        Ok(room)
    }

    async fn update_room(&self, room: &Room) -> Result<Room, AppError> {
        self.room_repo.update(room).await
    }

    async fn delete_room(&self, name: &str) -> Result<(), AppError> {
        self.room_repo.delete(name).await
    }

    async fn is_member(&self, user_id: i64, room_name: &str) -> Result<bool, AppError> {
        self.room_repo.is_member(user_id, room_name).await
    }

    async fn join_room(&self, user_id: i64, room_name: &str) -> Result<(), AppError> {
        // Joining by name is only for public rooms; private rooms are
        // joined through their code.
        let room = self.get_room(room_name).await?;
        if room.private {
            return Err(AppError::NotFound("Room not found".into()));
        }

        if self.room_repo.is_member(user_id, room_name).await? {
            return Err(AppError::Conflict("Already a member of this room".into()));
        }

        self.room_repo.add_member(user_id, room_name).await
    }

    async fn join_private_room(&self, code: &str, identity: &Identity) -> Result<Room, AppError> {
        let room = self
            .room_repo
            .find_by_code(code)
            .await?
            .ok_or_else(|| AppError::NotFound("Room not found".into()))?;

        if self
            .room_repo
            .is_member(identity.user_id, &room.name)
            .await?
        {
            return Err(AppError::Conflict("Already a member of this room".into()));
        }

        self.room_repo.add_member(identity.user_id, &room.name).await?;
        Ok(room)
    }

    async fn joined_rooms(&self, user_id: i64) -> Result<Vec<Room>, AppError> {
        self.room_repo.find_joined(user_id).await
    }

    async fn leave_room(&self, user_id: i64, room_name: &str) -> Result<(), AppError> {
        let room = self.get_room(room_name).await?;

        if room.user_id == user_id {
            return Err(AppError::Forbidden(
                "The room owner cannot leave their own room".into(),
            ));
        }

        self.room_repo.remove_member(user_id, room_name).await
    }

    async fn old_messages(&self, room_name: &str, limit: i64) -> Result<Vec<Message>, AppError> {
        self.message_repo.find_recent(room_name, limit).await
    }

    async fn create_message(
        &self,
        identity: &Identity,
        room_name: &str,
        content: &str,
    ) -> Result<Message, AppError> {
        self.message_repo
            .create(identity.user_id, &identity.username, room_name, content, None)
            .await
    }
}
