//! Room Repository Implementation
//!
//! PostgreSQL implementation of the RoomRepository trait, covering room
//! rows and the durable membership relation.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{Room, RoomRepository};
use crate::shared::error::AppError;

/// Database row representation joining chat_rooms with its member count.
#[derive(Debug, sqlx::FromRow)]
struct RoomRow {
    id: i64,
    name: String,
    description: String,
    code: String,
    private: bool,
    members: i64,
    user_id: i64,
}

impl RoomRow {
    /// Convert database row to domain Room entity.
    ///
    /// Join codes are only surfaced for private rooms; public rooms are
    /// addressed by name alone.
    fn into_room(self) -> Room {
        let code = if self.private { Some(self.code) } else { None };
        Room {
            id: self.id,
            name: self.name,
            description: self.description,
            code,
            private: self.private,
            members: self.members,
            user_id: self.user_id,
        }
    }
}

const SELECT_ROOM: &str = r#"
    SELECT r.id, r.name, r.description, r.code, r.private, r.user_id,
           (SELECT COUNT(*) FROM room_members m WHERE m.room_name = r.name) AS members
    FROM chat_rooms r
"#;

/// PostgreSQL room repository implementation.
#[derive(Clone)]
pub struct PgRoomRepository {
    pool: PgPool,
}

impl PgRoomRepository {
    /// Create a new PgRoomRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomRepository for PgRoomRepository {
    async fn find_all(&self) -> Result<Vec<Room>, AppError> {
        let rows = sqlx::query_as::<_, RoomRow>(&format!(
            "{SELECT_ROOM} WHERE r.private = FALSE ORDER BY r.id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_room()).collect())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Room>, AppError> {
        let row = sqlx::query_as::<_, RoomRow>(&format!("{SELECT_ROOM} WHERE r.name = $1"))
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.into_room()))
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Room>, AppError> {
        let row = sqlx::query_as::<_, RoomRow>(&format!(
            "{SELECT_ROOM} WHERE r.code = $1 AND r.private = TRUE"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_room()))
    }

    async fn create(
        &self,
        name: &str,
        description: &str,
        code: &str,
        private: bool,
        user_id: i64,
    ) -> Result<Room, AppError> {
        let row = sqlx::query_as::<_, RoomRow>(
            r#"
            INSERT INTO chat_rooms (name, description, code, private, user_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, description, code, private, user_id, 0::BIGINT AS members
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(code)
        .bind(private)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_room())
    }

    async fn update(&self, room: &Room) -> Result<Room, AppError> {
        let row = sqlx::query_as::<_, RoomRow>(
            r#"
            UPDATE chat_rooms
            SET description = $1, private = $2
            WHERE name = $3
            RETURNING id, name, description, code, private, user_id,
                      (SELECT COUNT(*) FROM room_members m WHERE m.room_name = chat_rooms.name) AS members
            "#,
        )
        .bind(&room.description)
        .bind(room.private)
        .bind(&room.name)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_room())
    }

    async fn delete(&self, name: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM chat_rooms WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn is_member(&self, user_id: i64, room_name: &str) -> Result<bool, AppError> {
        let exists: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM room_members WHERE user_id = $1 AND room_name = $2)",
        )
        .bind(user_id)
        .bind(room_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists.0)
    }

    async fn add_member(&self, user_id: i64, room_name: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO room_members (user_id, room_name)
            VALUES ($1, $2)
            ON CONFLICT (user_id, room_name) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(room_name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove_member(&self, user_id: i64, room_name: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM room_members WHERE user_id = $1 AND room_name = $2")
            .bind(user_id)
            .bind(room_name)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn find_joined(&self, user_id: i64) -> Result<Vec<Room>, AppError> {
        let rows = sqlx::query_as::<_, RoomRow>(&format!(
            r#"
            {SELECT_ROOM}
            INNER JOIN room_members rm ON rm.room_name = r.name
            WHERE rm.user_id = $1
            ORDER BY rm.joined_at
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_room()).collect())
    }
}
