//! Message History Handler

use axum::{
    extract::{Extension, Path, State},
    Json,
};

use crate::application::services::{ChatService, Identity};
use crate::domain::Message;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Cap on the number of history messages returned in one request.
const MAX_HISTORY_LIMIT: i64 = 200;

/// Fetch the most recent messages of a room, newest first. Members only.
pub async fn get_old_messages(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((room_name, limit)): Path<(String, i64)>,
) -> Result<Json<Vec<Message>>, AppError> {
    if limit <= 0 {
        return Err(AppError::BadRequest("limit must be positive".into()));
    }

    let chat_service = state.chat_service();

    if !chat_service.is_member(identity.user_id, &room_name).await? {
        return Err(AppError::NotFound(
            "You are not a member of this room".into(),
        ));
    }

    let messages = chat_service
        .old_messages(&room_name, limit.min(MAX_HISTORY_LIMIT))
        .await?;

    Ok(Json(messages))
}
