//! Room Handlers
//!
//! Room CRUD and durable join/leave membership.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::application::dto::request::{CreateRoomRequest, UpdateRoomRequest};
use crate::application::dto::response::{PrivateRoomResponse, StatusResponse};
use crate::application::services::{ChatService, Identity};
use crate::domain::Room;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// List public rooms.
pub async fn get_all_rooms(
    State(state): State<AppState>,
) -> Result<Json<Vec<Room>>, AppError> {
    let rooms = state.chat_service().get_all_rooms().await?;
    Ok(Json(rooms))
}

/// Fetch one room by name.
pub async fn get_room(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Room>, AppError> {
    let room = state.chat_service().get_room(&name).await?;
    Ok(Json(room))
}

/// Look up a private room by its join code, with the caller's membership.
pub async fn get_private_room(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(code): Path<String>,
) -> Result<Json<PrivateRoomResponse>, AppError> {
    let (room, is_member) = state
        .chat_service()
        .get_private_room(&code, identity.user_id)
        .await?;

    Ok(Json(PrivateRoomResponse { room, is_member }))
}

/// Create a room owned by the caller.
pub async fn create_room(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<Room>), AppError> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let room = state
        .chat_service()
        .create_room(identity.user_id, &body.name, &body.description, body.private)
        .await?;

    Ok((StatusCode::CREATED, Json(room)))
}

/// Update a room (owner or admin).
pub async fn update_room(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(name): Path<String>,
    Json(body): Json<UpdateRoomRequest>,
) -> Result<Json<Room>, AppError> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let chat_service = state.chat_service();
    let mut room = chat_service.get_room(&name).await?;

    if !identity.role.is_admin() && room.user_id != identity.user_id {
        return Err(AppError::Forbidden("Only the room owner can update it".into()));
    }

    if let Some(description) = body.description {
        room.description = description;
    }
    if let Some(private) = body.private {
        room.private = private;
    }

    let updated = chat_service.update_room(&room).await?;
    Ok(Json(updated))
}

/// Delete a room (owner or admin).
pub async fn delete_room(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(name): Path<String>,
) -> Result<Json<StatusResponse>, AppError> {
    let chat_service = state.chat_service();
    let room = chat_service.get_room(&name).await?;

    if !identity.role.is_admin() && room.user_id != identity.user_id {
        return Err(AppError::Forbidden("Only the room owner can delete it".into()));
    }

    chat_service.delete_room(&name).await?;
    Ok(Json(StatusResponse::ok()))
}

/// List rooms the caller has joined.
pub async fn get_joined_rooms(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<Room>>, AppError> {
    let rooms = state.chat_service().joined_rooms(identity.user_id).await?;
    Ok(Json(rooms))
}

/// Join a public room by name.
pub async fn join_room(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(name): Path<String>,
) -> Result<Json<StatusResponse>, AppError> {
    state
        .chat_service()
        .join_room(identity.user_id, &name)
        .await?;

    Ok(Json(StatusResponse::ok()))
}

/// Join a private room by its join code.
pub async fn join_private_room(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(code): Path<String>,
) -> Result<Json<Room>, AppError> {
    let room = state
        .chat_service()
        .join_private_room(&code, &identity)
        .await?;

    Ok(Json(room))
}

/// Leave a room.
pub async fn leave_room(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(name): Path<String>,
) -> Result<Json<StatusResponse>, AppError> {
    state
        .chat_service()
        .leave_room(identity.user_id, &name)
        .await?;

    Ok(Json(StatusResponse::ok()))
}
