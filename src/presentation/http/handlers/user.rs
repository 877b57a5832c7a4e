//! User Handlers

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use validator::Validate;

use crate::application::dto::request::UpdateUserRequest;
use crate::application::dto::response::{StatusResponse, UserResponse};
use crate::application::services::{Identity, UpdateUserDto, UserService};
use crate::shared::error::AppError;
use crate::startup::AppState;

/// List all accounts (admin only).
pub async fn get_all_users(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    if !identity.role.is_admin() {
        return Err(AppError::Forbidden("Admin access required".into()));
    }

    let users = state.user_service().get_all_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Return the caller's own identity, straight from the verified claims.
pub async fn get_current_user(
    Extension(identity): Extension<Identity>,
) -> Json<UserResponse> {
    Json(UserResponse::from(identity))
}

/// Fetch one account by id (self or admin).
pub async fn get_user_by_id(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, AppError> {
    if !identity.role.is_admin() && identity.user_id != id {
        return Err(AppError::Forbidden("Cannot view another user".into()));
    }

    let user = state.user_service().get_user(id).await?;
    Ok(Json(UserResponse::from(user)))
}

/// Update an account (self or admin).
pub async fn update_user(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    if !identity.role.is_admin() && identity.user_id != id {
        return Err(AppError::Forbidden("Cannot update another user".into()));
    }

    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let changes = UpdateUserDto {
        username: body.username,
        password: body.password,
        profile_pic: body.profile_pic,
    };

    let user = state.user_service().update_user(id, changes).await?;
    Ok(Json(UserResponse::from(user)))
}

/// Delete an account (self or admin).
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> Result<Json<StatusResponse>, AppError> {
    if !identity.role.is_admin() && identity.user_id != id {
        return Err(AppError::Forbidden("Cannot delete another user".into()));
    }

    state.user_service().delete_user(id).await?;
    Ok(Json(StatusResponse::ok()))
}
