//! Authentication Handlers

use axum::{
    extract::{Extension, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use validator::Validate;

use crate::application::dto::request::LoginRequest;
use crate::application::dto::response::{StatusResponse, UserResponse};
use crate::application::services::{AuthError, AuthService, Identity};
use crate::presentation::middleware::{access_cookie, is_local_request, ACCESS_TOKEN_COOKIE};
use crate::shared::error::AppError;
use crate::startup::AppState;

fn map_auth_error(e: AuthError) -> AppError {
    match e {
        AuthError::InvalidCredentials => AppError::Unauthorized("Invalid credentials".into()),
        AuthError::NoSession => AppError::Unauthorized("No active session".into()),
        AuthError::TokenExpired | AuthError::InvalidToken => {
            AppError::Unauthorized("Invalid token".into())
        }
        AuthError::Internal(msg) => AppError::Internal(msg),
    }
}

/// Log in with username/password, registering unknown usernames.
/// Establishes a fresh session and sets the access-token cookie.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let auth_service = state.auth_service();
    let (user, access_token) = auth_service
        .login(&body.username, &body.password)
        .await
        .map_err(map_auth_error)?;

    let jar = jar.add(access_cookie(access_token, is_local_request(&headers)));

    Ok((
        StatusCode::CREATED,
        jar,
        Json(UserResponse::from(user)),
    ))
}

/// Log in as a guest with a generated identity.
pub async fn guest_login(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let auth_service = state.auth_service();
    let (user, access_token) = auth_service.guest_login().await.map_err(map_auth_error)?;

    let jar = jar.add(access_cookie(access_token, is_local_request(&headers)));

    Ok((
        StatusCode::CREATED,
        jar,
        Json(UserResponse::from(user)),
    ))
}

/// Log out: invalidate the stored session and clear the cookie.
pub async fn logout(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let auth_service = state.auth_service();
    auth_service
        .logout(identity.user_id)
        .await
        .map_err(map_auth_error)?;

    let jar = jar.remove(Cookie::build((ACCESS_TOKEN_COOKIE, "")).path("/").build());

    Ok((jar, Json(StatusResponse::ok())))
}
