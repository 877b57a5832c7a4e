//! Route Configuration
//!
//! Configures all HTTP routes for the API. Everything except the login
//! endpoints and the observability probes sits behind the auth gate.

use axum::{
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Router,
};

use super::handlers;
use crate::infrastructure::metrics;
use crate::presentation::middleware::auth_gate;
use crate::presentation::websocket::live_chat;
use crate::startup::AppState;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        // Observability endpoints
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Prometheus metrics endpoint handler
async fn metrics_handler() -> impl IntoResponse {
    let metrics = metrics::gather_metrics();
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics,
    )
}

/// Public routes (no auth)
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/health", get(handlers::health::health_check))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/guest", post(handlers::auth::guest_login))
}

/// Protected routes (require a resolved identity)
fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Users
        .route("/api/users", get(handlers::user::get_all_users))
        .route("/api/user", get(handlers::user::get_current_user))
        .route("/api/user/logout", post(handlers::auth::logout))
        .route(
            "/api/user/{id}",
            get(handlers::user::get_user_by_id)
                .put(handlers::user::update_user)
                .delete(handlers::user::delete_user),
        )
        // Rooms
        .route(
            "/api/room",
            get(handlers::room::get_all_rooms).post(handlers::room::create_room),
        )
        .route("/api/room/private/{code}", get(handlers::room::get_private_room))
        .route(
            "/api/room/{name}",
            get(handlers::room::get_room)
                .put(handlers::room::update_room)
                .delete(handlers::room::delete_room),
        )
        // Durable membership
        .route("/api/join", get(handlers::room::get_joined_rooms))
        .route("/api/join/private/{code}", post(handlers::room::join_private_room))
        .route(
            "/api/join/{name}",
            post(handlers::room::join_room).delete(handlers::room::leave_room),
        )
        // Message history
        .route(
            "/api/chat/{room_name}/{limit}",
            get(handlers::message::get_old_messages),
        )
        // Realtime endpoint; the path carries the room name
        .route("/chat/{room_name}", get(live_chat))
        .route_layer(middleware::from_fn_with_state(state, auth_gate))
}
