//! Application Startup
//!
//! Application building, shared state, and server lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::application::services::{
    AuthServiceImpl, ChatServiceImpl, UserServiceImpl,
};
use crate::config::Settings;
use crate::infrastructure::database;
use crate::infrastructure::repositories::{
    PgMessageRepository, PgRoomRepository, PgSessionRepository, PgUserRepository,
};
use crate::presentation::http::routes;
use crate::presentation::middleware::cors;
use crate::presentation::websocket::{Broadcaster, ConnectionRegistry};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub registry: Arc<ConnectionRegistry>,
    pub broadcaster: Arc<Broadcaster>,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Auth service over the user and session stores.
    pub fn auth_service(&self) -> AuthServiceImpl<PgUserRepository, PgSessionRepository> {
        AuthServiceImpl::new(
            Arc::new(PgUserRepository::new(self.db.clone())),
            Arc::new(PgSessionRepository::new(self.db.clone())),
            self.settings.jwt.clone(),
        )
    }

    /// Chat service over the room and message stores.
    pub fn chat_service(&self) -> ChatServiceImpl<PgRoomRepository, PgMessageRepository> {
        ChatServiceImpl::new(
            Arc::new(PgRoomRepository::new(self.db.clone())),
            Arc::new(PgMessageRepository::new(self.db.clone())),
        )
    }

    /// User service over the user store.
    pub fn user_service(&self) -> UserServiceImpl<PgUserRepository> {
        UserServiceImpl::new(Arc::new(PgUserRepository::new(self.db.clone())))
    }
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
    registry: Arc<ConnectionRegistry>,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        // Create database pool and bring the schema up to date
        let db = database::create_pool(&settings.database).await?;
        database::run_migrations(&db).await?;
        tracing::info!("Database connection pool created");

        // The registry is constructed once here and injected everywhere;
        // it is the only globally shared mutable state.
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcaster = Arc::new(Broadcaster::new(registry.clone()));

        // Create app state
        let state = AppState {
            db,
            registry: registry.clone(),
            broadcaster,
            settings: Arc::new(settings.clone()),
        };

        // Build router with middleware
        let router = routes::create_router(state)
            .layer(TraceLayer::new_for_http())
            .layer(cors::create_cors_layer(&settings.cors));

        // Bind to address
        let addr: SocketAddr = settings.server_addr().parse()?;
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", addr);

        Ok(Self {
            listener,
            router,
            registry,
        })
    }

    /// Run the server until interrupted. Shutdown closes every registered
    /// realtime connection so no read loop outlives the process.
    pub async fn run_until_stopped(self) -> Result<()> {
        let registry = self.registry.clone();
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal(registry))
            .await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// Wait for SIGINT, then signal every live connection to close.
async fn shutdown_signal(registry: Arc<ConnectionRegistry>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }

    tracing::info!(
        connections = registry.total_connections(),
        "Shutting down, closing realtime connections"
    );
    registry.close_all();
}
