//! # Realtime Chat Library
//!
//! This crate provides a multi-room realtime chat backend with:
//! - RESTful HTTP API endpoints for rooms, membership, users, and history
//! - A WebSocket endpoint per room for real-time messaging and presence
//! - Cookie-based sessions with transparent access-token renewal
//! - PostgreSQL for persistent storage
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Core business entities and repository traits
//! - **Application Layer**: Business logic services and DTOs
//! - **Infrastructure Layer**: Database and metrics implementations
//! - **Presentation Layer**: HTTP handlers, middleware, and the realtime
//!   registry/broadcast engine
//!
//! ## Module Structure
//!
//! ```text
//! realtime_chat/
//! +-- config/         Configuration management
//! +-- domain/         Domain entities and repository traits
//! +-- application/    Application services and DTOs
//! +-- infrastructure/ Database and metrics implementations
//! +-- presentation/   HTTP routes, auth gate, WebSocket layer
//! +-- shared/         Common utilities (errors)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
