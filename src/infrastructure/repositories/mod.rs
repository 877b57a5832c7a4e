//! Repository Implementations
//!
//! PostgreSQL implementations of domain repository traits.
//!
//! This module provides concrete implementations of the repository traits
//! defined in the domain layer. Each repository handles data access for
//! a specific entity type.
//!
//! ## Available Repositories
//!
//! - **UserRepository** - User account management
//! - **RoomRepository** - Room CRUD and durable membership
//! - **MessageRepository** - Message persistence and history
//! - **SessionRepository** - Refresh-credential storage (one row per user)

pub mod message_repository;
pub mod room_repository;
pub mod session_repository;
pub mod user_repository;

pub use message_repository::PgMessageRepository;
pub use room_repository::PgRoomRepository;
pub use session_repository::PgSessionRepository;
pub use user_repository::PgUserRepository;
