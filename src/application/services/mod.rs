//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **AuthService / SessionAuthority**: login flows and the
//!   access/refresh credential lifecycle
//! - **ChatService**: rooms, membership, message history and persistence
//! - **UserService**: user account management

pub mod auth_service;
pub mod chat_service;
pub mod user_service;

// Re-export auth service types
pub use auth_service::{
    AccessVerification, AuthError, AuthService, AuthServiceImpl, Claims, Identity,
    IssuedCredentials, SessionAuthority, TokenIdentity,
};

// Re-export chat service types
pub use chat_service::{ChatService, ChatServiceImpl};

// Re-export user service types
pub use user_service::{UpdateUserDto, UserService, UserServiceImpl};
