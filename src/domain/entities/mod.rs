//! # Domain Entities
//!
//! Core domain entities representing the main business objects in the chat
//! service. All entities map directly to their corresponding database
//! tables.
//!
//! ## Core Entities
//!
//! - **User**: User account with credentials and profile
//! - **Room**: A named (or code-addressed private) channel grouping
//!   connections and message history
//! - **Message**: A text message persisted in a room, optionally carrying
//!   an uploaded-file reference
//! - **LoginSession**: The server-side record pairing a user to their
//!   current refresh credential
//!
//! ## Repository Traits
//!
//! Each entity has an associated repository trait defining data access
//! operations. These traits are implemented in the infrastructure layer,
//! following the dependency inversion principle.

mod message;
mod room;
mod session;
mod user;

pub use message::{FileAttachment, Message, MessageRepository};
pub use room::{Room, RoomRepository};
pub use session::{LoginSession, SessionRepository};
pub use user::{Role, User, UserRepository};
