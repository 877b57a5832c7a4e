//! Response DTOs
//!
//! Outgoing response bodies. Field names follow the wire format the
//! browser client expects (camelCase identifiers, `isMember` flags).

use serde::Serialize;

use crate::application::services::Identity;
use crate::domain::{Role, Room, User};

/// Public view of a user account
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub role: Role,
    #[serde(rename = "profilePic", skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            profile_pic: user.profile_pic,
        }
    }
}

impl From<Identity> for UserResponse {
    fn from(identity: Identity) -> Self {
        Self {
            id: identity.user_id,
            username: identity.username,
            role: identity.role,
            profile_pic: identity.profile_pic,
        }
    }
}

/// A private room looked up by join code, annotated with the caller's
/// membership so the client can skip the join step.
#[derive(Debug, Serialize)]
pub struct PrivateRoomResponse {
    #[serde(flatten)]
    pub room: Room,
    #[serde(rename = "isMember")]
    pub is_member: bool,
}

/// Generic acknowledgement body
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: &'static str,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self { success: "ok" }
    }
}
