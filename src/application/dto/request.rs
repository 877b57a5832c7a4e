//! Request DTOs
//!
//! Incoming request bodies with validation rules.

use serde::Deserialize;
use validator::Validate;

/// Login request (also registers unknown usernames)
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 2, max = 32))]
    pub username: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// Room creation request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoomRequest {
    #[validate(length(min = 2, max = 64))]
    pub name: String,

    #[validate(length(max = 500))]
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub private: bool,
}

/// Room update request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRoomRequest {
    #[validate(length(max = 500))]
    pub description: Option<String>,

    pub private: Option<bool>,
}

/// User profile update request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 2, max = 32))]
    pub username: Option<String>,

    #[validate(length(min = 8, max = 128))]
    pub password: Option<String>,

    #[serde(rename = "profilePic")]
    #[validate(url)]
    pub profile_pic: Option<String>,
}
