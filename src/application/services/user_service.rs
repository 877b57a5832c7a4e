//! User Service
//!
//! User listing, lookup, profile updates, and account deletion.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use async_trait::async_trait;

use crate::domain::{User, UserRepository};
use crate::shared::error::AppError;

/// Fields a user (or an admin) may change on an account.
#[derive(Debug, Clone, Default)]
pub struct UpdateUserDto {
    pub username: Option<String>,
    pub password: Option<String>,
    pub profile_pic: Option<String>,
}

/// User management operations.
#[async_trait]
pub trait UserService: Send + Sync {
    /// List every account.
    async fn get_all_users(&self) -> Result<Vec<User>, AppError>;

    /// Fetch one account by id.
    async fn get_user(&self, id: i64) -> Result<User, AppError>;

    /// Apply profile changes; a new password is re-hashed before storage.
    async fn update_user(&self, id: i64, changes: UpdateUserDto) -> Result<User, AppError>;

    /// Delete an account.
    async fn delete_user(&self, id: i64) -> Result<(), AppError>;
}

/// UserService implementation over the user repository.
pub struct UserServiceImpl<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
}

impl<U> UserServiceImpl<U>
where
    U: UserRepository,
{
    /// Create a new UserServiceImpl
    pub fn new(user_repo: Arc<U>) -> Self {
        Self { user_repo }
    }

    fn hash_password(password: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }
}

#[async_trait]
impl<U> UserService for UserServiceImpl<U>
where
    U: UserRepository + 'static,
{
    async fn get_all_users(&self) -> Result<Vec<User>, AppError> {
        self.user_repo.find_all().await
    }

    async fn get_user(&self, id: i64) -> Result<User, AppError> {
        self.user_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    async fn update_user(&self, id: i64, changes: UpdateUserDto) -> Result<User, AppError> {
        let mut user = self.get_user(id).await?;

        if let Some(username) = changes.username {
            user.username = username;
        }
        if let Some(password) = changes.password {
            user.password_hash = Self::hash_password(&password)?;
        }
        if let Some(profile_pic) = changes.profile_pic {
            user.profile_pic = Some(profile_pic);
        }

        self.user_repo.update(&user).await
    }

    async fn delete_user(&self, id: i64) -> Result<(), AppError> {
        // Ensure the row exists so a bad id surfaces as 404, not a no-op.
        self.get_user(id).await?;
        self.user_repo.delete(id).await
    }
}
