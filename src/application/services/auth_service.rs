//! Authentication Service
//!
//! Credential and session lifecycle: issuing, verifying, and rotating the
//! short-lived access token and the long-lived, server-stored refresh
//! token, plus the login flows that sit on top of them.
//!
//! Both tokens of a session embed the same opaque session id. The refresh
//! path compares the expired access token's session id against the stored
//! refresh credential's, so an access token minted under a session that a
//! later login replaced cannot be renewed.
//!
//! Claims are decoded through one explicit [`Claims`] struct and a single
//! validation path shared by access and refresh credentials.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{distr::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtSettings;
use crate::domain::{Role, SessionRepository, User, UserRepository};

/// Tolerated clock skew when checking credential expiry, in seconds.
const EXPIRY_LEEWAY_SECS: i64 = 30;

/// Caller identity carried by every authenticated request and socket.
///
/// Immutable once embedded in a credential; a token rotation re-embeds the
/// same identity rather than re-reading the user row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    pub profile_pic: Option<String>,
}

impl Identity {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
            profile_pic: user.profile_pic.clone(),
        }
    }
}

/// JWT claim set shared by access and refresh credentials.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    #[serde(rename = "profilePic", skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<String>,
    /// Opaque session id tying a token to the login that minted it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    /// Expiry as a Unix timestamp
    pub exp: i64,
}

impl Claims {
    fn into_identity(self) -> Identity {
        Identity {
            user_id: self.user_id,
            username: self.username,
            role: self.role,
            profile_pic: self.profile_pic,
        }
    }
}

/// Identity plus the session id recovered from a decoded token.
#[derive(Debug, Clone)]
pub struct TokenIdentity {
    pub identity: Identity,
    pub session: Option<String>,
}

/// Outcome of verifying an access credential whose signature and structure
/// are sound. Expired tokens still yield the embedded claims because the
/// refresh path needs the user id and session id to decide renewal.
#[derive(Debug, Clone)]
pub enum AccessVerification {
    Valid(Identity),
    Expired(TokenIdentity),
}

/// Credentials produced by establishing a session. Only the access token
/// travels to the client (as a cookie); the refresh token stays in the
/// session store.
#[derive(Debug, Clone)]
pub struct IssuedCredentials {
    pub access_token: String,
    pub refresh_token: String,
}

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("No active session")]
    NoSession,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Session and credential lifecycle, gating every realtime and REST
/// operation.
#[async_trait]
pub trait SessionAuthority: Send + Sync {
    /// Establish a session for a user: delete any stored refresh
    /// credential, store a fresh one, and mint a matching access token.
    /// Older sessions on other devices die with the deleted row.
    async fn issue_session(&self, user: &User) -> Result<IssuedCredentials, AuthError>;

    /// Verify an access credential. Distinguishes "expired" (decodable,
    /// valid signature, expiry passed) from "invalid" (signature or
    /// structure failure) because the two take different recovery paths.
    fn verify_access(&self, token: &str) -> Result<AccessVerification, AuthError>;

    /// Fully verify a refresh credential, including its expiry.
    fn verify_refresh(&self, token: &str) -> Result<TokenIdentity, AuthError>;

    /// Mint a fresh access credential embedding the given identity and
    /// session id.
    fn mint_access(&self, identity: &Identity, session: Option<&str>)
        -> Result<String, AuthError>;

    /// Fetch the stored refresh credential for a user, or `NoSession` if
    /// none exists (e.g. logged out elsewhere).
    async fn rotate(&self, user_id: i64) -> Result<String, AuthError>;

    /// Delete the stored refresh credential (logout).
    async fn invalidate(&self, user_id: i64) -> Result<(), AuthError>;
}

/// Login flows built on top of [`SessionAuthority`].
#[async_trait]
pub trait AuthService: SessionAuthority {
    /// Log in with username/password. A username that does not exist yet is
    /// registered on the spot; an existing one must match its password.
    async fn login(&self, username: &str, password: &str) -> Result<(User, String), AuthError>;

    /// Log in as a throwaway guest with a generated identity.
    async fn guest_login(&self) -> Result<(User, String), AuthError>;

    /// Log out: drop the stored session.
    async fn logout(&self, user_id: i64) -> Result<(), AuthError>;
}

/// AuthService implementation backed by JWT credentials and a relational
/// session store.
pub struct AuthServiceImpl<U, S>
where
    U: UserRepository,
    S: SessionRepository,
{
    user_repo: Arc<U>,
    session_repo: Arc<S>,
    jwt_settings: JwtSettings,
}

impl<U, S> AuthServiceImpl<U, S>
where
    U: UserRepository,
    S: SessionRepository,
{
    /// Create a new AuthServiceImpl
    pub fn new(user_repo: Arc<U>, session_repo: Arc<S>, jwt_settings: JwtSettings) -> Self {
        Self {
            user_repo,
            session_repo,
            jwt_settings,
        }
    }

    /// Hash a password using Argon2id
    fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Internal(format!("Password hashing failed: {}", e)))
    }

    /// Verify a password against its hash
    fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AuthError::Internal(format!("Invalid password hash: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Sign a token embedding the identity and session with the given
    /// expiry.
    fn sign(
        &self,
        identity: &Identity,
        session: Option<&str>,
        expires_in: Duration,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            user_id: identity.user_id,
            username: identity.username.clone(),
            role: identity.role,
            profile_pic: identity.profile_pic.clone(),
            sid: session.map(str::to_string),
            exp: (Utc::now() + expires_in).timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_settings.secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Decode a token, checking signature and structure but not expiry.
    /// Expiry is compared explicitly so expired-but-sound tokens still
    /// surface their claims.
    fn decode_claims(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_settings.secret.as_bytes()),
            &validation,
        )
        .map_err(|_| AuthError::InvalidToken)?;

        Ok(token_data.claims)
    }

    fn is_expired(claims: &Claims) -> bool {
        Utc::now().timestamp() > claims.exp + EXPIRY_LEEWAY_SECS
    }
}

#[async_trait]
impl<U, S> SessionAuthority for AuthServiceImpl<U, S>
where
    U: UserRepository + 'static,
    S: SessionRepository + 'static,
{
    async fn issue_session(&self, user: &User) -> Result<IssuedCredentials, AuthError> {
        let identity = Identity::from_user(user);
        let session = Uuid::new_v4().to_string();

        let refresh_token = self.sign(
            &identity,
            Some(&session),
            Duration::days(self.jwt_settings.refresh_token_expiry_days),
        )?;
        let access_token = self.mint_access(&identity, Some(&session))?;

        // Storing the new row deletes the previous one in the same
        // transaction, which is what logs out every other device.
        self.session_repo
            .replace_for_user(user.id, &refresh_token)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        Ok(IssuedCredentials {
            access_token,
            refresh_token,
        })
    }

    fn verify_access(&self, token: &str) -> Result<AccessVerification, AuthError> {
        let claims = self.decode_claims(token)?;

        if Self::is_expired(&claims) {
            let session = claims.sid.clone();
            Ok(AccessVerification::Expired(TokenIdentity {
                identity: claims.into_identity(),
                session,
            }))
        } else {
            Ok(AccessVerification::Valid(claims.into_identity()))
        }
    }

    fn verify_refresh(&self, token: &str) -> Result<TokenIdentity, AuthError> {
        let claims = self.decode_claims(token)?;

        if Self::is_expired(&claims) {
            return Err(AuthError::TokenExpired);
        }

        let session = claims.sid.clone();
        Ok(TokenIdentity {
            identity: claims.into_identity(),
            session,
        })
    }

    fn mint_access(
        &self,
        identity: &Identity,
        session: Option<&str>,
    ) -> Result<String, AuthError> {
        self.sign(
            identity,
            session,
            Duration::minutes(self.jwt_settings.access_token_expiry_minutes),
        )
    }

    async fn rotate(&self, user_id: i64) -> Result<String, AuthError> {
        let session = self
            .session_repo
            .find_by_user(user_id)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .ok_or(AuthError::NoSession)?;

        Ok(session.token)
    }

    async fn invalidate(&self, user_id: i64) -> Result<(), AuthError> {
        self.session_repo
            .delete_for_user(user_id)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl<U, S> AuthService for AuthServiceImpl<U, S>
where
    U: UserRepository + 'static,
    S: SessionRepository + 'static,
{
    async fn login(&self, username: &str, password: &str) -> Result<(User, String), AuthError> {
        let existing = self
            .user_repo
            .find_by_username(username)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let user = match existing {
            Some(user) => {
                if !self.verify_password(password, &user.password_hash)? {
                    return Err(AuthError::InvalidCredentials);
                }
                user
            }
            None => {
                // First login doubles as registration.
                let password_hash = self.hash_password(password)?;
                self.user_repo
                    .create(username, &password_hash, Role::User)
                    .await
                    .map_err(|e| AuthError::Internal(e.to_string()))?
            }
        };

        let credentials = self.issue_session(&user).await?;
        Ok((user, credentials.access_token))
    }

    async fn guest_login(&self) -> Result<(User, String), AuthError> {
        let suffix: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();
        let username = format!("guest_{}", suffix);

        let password: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(24)
            .map(char::from)
            .collect();

        let password_hash = self.hash_password(&password)?;
        let user = self
            .user_repo
            .create(&username, &password_hash, Role::User)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let credentials = self.issue_session(&user).await?;
        Ok((user, credentials.access_token))
    }

    async fn logout(&self, user_id: i64) -> Result<(), AuthError> {
        self.invalidate(user_id).await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! In-memory repository fakes shared by auth and middleware tests.

    use super::*;
    use crate::domain::LoginSession;
    use crate::shared::error::AppError;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Stateful in-memory session store mirroring the one-row-per-user
    /// semantics of the real table.
    #[derive(Default)]
    pub struct InMemorySessions {
        rows: Mutex<HashMap<i64, LoginSession>>,
    }

    #[async_trait]
    impl SessionRepository for InMemorySessions {
        async fn replace_for_user(
            &self,
            user_id: i64,
            token: &str,
        ) -> Result<LoginSession, AppError> {
            let session = LoginSession {
                id: user_id,
                user_id,
                token: token.to_string(),
                created_at: Utc::now(),
            };
            self.rows.lock().insert(user_id, session.clone());
            Ok(session)
        }

        async fn find_by_user(&self, user_id: i64) -> Result<Option<LoginSession>, AppError> {
            Ok(self.rows.lock().get(&user_id).cloned())
        }

        async fn delete_for_user(&self, user_id: i64) -> Result<u64, AppError> {
            Ok(self.rows.lock().remove(&user_id).map(|_| 1).unwrap_or(0))
        }
    }

    /// In-memory user store for the login flows.
    #[derive(Default)]
    pub struct InMemoryUsers {
        rows: Mutex<HashMap<i64, User>>,
        next_id: Mutex<i64>,
    }

    #[async_trait]
    impl UserRepository for InMemoryUsers {
        async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
            Ok(self.rows.lock().get(&id).cloned())
        }

        async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
            Ok(self
                .rows
                .lock()
                .values()
                .find(|u| u.username == username)
                .cloned())
        }

        async fn find_all(&self) -> Result<Vec<User>, AppError> {
            Ok(self.rows.lock().values().cloned().collect())
        }

        async fn create(
            &self,
            username: &str,
            password_hash: &str,
            role: Role,
        ) -> Result<User, AppError> {
            let mut next = self.next_id.lock();
            *next += 1;
            let now = Utc::now();
            let user = User {
                id: *next,
                username: username.to_string(),
                password_hash: password_hash.to_string(),
                role,
                profile_pic: None,
                created_at: now,
                updated_at: now,
            };
            self.rows.lock().insert(user.id, user.clone());
            Ok(user)
        }

        async fn update(&self, user: &User) -> Result<User, AppError> {
            self.rows.lock().insert(user.id, user.clone());
            Ok(user.clone())
        }

        async fn delete(&self, id: i64) -> Result<(), AppError> {
            self.rows.lock().remove(&id);
            Ok(())
        }
    }

    pub fn test_service() -> AuthServiceImpl<InMemoryUsers, InMemorySessions> {
        AuthServiceImpl::new(
            Arc::new(InMemoryUsers::default()),
            Arc::new(InMemorySessions::default()),
            JwtSettings {
                secret: "0123456789abcdef0123456789abcdef".into(),
                access_token_expiry_minutes: 30,
                refresh_token_expiry_days: 30,
            },
        )
    }

    pub fn test_user(id: i64, username: &str) -> User {
        let now = Utc::now();
        User {
            id,
            username: username.into(),
            password_hash: String::new(),
            role: Role::User,
            profile_pic: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sign an already-expired access token for the given identity and
    /// session, for exercising the refresh path.
    pub fn expired_access(
        svc: &AuthServiceImpl<InMemoryUsers, InMemorySessions>,
        identity: &Identity,
        session: Option<&str>,
    ) -> String {
        svc.sign(identity, session, Duration::minutes(-5)).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_minted_access_token_verifies_without_store() {
        let svc = test_service();
        let identity = Identity::from_user(&test_user(7, "alice"));

        let token = svc.mint_access(&identity, None).unwrap();

        // No session row exists, yet verification succeeds: a valid,
        // unexpired access credential never touches the store.
        match svc.verify_access(&token).unwrap() {
            AccessVerification::Valid(decoded) => assert_eq!(decoded, identity),
            AccessVerification::Expired(_) => panic!("fresh token reported expired"),
        }
    }

    #[tokio::test]
    async fn test_expired_token_still_yields_identity_and_session() {
        let svc = test_service();
        let identity = Identity::from_user(&test_user(7, "alice"));

        let token = expired_access(&svc, &identity, Some("session-1"));

        match svc.verify_access(&token).unwrap() {
            AccessVerification::Expired(expired) => {
                assert_eq!(expired.identity.user_id, 7);
                assert_eq!(expired.session.as_deref(), Some("session-1"));
            }
            AccessVerification::Valid(_) => panic!("expired token reported valid"),
        }
    }

    #[tokio::test]
    async fn test_expiry_within_leeway_is_still_valid() {
        let svc = test_service();
        let identity = Identity::from_user(&test_user(7, "alice"));

        // Expired ten seconds ago, inside the 30s tolerance.
        let token = svc.sign(&identity, None, Duration::seconds(-10)).unwrap();

        assert!(matches!(
            svc.verify_access(&token).unwrap(),
            AccessVerification::Valid(_)
        ));
    }

    #[tokio::test]
    async fn test_garbage_token_is_invalid_not_expired() {
        let svc = test_service();
        assert!(matches!(
            svc.verify_access("not-a-jwt"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_is_invalid() {
        let svc = test_service();
        let other = AuthServiceImpl::new(
            Arc::new(InMemoryUsers::default()),
            Arc::new(InMemorySessions::default()),
            JwtSettings {
                secret: "ffffffffffffffffffffffffffffffff".into(),
                access_token_expiry_minutes: 30,
                refresh_token_expiry_days: 30,
            },
        );
        let identity = Identity::from_user(&test_user(7, "alice"));
        let token = other.mint_access(&identity, None).unwrap();

        assert!(matches!(
            svc.verify_access(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_issue_session_replaces_previous_session() {
        let svc = test_service();
        let user = test_user(1, "alice");

        let first = svc.issue_session(&user).await.unwrap();
        let second = svc.issue_session(&user).await.unwrap();

        // Only the second refresh credential survives.
        let stored = svc.rotate(1).await.unwrap();
        assert_eq!(stored, second.refresh_token);
        assert_ne!(stored, first.refresh_token);
    }

    #[tokio::test]
    async fn test_sessions_get_distinct_session_ids() {
        let svc = test_service();
        let user = test_user(1, "alice");

        let first = svc.issue_session(&user).await.unwrap();
        let second = svc.issue_session(&user).await.unwrap();

        let sid1 = svc.verify_refresh(&first.refresh_token).unwrap().session;
        let sid2 = svc.verify_refresh(&second.refresh_token).unwrap().session;
        assert!(sid1.is_some());
        assert_ne!(sid1, sid2);
    }

    #[tokio::test]
    async fn test_rotate_without_session_fails() {
        let svc = test_service();
        assert!(matches!(svc.rotate(42).await, Err(AuthError::NoSession)));
    }

    #[tokio::test]
    async fn test_invalidate_then_rotate_fails() {
        let svc = test_service();
        let user = test_user(1, "alice");
        svc.issue_session(&user).await.unwrap();

        svc.invalidate(1).await.unwrap();

        assert!(matches!(svc.rotate(1).await, Err(AuthError::NoSession)));
    }

    #[tokio::test]
    async fn test_login_registers_unknown_username() {
        let svc = test_service();

        let (user, access) = svc.login("newcomer", "hunter2hunter2").await.unwrap();

        assert_eq!(user.username, "newcomer");
        assert!(matches!(
            svc.verify_access(&access).unwrap(),
            AccessVerification::Valid(_)
        ));
    }

    #[tokio::test]
    async fn test_login_rejects_wrong_password() {
        let svc = test_service();
        svc.login("alice", "correct-horse").await.unwrap();

        let result = svc.login("alice", "battery-staple").await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_second_login_invalidates_first_session() {
        let svc = test_service();

        // Device 1 logs in, then device 2 logs in with the same account.
        let (user, _access1) = svc.login("alice", "correct-horse").await.unwrap();
        let refresh1 = svc.rotate(user.id).await.unwrap();
        svc.login("alice", "correct-horse").await.unwrap();

        // Device 1's refresh credential is no longer the stored one.
        let stored = svc.rotate(user.id).await.unwrap();
        assert_ne!(stored, refresh1);
    }

    #[tokio::test]
    async fn test_guest_login_creates_guest_identity() {
        let svc = test_service();

        let (user, _access) = svc.guest_login().await.unwrap();

        assert!(user.username.starts_with("guest_"));
        assert_eq!(user.role, Role::User);
    }
}
