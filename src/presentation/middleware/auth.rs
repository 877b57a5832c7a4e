//! Authentication Middleware
//!
//! The gate every REST and realtime request passes through. Resolves the
//! caller's identity from the `accessToken` cookie (or a bearer header),
//! transparently renews expired access tokens from the stored refresh
//! credential, and rejects everything else with 401 and a cleared cookie.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::application::services::{AccessVerification, AuthError, Identity, SessionAuthority};
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Name of the session cookie carrying the access token.
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Outcome of resolving a credential through the gate.
#[derive(Debug)]
pub enum GateResolution {
    /// The presented access token was valid as-is.
    Authenticated(Identity),
    /// The access token was expired and has been renewed from the stored
    /// refresh credential; the new token must be set on the response.
    Renewed {
        identity: Identity,
        access_token: String,
    },
}

/// Run the verification state machine against an access token.
///
/// Expired tokens enter the refresh path: the stored refresh credential is
/// fetched and verified, and the expired token must belong to the same
/// session. An access token minted under a session that a later login
/// replaced is rejected, which is what logs out older devices.
pub async fn resolve_identity<A>(authority: &A, token: &str) -> Result<GateResolution, AuthError>
where
    A: SessionAuthority,
{
    match authority.verify_access(token)? {
        AccessVerification::Valid(identity) => Ok(GateResolution::Authenticated(identity)),
        AccessVerification::Expired(expired) => {
            let refresh = authority.rotate(expired.identity.user_id).await?;
            let current = authority.verify_refresh(&refresh)?;

            if expired.session != current.session {
                return Err(AuthError::NoSession);
            }

            let access_token =
                authority.mint_access(&current.identity, current.session.as_deref())?;

            Ok(GateResolution::Renewed {
                identity: current.identity,
                access_token,
            })
        }
    }
}

/// Authentication middleware protecting REST routes and the realtime
/// endpoint. Attaches the resolved [`Identity`] as a request extension.
pub async fn auth_gate(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_token(&jar, request.headers()) else {
        return reject(
            jar,
            AppError::Unauthorized("access token not found in cookie or header".into()),
        );
    };

    let is_local = is_local_request(request.headers());
    let authority = state.auth_service();

    match resolve_identity(&authority, &token).await {
        Ok(GateResolution::Authenticated(identity)) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Ok(GateResolution::Renewed {
            identity,
            access_token,
        }) => {
            request.extensions_mut().insert(identity);
            let jar = jar.add(access_cookie(access_token, is_local));
            let response = next.run(request).await;
            (jar, response).into_response()
        }
        Err(AuthError::Internal(msg)) => AppError::Internal(msg).into_response(),
        Err(e) => {
            tracing::debug!(error = %e, "Rejected credential");
            reject(jar, AppError::Unauthorized(e.to_string()))
        }
    }
}

/// Read the access token from the session cookie, falling back to an
/// `Authorization: Bearer` header.
fn extract_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(ACCESS_TOKEN_COOKIE) {
        return Some(cookie.value().to_string());
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Build the session cookie carrying a freshly minted access token.
///
/// Outside local hosts the cookie is `Secure` with `SameSite=None`, since
/// the browser client and the API live on different origins in production;
/// local development gets `Lax` so plain-http setups keep working.
pub fn access_cookie(token: String, is_local: bool) -> Cookie<'static> {
    Cookie::build((ACCESS_TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(!is_local)
        .same_site(if is_local { SameSite::Lax } else { SameSite::None })
        .build()
}

/// 401 with the session cookie cleared.
fn reject(jar: CookieJar, error: AppError) -> Response {
    let jar = jar.remove(Cookie::build((ACCESS_TOKEN_COOKIE, "")).path("/").build());
    (jar, error.into_response()).into_response()
}

/// Whether the request comes from a local development host, directly or
/// through a local proxy.
pub fn is_local_request(headers: &HeaderMap) -> bool {
    let host = headers
        .get(axum::http::header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    if host.contains("localhost") || host.starts_with("127.0.0.1") {
        return true;
    }

    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        == Some("127.0.0.1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::auth_service::test_support::{
        expired_access, test_service, test_user,
    };
    use axum::http::HeaderValue;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[tokio::test]
    async fn test_valid_token_resolves_without_renewal() {
        let svc = test_service();
        let identity = Identity::from_user(&test_user(1, "alice"));
        let token = svc.mint_access(&identity, None).unwrap();

        match resolve_identity(&svc, &token).await.unwrap() {
            GateResolution::Authenticated(resolved) => assert_eq!(resolved, identity),
            GateResolution::Renewed { .. } => panic!("valid token should not be renewed"),
        }
    }

    #[tokio::test]
    async fn test_expired_token_with_live_session_is_renewed() {
        let svc = test_service();
        let user = test_user(1, "alice");
        let credentials = svc.issue_session(&user).await.unwrap();

        let session = svc
            .verify_refresh(&credentials.refresh_token)
            .unwrap()
            .session;
        let stale = expired_access(&svc, &Identity::from_user(&user), session.as_deref());

        match resolve_identity(&svc, &stale).await.unwrap() {
            GateResolution::Renewed {
                identity,
                access_token,
            } => {
                assert_eq!(identity.user_id, 1);
                // The renewed token verifies as valid on its own.
                assert!(matches!(
                    svc.verify_access(&access_token).unwrap(),
                    AccessVerification::Valid(_)
                ));
            }
            GateResolution::Authenticated(_) => panic!("expired token resolved as valid"),
        }
    }

    #[tokio::test]
    async fn test_expired_token_without_session_is_rejected() {
        let svc = test_service();
        let identity = Identity::from_user(&test_user(1, "alice"));
        let stale = expired_access(&svc, &identity, Some("gone"));

        let result = resolve_identity(&svc, &stale).await;
        assert!(matches!(result, Err(AuthError::NoSession)));
    }

    #[tokio::test]
    async fn test_expired_token_from_replaced_session_is_rejected() {
        let svc = test_service();
        let user = test_user(1, "alice");

        // Device 1 logs in, then device 2 logs in and replaces the session.
        let first = svc.issue_session(&user).await.unwrap();
        let first_session = svc.verify_refresh(&first.refresh_token).unwrap().session;
        svc.issue_session(&user).await.unwrap();

        // Device 1's access token expires; its renewal must fail.
        let stale = expired_access(&svc, &Identity::from_user(&user), first_session.as_deref());

        let result = resolve_identity(&svc, &stale).await;
        assert!(matches!(result, Err(AuthError::NoSession)));
    }

    #[tokio::test]
    async fn test_garbage_token_is_rejected() {
        let svc = test_service();
        let result = resolve_identity(&svc, "garbage").await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_access_cookie_production_attributes() {
        let cookie = access_cookie("token".into(), false);

        assert_eq!(cookie.name(), ACCESS_TOKEN_COOKIE);
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::None));
    }

    #[test]
    fn test_access_cookie_local_attributes() {
        let cookie = access_cookie("token".into(), true);

        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    }

    #[test_case("localhost:3000", true; "localhost with port")]
    #[test_case("127.0.0.1:3000", true; "loopback with port")]
    #[test_case("chat.example.com", false; "public host")]
    fn test_is_local_request_by_host(host: &str, expected: bool) {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::HOST,
            HeaderValue::from_str(host).unwrap(),
        );
        assert_eq!(is_local_request(&headers), expected);
    }

    #[test]
    fn test_is_local_request_behind_local_proxy() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::HOST,
            HeaderValue::from_static("chat.example.com"),
        );
        headers.insert("x-forwarded-for", HeaderValue::from_static("127.0.0.1"));
        assert!(is_local_request(&headers));
    }

    #[test]
    fn test_extract_token_prefers_cookie() {
        let jar = CookieJar::new().add(Cookie::new(ACCESS_TOKEN_COOKIE, "from-cookie"));
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));

        assert_eq!(
            extract_token(&jar, &headers).as_deref(),
            Some("from-cookie")
        );
    }

    #[test]
    fn test_extract_token_falls_back_to_bearer() {
        let jar = CookieJar::new();
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));

        assert_eq!(
            extract_token(&jar, &headers).as_deref(),
            Some("from-header")
        );
    }

    #[test]
    fn test_extract_token_missing_everywhere() {
        assert!(extract_token(&CookieJar::new(), &HeaderMap::new()).is_none());
    }
}
