//! Login, logout and the session gate.
//!
//! The session token travels only in an HTTP-only cookie. `require_session`
//! resolves it to an [`AuthUser`] stored in the request extensions, where
//! handlers pick it up through the `AuthUser` extractor.

use axum::{
    async_trait,
    body::Body,
    extract::{rejection::JsonRejection, FromRequestParts, OriginalUri, State},
    http::{header, request::Parts, Request},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::json;
use std::sync::Arc;

use super::error::ApiError;
use super::validation::normalize_email;
use crate::config::AuthConfig;
use crate::crypto;
use crate::db::{AuthUser, LoginRequest, LoginResponse, Role, User, UserResponse};
use crate::engine::authorize;
use crate::error::ServiceError;
use crate::AppState;

/// Where browsers without a session are sent
pub const LOGIN_PAGE: &str = "/login";

const INVALID_CREDENTIALS: &str = "Invalid email or password";

fn session_cookie(config: &AuthConfig, token: String, ttl: chrono::Duration) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), token))
        .path("/")
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(cookie::time::Duration::seconds(ttl.num_seconds()))
        .build()
}

fn removal_cookie(config: &AuthConfig) -> Cookie<'static> {
    let mut cookie = Cookie::build((config.cookie_name.clone(), ""))
        .path("/")
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Lax)
        .build();
    cookie.make_removal();
    cookie
}

fn session_token(jar: &CookieJar, config: &AuthConfig) -> Option<String> {
    jar.get(&config.cookie_name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// Login endpoint
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    let Json(request) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let email = request.email.unwrap_or_default();
    let password = request.password.unwrap_or_default();
    if email.trim().is_empty() || password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let user = match normalize_email(&email) {
        Ok(email) => User::get_by_email(&state.db, &email).await?,
        Err(_) => None,
    };

    // Argon2 is CPU heavy; keep it off the async workers
    let candidate = user.as_ref().map(|u| u.password_hash.clone());
    let verified = tokio::task::spawn_blocking(move || match candidate {
        Some(hash) => crypto::verify_password(&password, &hash),
        None => crypto::verify_password_dummy(&password),
    })
    .await
    .map_err(|e| ServiceError::internal(format!("Password verification task failed: {}", e)))?;

    let user = match user {
        Some(user) if verified => user,
        _ => {
            tracing::warn!(email = %email.trim(), "Rejected login attempt");
            return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
        }
    };

    let issued = state.sessions.issue(&user.id).await?;
    let cookie = session_cookie(&state.config.auth, issued.token.clone(), state.sessions.ttl());

    tracing::info!(user_id = %user.id, role = %user.role(), "User logged in");

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            message: "Login successful".to_string(),
            token: issued.token,
            user: UserResponse::from(user),
        }),
    ))
}

/// Revoke the session carried in the cookie
pub async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<serde_json::Value>), (CookieJar, ApiError)> {
    let auth = &state.config.auth;
    let Some(token) = session_token(&jar, auth) else {
        return Err((
            jar.add(removal_cookie(auth)),
            ApiError::bad_request("No active session"),
        ));
    };

    match state.sessions.revoke(&token).await {
        Ok(_) => Ok((
            jar.add(removal_cookie(auth)),
            Json(json!({ "message": "Logged out successfully" })),
        )),
        Err(e) => Err((jar, e.into())),
    }
}

/// The identity behind the current session
pub async fn me(user: AuthUser) -> Json<AuthUser> {
    Json(user)
}

/// Log out from every device
pub async fn revoke_all_sessions(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    jar: CookieJar,
) -> Result<(CookieJar, Json<serde_json::Value>), ApiError> {
    let revoked = state.sessions.revoke_all_for_user(&user.id).await?;
    tracing::info!(user_id = %user.id, revoked = revoked, "Revoked all sessions");

    Ok((
        jar.add(removal_cookie(&state.config.auth)),
        Json(json!({ "revoked": revoked })),
    ))
}

/// Reject an unauthenticated request: browsers navigating to a page are
/// redirected to the login page, API clients get a 401.
fn unauthenticated(request: &Request<Body>, jar: Option<CookieJar>) -> Response {
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.0.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let wants_html = request
        .headers()
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("text/html"));

    let rejection = if !path.starts_with("/api") && wants_html {
        Redirect::to(LOGIN_PAGE).into_response()
    } else {
        ApiError::from(ServiceError::Unauthenticated).into_response()
    };

    match jar {
        Some(jar) => (jar, rejection).into_response(),
        None => rejection,
    }
}

/// Session gate: resolves the cookie to a user or rejects the request
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let auth = &state.config.auth;
    let Some(token) = session_token(&jar, auth) else {
        return unauthenticated(&request, None);
    };

    let session = match state.sessions.validate(&token).await {
        Ok(Some(session)) => session,
        Ok(None) => {
            let jar = jar.add(removal_cookie(auth));
            return unauthenticated(&request, Some(jar));
        }
        Err(e) => return ApiError::from(e).into_response(),
    };

    let user = match User::get_by_id(&state.db, &session.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            let jar = jar.add(removal_cookie(auth));
            return unauthenticated(&request, Some(jar));
        }
        Err(e) => return ApiError::from(e).into_response(),
    };

    request.extensions_mut().insert(AuthUser::from(user));
    next.run(request).await
}

/// Admin-only routes; runs after `require_session`
pub async fn require_admin(request: Request<Body>, next: Next) -> Response {
    let allowed = match request.extensions().get::<AuthUser>() {
        Some(user) => authorize(user, &[Role::Admin]).map_err(ApiError::from),
        None => Err(ApiError::from(ServiceError::Unauthenticated)),
    };

    match allowed {
        Ok(()) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

/// Extractor for the user resolved by `require_session`
#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::from(ServiceError::Unauthenticated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let config = AuthConfig::default();
        let cookie = session_cookie(&config, "abc".to_string(), chrono::Duration::days(7));
        let rendered = cookie.to_string();
        assert!(rendered.starts_with("auth_token=abc"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("SameSite=Lax"));
        assert!(rendered.contains("Path=/"));
        assert!(rendered.contains("Max-Age=604800"));
        assert!(!rendered.contains("Secure"));
    }

    #[test]
    fn test_removal_cookie_expires_immediately() {
        let config = AuthConfig {
            cookie_secure: true,
            ..Default::default()
        };
        let rendered = removal_cookie(&config).to_string();
        assert!(rendered.starts_with("auth_token=;"));
        assert!(rendered.contains("Max-Age=0"));
        assert!(rendered.contains("Secure"));
    }

    #[test]
    fn test_unauthenticated_redirects_browsers_only() {
        let page = Request::builder()
            .uri("/dashboard")
            .header(header::ACCEPT, "text/html,application/xhtml+xml")
            .body(Body::empty())
            .unwrap();
        let response = unauthenticated(&page, None);
        assert!(response.status().is_redirection());
        assert_eq!(response.headers()[header::LOCATION], LOGIN_PAGE);

        let api = Request::builder()
            .uri("/api/bookings")
            .header(header::ACCEPT, "text/html")
            .body(Body::empty())
            .unwrap();
        assert_eq!(unauthenticated(&api, None).status(), 401);

        let fetch = Request::builder()
            .uri("/dashboard")
            .header(header::ACCEPT, "application/json")
            .body(Body::empty())
            .unwrap();
        assert_eq!(unauthenticated(&fetch, None).status(), 401);
    }
}
