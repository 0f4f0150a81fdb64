//! Admin sign-in and sign-out.

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::admin::auth::{cleared_cookie, read_cookie, session_cookie};
use crate::admin::session::SessionClaims;
use crate::http::server::AppState;
use crate::http::{ApiError, ApiResponse, JsonBody, RequestId};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub email: String,
    /// Unix seconds.
    pub expires_at: u64,
}

/// Compare through fixed-length digests so timing does not depend on where inputs differ.
fn credentials_match(given: &str, expected: &str) -> bool {
    let a = Sha256::digest(given.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    request_id: RequestId,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::validation("email and password are required"));
    }

    let admin = &state.config.admin;
    let email_ok = credentials_match(&body.email.trim().to_ascii_lowercase(), &admin.email.to_ascii_lowercase());
    let password_ok = credentials_match(&body.password, &admin.password);
    if !(email_ok && password_ok) {
        tracing::warn!(request_id = %request_id, "Admin login failed");
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    let session = &state.config.session;
    let claims = SessionClaims::new(admin.email.clone(), session.ttl_secs);
    let token = state
        .sessions
        .issue(&claims)
        .map_err(|e| ApiError::internal(e.to_string()))?;
    let cookie = session_cookie(&session.cookie_name, &token, session.ttl_secs, state.config.environment);

    tracing::info!(request_id = %request_id, admin = %claims.sub, "Admin signed in");
    let data = LoginResponse {
        email: claims.sub,
        expires_at: claims.exp,
    };
    Ok((
        [(header::SET_COOKIE, cookie)],
        ApiResponse::ok(request_id.0, data).with_message("Login successful"),
    ))
}

/// `POST /api/auth/logout`
pub async fn logout(
    State(state): State<AppState>,
    request_id: RequestId,
    headers: HeaderMap,
) -> impl IntoResponse {
    let cookie_name = &state.config.session.cookie_name;
    if let Some(token) = read_cookie(&headers, cookie_name) {
        if let Ok(claims) = state.sessions.verify(token) {
            state.sessions.revoke(&claims);
            tracing::info!(request_id = %request_id, admin = %claims.sub, "Admin signed out");
        }
    }

    (
        [(header::SET_COOKIE, cleared_cookie(cookie_name))],
        ApiResponse::ok(request_id.0, serde_json::Value::Null).with_message("Logged out"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_comparison() {
        assert!(credentials_match("secret", "secret"));
        assert!(!credentials_match("secret", "secret2"));
        assert!(!credentials_match("", "secret"));
    }
}
