//! Per-request decision sequence.
//!
//! # Data Flow
//! ```text
//! request
//!     → classify route (public / api / admin-login / admin-protected)
//!     → api: fixed-window rate limit            (deny → 429, handler skipped)
//!     → admin: session rules                    (redirect → 307, handler skipped)
//!     → handler, bounded by the request timeout (timeout → 408)
//!     → finalize error envelope (request id, redaction, one log record)
//!     → rate-limit headers, security headers
//!     → metrics and performance samples
//! ```
//!
//! # Design Decisions
//! - Short-circuit responses go through the same finalization as handler responses
//! - A timed-out handler future is dropped, which releases any leased connection

use std::time::Instant;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::admin::auth::{self, AdminSession, SessionGate};
use crate::config::Environment;
use crate::http::request::{client_id, RequestId};
use crate::http::response::{ApiError, ErrorKind, ErrorReport};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::observability::performance::SampleKind;
use crate::routing::RouteClass;
use crate::security::rate_limit::{now_ms, RateLimitDecision};
use crate::security::apply_security_headers;

enum Admission {
    Continue,
    Reject(Response),
}

pub async fn request_pipeline(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = RequestId::from_headers(request.headers());
    let class = RouteClass::classify(&path);
    let environment = state.config.environment;

    let rate = rate_limit(&state, &request, class, &path);
    let admission = match rate {
        Some(decision) if !decision.allowed => Admission::Reject(rate_limited_response(&decision)),
        _ => session_rules(&state, &mut request, class),
    };

    let response = match admission {
        Admission::Reject(response) => response,
        Admission::Continue => {
            let timeout = state.config.timeouts.request();
            match tokio::time::timeout(timeout, next.run(request)).await {
                Ok(response) => response,
                Err(_) => ApiError::new(ErrorKind::RequestTimeout, "Request timed out").into_response(),
            }
        }
    };

    let mut response = finalize(response, &request_id, environment, &method, &path);
    if let Some(decision) = rate {
        apply_rate_limit_headers(response.headers_mut(), &decision);
    }
    apply_security_headers(response.headers_mut(), environment);

    let status = response.status();
    metrics::record_request(method.as_str(), status.as_u16(), class.as_str(), started);
    state.performance.record(
        SampleKind::Request {
            failed: status.is_client_error() || status.is_server_error(),
        },
        started.elapsed(),
    );

    response
}

fn rate_limit(
    state: &AppState,
    request: &Request,
    class: RouteClass,
    path: &str,
) -> Option<RateLimitDecision> {
    if class != RouteClass::Api || !state.config.rate_limit.enabled {
        return None;
    }

    let client = client_id(request);
    let decision = state.limiter.check_route(&client, path)?;
    if !decision.allowed {
        if let Some(policy) = state.limiter.policy_for(path) {
            metrics::record_rate_limited(&policy.prefix);
        }
    }
    Some(decision)
}

fn rate_limited_response(decision: &RateLimitDecision) -> Response {
    let mut response = ApiError::rate_limited().into_response();
    let retry_after = decision.retry_after_secs(now_ms());
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
    response
}

fn session_rules(state: &AppState, request: &mut Request, class: RouteClass) -> Admission {
    if !matches!(class, RouteClass::AdminLogin | RouteClass::AdminProtected) {
        return Admission::Continue;
    }

    let cookie_name = state.config.session.cookie_name.as_str();
    let gate = {
        let token = auth::read_cookie(request.headers(), cookie_name);
        auth::evaluate(class, token, state.sessions.as_ref())
    };

    match gate {
        SessionGate::Proceed(Some(claims)) => {
            request.extensions_mut().insert(AdminSession(claims));
            Admission::Continue
        }
        SessionGate::Proceed(None) => Admission::Continue,
        SessionGate::RedirectToDashboard => Admission::Reject(auth::redirect_to_dashboard()),
        SessionGate::RedirectToLogin { clear_cookie, reason } => {
            if let Some(reason) = reason {
                tracing::debug!(path = %request.uri().path(), reason = %reason, "Admin session rejected");
            }
            Admission::Reject(auth::redirect_to_login(clear_cookie.then_some(cookie_name)))
        }
    }
}

/// Turn any error response into a finalized envelope and log it once.
fn finalize(
    response: Response,
    request_id: &RequestId,
    environment: Environment,
    method: &Method,
    path: &str,
) -> Response {
    let status = response.status();
    let (mut parts, body) = response.into_parts();

    let error = match parts.extensions.remove::<ErrorReport>() {
        Some(ErrorReport(error)) => error,
        None if status.is_client_error() || status.is_server_error() => ApiError::new(
            ErrorKind::from_status(status),
            status.canonical_reason().unwrap_or("Request failed"),
        ),
        None => return Response::from_parts(parts, body),
    };

    log_failure(&error, status, request_id, method, path);

    let (rendered, rendered_body) = error.render(request_id.as_str(), environment).into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    if let Some(content_type) = rendered.headers.get(header::CONTENT_TYPE) {
        parts.headers.insert(header::CONTENT_TYPE, content_type.clone());
    }
    Response::from_parts(parts, rendered_body)
}

fn log_failure(error: &ApiError, status: StatusCode, request_id: &RequestId, method: &Method, path: &str) {
    if status.is_server_error() {
        tracing::error!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = status.as_u16(),
            code = error.kind.code(),
            error = %error.message,
            "Request failed"
        );
    } else {
        tracing::warn!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = status.as_u16(),
            code = error.kind.code(),
            error = %error.message,
            "Request rejected"
        );
    }
}

fn apply_rate_limit_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(decision.reset_at_secs()));
}

/// Fallback for unmatched routes.
pub async fn not_found(method: Method, uri: axum::http::Uri) -> Response {
    ApiError::new(ErrorKind::NotFound, format!("Route {method} {} not found", uri.path())).into_response()
}

/// Converts a handler panic into an internal error envelope.
pub fn panic_response(panic: Box<dyn std::any::Any + Send + 'static>) -> Response<Body> {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    ApiError::internal(detail).into_response()
}
