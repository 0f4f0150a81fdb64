//! Uniform response envelope and error taxonomy.
//!
//! # Responsibilities
//! - Wrap every handler result in `ApiEnvelope`
//! - Map each `ErrorKind` to a transport status and a stable code
//! - Classify storage failures into the taxonomy
//!
//! # Design Decisions
//! - `ApiError` renders a provisional envelope and also attaches itself as an
//!   `ErrorReport` extension; the pipeline re-renders it with the request id,
//!   applies production redaction and logs it exactly once
//! - Infrastructure failures (pool exhausted, connection lost) are 503, not 500

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Environment;
use crate::db::DbError;

/// Message sent instead of internal error text in production.
pub const REDACTED_MESSAGE: &str = "Internal server error";

/// Wire shape of every API response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub request_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl<T> ApiEnvelope<T> {
    pub fn success(data: T, message: Option<String>, request_id: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message,
            request_id: request_id.into(),
        }
    }
}

impl ApiEnvelope<Value> {
    pub fn failure(error: ErrorBody, request_id: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            message: None,
            request_id: request_id.into(),
        }
    }
}

/// Successful handler result.
#[derive(Debug)]
pub struct ApiResponse<T> {
    status: StatusCode,
    envelope: ApiEnvelope<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(request_id: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::OK,
            envelope: ApiEnvelope::success(data, None, request_id),
        }
    }

    pub fn created(request_id: impl Into<String>, data: T) -> Self {
        Self::ok(request_id, data).with_status(StatusCode::CREATED)
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.envelope.message = Some(message.into());
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.envelope)).into_response()
    }
}

/// Error taxonomy. Each kind owns its status and wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Unauthorized,
    Forbidden,
    NotFound,
    RequestTimeout,
    DuplicateEntry,
    PayloadTooLarge,
    RateLimited,
    Internal,
    PoolExhausted,
    Connection,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            ErrorKind::DuplicateEntry => StatusCode::CONFLICT,
            ErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::PoolExhausted | ErrorKind::Connection => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Closest kind for a bare status produced outside the handlers (e.g. 405 from the router).
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => ErrorKind::Unauthorized,
            StatusCode::FORBIDDEN => ErrorKind::Forbidden,
            StatusCode::NOT_FOUND => ErrorKind::NotFound,
            StatusCode::REQUEST_TIMEOUT => ErrorKind::RequestTimeout,
            StatusCode::CONFLICT => ErrorKind::DuplicateEntry,
            StatusCode::PAYLOAD_TOO_LARGE => ErrorKind::PayloadTooLarge,
            StatusCode::TOO_MANY_REQUESTS => ErrorKind::RateLimited,
            StatusCode::SERVICE_UNAVAILABLE => ErrorKind::Connection,
            s if s.is_client_error() => ErrorKind::Validation,
            _ => ErrorKind::Internal,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::RequestTimeout => "REQUEST_TIMEOUT",
            ErrorKind::DuplicateEntry => "DUPLICATE_ENTRY",
            ErrorKind::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ErrorKind::RateLimited => "RATE_LIMITED",
            ErrorKind::Internal => "INTERNAL_ERROR",
            ErrorKind::PoolExhausted => "POOL_EXHAUSTED",
            ErrorKind::Connection => "CONNECTION_ERROR",
        }
    }
}

/// A classified failure destined for the client.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(ErrorKind::NotFound, format!("{resource} not found"))
    }

    pub fn rate_limited() -> Self {
        Self::new(ErrorKind::RateLimited, "Too many requests, please try again later")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    /// Wire body for this error. Production hides the text of server errors.
    pub fn body(&self, environment: Environment) -> ErrorBody {
        let redact = environment.is_production() && self.status().is_server_error();
        ErrorBody {
            message: if redact {
                REDACTED_MESSAGE.to_string()
            } else {
                self.message.clone()
            },
            code: self.kind.code().to_string(),
            details: if redact { None } else { self.details.clone() },
        }
    }

    /// Full response with the request id filled in.
    pub fn render(&self, request_id: &str, environment: Environment) -> Response {
        let envelope = ApiEnvelope::failure(self.body(environment), request_id);
        let mut response = (self.status(), Json(envelope)).into_response();
        response.extensions_mut().insert(ErrorReport(self.clone()));
        response
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.code(), self.message)
    }
}

impl std::error::Error for ApiError {}

/// Response extension marking an error the pipeline has yet to finalize.
#[derive(Debug, Clone)]
pub struct ErrorReport(pub ApiError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Redacted by default; the pipeline re-renders with the real environment.
        self.render("", Environment::Production)
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match &err {
            DbError::DuplicateEntry(_) => Self::new(ErrorKind::DuplicateEntry, "Data already exists"),
            DbError::NotFound(resource) => Self::not_found(resource),
            DbError::PoolExhausted { .. } => {
                Self::new(ErrorKind::PoolExhausted, "Service temporarily unavailable, please retry")
            }
            DbError::PoolClosed | DbError::NotInitialized | DbError::Connection(_) => {
                Self::new(ErrorKind::Connection, err.to_string())
            }
            DbError::Query(_) | DbError::InvalidUrl(_) => Self::internal(err.to_string()),
        }
    }
}
