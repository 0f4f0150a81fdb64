//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, tracing)
//!     → pipeline.rs (rate limit, admin session, timeout, error finalization, headers)
//!     → handler (api/, admin/, health/)
//!     → response.rs (envelope, error taxonomy)
//!     → Send to client
//! ```

pub mod extract;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod server;

pub use extract::{IdPath, JsonBody};
pub use request::{RequestId, X_REQUEST_ID};
pub use response::{ApiEnvelope, ApiError, ApiResponse, ErrorKind};
pub use server::{build_router, AppState, HttpServer};
