//! Security response headers.
//!
//! # Responsibilities
//! - Add the fixed set of security headers to every response
//! - Add HSTS in production only
//!
//! # Design Decisions
//! - Headers overwrite whatever a handler set
//! - Values are static; no per-request allocation

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};

use crate::config::Environment;

const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; \
script-src 'self' 'unsafe-eval' 'unsafe-inline' https://www.googletagmanager.com https://www.google-analytics.com; \
style-src 'self' 'unsafe-inline' https://fonts.googleapis.com; \
font-src 'self' https://fonts.gstatic.com; \
img-src 'self' data: https: blob:; \
connect-src 'self' https://www.google-analytics.com; \
frame-src 'self'; \
object-src 'none'; \
base-uri 'self'; \
form-action 'self'; \
frame-ancestors 'none'; \
upgrade-insecure-requests";

const STRICT_TRANSPORT_SECURITY: &str = "max-age=31536000; includeSubDomains; preload";

const PERMISSIONS_POLICY: HeaderName = HeaderName::from_static("permissions-policy");

/// Headers present on every response regardless of environment.
pub fn fixed_headers() -> [(HeaderName, HeaderValue); 7] {
    [
        (header::X_DNS_PREFETCH_CONTROL, HeaderValue::from_static("on")),
        (header::X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block")),
        (header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY")),
        (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
        (header::REFERRER_POLICY, HeaderValue::from_static("strict-origin-when-cross-origin")),
        (
            PERMISSIONS_POLICY,
            HeaderValue::from_static("camera=(), microphone=(), geolocation=()"),
        ),
        (
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(CONTENT_SECURITY_POLICY),
        ),
    ]
}

pub fn apply_security_headers(headers: &mut HeaderMap, environment: Environment) {
    for (name, value) in fixed_headers() {
        headers.insert(name, value);
    }

    if environment.is_production() {
        headers.insert(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static(STRICT_TRANSPORT_SECURITY),
        );
    } else {
        headers.remove(header::STRICT_TRANSPORT_SECURITY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_omits_hsts() {
        let mut headers = HeaderMap::new();
        apply_security_headers(&mut headers, Environment::Development);

        assert_eq!(headers["x-frame-options"], "DENY");
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["referrer-policy"], "strict-origin-when-cross-origin");
        assert!(headers.contains_key("permissions-policy"));
        assert!(headers["content-security-policy"]
            .to_str()
            .unwrap()
            .contains("frame-ancestors 'none'"));
        assert!(!headers.contains_key("strict-transport-security"));
    }

    #[test]
    fn production_adds_hsts() {
        let mut headers = HeaderMap::new();
        apply_security_headers(&mut headers, Environment::Production);
        assert_eq!(headers["strict-transport-security"], STRICT_TRANSPORT_SECURITY);
        assert_eq!(headers.len(), 8);
    }

    #[test]
    fn handler_values_are_overwritten() {
        let mut headers = HeaderMap::new();
        headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN"));
        apply_security_headers(&mut headers, Environment::Development);
        assert_eq!(headers["x-frame-options"], "DENY");
    }
}
