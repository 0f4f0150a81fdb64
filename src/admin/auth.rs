//! Admin session gate.
//!
//! Decides, per request, whether an admin route may proceed, and builds the
//! cookie and redirect responses the decision requires.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::admin::session::{AuthError, SessionAuthenticator, SessionClaims};
use crate::config::Environment;
use crate::http::response::ApiError;
use crate::routing::classify::{ADMIN_DASHBOARD, ADMIN_LOGIN};
use crate::routing::RouteClass;

/// Outcome of the session rules for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionGate {
    /// Continue to the handler, with the verified session if there is one.
    Proceed(Option<SessionClaims>),
    /// Already signed in; leave the login page.
    RedirectToDashboard,
    /// No usable session. `clear_cookie` is set when a bad credential was presented.
    RedirectToLogin { clear_cookie: bool, reason: Option<AuthError> },
}

/// Apply the admin session rules for `class` given the presented token.
pub fn evaluate(
    class: RouteClass,
    token: Option<&str>,
    sessions: &dyn SessionAuthenticator,
) -> SessionGate {
    match class {
        RouteClass::AdminLogin => match token.map(|t| sessions.verify(t)) {
            Some(Ok(_)) => SessionGate::RedirectToDashboard,
            _ => SessionGate::Proceed(None),
        },
        RouteClass::AdminProtected => match token {
            None => SessionGate::RedirectToLogin {
                clear_cookie: false,
                reason: None,
            },
            Some(token) => match sessions.verify(token) {
                Ok(claims) => SessionGate::Proceed(Some(claims)),
                Err(err) => SessionGate::RedirectToLogin {
                    clear_cookie: true,
                    reason: Some(err),
                },
            },
        },
        RouteClass::Public | RouteClass::Api => SessionGate::Proceed(None),
    }
}

/// Value of cookie `name` across all `Cookie` headers.
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

pub fn session_cookie(name: &str, token: &str, ttl_secs: u64, environment: Environment) -> String {
    let mut cookie = format!("{name}={token}; Path=/; Max-Age={ttl_secs}; HttpOnly; SameSite=Strict");
    if environment.is_production() {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn cleared_cookie(name: &str) -> String {
    format!("{name}=; Path=/; Max-Age=0; HttpOnly; SameSite=Strict")
}

/// 307 to `location`, optionally attaching a `Set-Cookie`.
pub fn redirect(location: &'static str, set_cookie: Option<String>) -> Response {
    let mut response = (
        StatusCode::TEMPORARY_REDIRECT,
        [(header::LOCATION, HeaderValue::from_static(location))],
    )
        .into_response();

    if let Some(cookie) = set_cookie.and_then(|c| HeaderValue::from_str(&c).ok()) {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    response
}

pub fn redirect_to_login(clear: Option<&str>) -> Response {
    redirect(ADMIN_LOGIN, clear.map(cleared_cookie))
}

pub fn redirect_to_dashboard() -> Response {
    redirect(ADMIN_DASHBOARD, None)
}

/// Verified admin session, placed in request extensions by the pipeline.
#[derive(Debug, Clone)]
pub struct AdminSession(pub SessionClaims);

impl<S> FromRequestParts<S> for AdminSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AdminSession>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Admin session required"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::session::HmacSessionAuthenticator;

    fn authenticator() -> HmacSessionAuthenticator {
        HmacSessionAuthenticator::new("gate-secret")
    }

    #[test]
    fn protected_route_without_cookie_redirects() {
        let auth = authenticator();
        assert_eq!(
            evaluate(RouteClass::AdminProtected, None, &auth),
            SessionGate::RedirectToLogin {
                clear_cookie: false,
                reason: None
            }
        );
    }

    #[test]
    fn protected_route_with_bad_cookie_clears_it() {
        let auth = authenticator();
        let gate = evaluate(RouteClass::AdminProtected, Some("garbage"), &auth);
        assert!(matches!(
            gate,
            SessionGate::RedirectToLogin {
                clear_cookie: true,
                reason: Some(AuthError::Malformed(_))
            }
        ));
    }

    #[test]
    fn expired_cookie_reports_expiry() {
        let auth = authenticator();
        let token = auth
            .issue(&SessionClaims::issued_at("admin@shop.test", 1, 1))
            .unwrap();
        assert_eq!(
            evaluate(RouteClass::AdminProtected, Some(&token), &auth),
            SessionGate::RedirectToLogin {
                clear_cookie: true,
                reason: Some(AuthError::Expired)
            }
        );
    }

    #[test]
    fn login_page_with_valid_session_redirects_to_dashboard() {
        let auth = authenticator();
        let token = auth.issue(&SessionClaims::new("admin@shop.test", 60)).unwrap();
        assert_eq!(
            evaluate(RouteClass::AdminLogin, Some(&token), &auth),
            SessionGate::RedirectToDashboard
        );
        assert_eq!(
            evaluate(RouteClass::AdminLogin, Some("stale"), &auth),
            SessionGate::Proceed(None)
        );
    }

    #[test]
    fn valid_session_proceeds_with_claims() {
        let auth = authenticator();
        let claims = SessionClaims::new("admin@shop.test", 60);
        let token = auth.issue(&claims).unwrap();
        assert_eq!(
            evaluate(RouteClass::AdminProtected, Some(&token), &auth),
            SessionGate::Proceed(Some(claims))
        );
    }

    #[test]
    fn reads_named_cookie_among_several() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; admin_session=abc.def.ghi"));
        assert_eq!(read_cookie(&headers, "admin_session"), Some("abc.def.ghi"));
        assert_eq!(read_cookie(&headers, "missing"), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("admin_session="));
        assert_eq!(read_cookie(&headers, "admin_session"), None);
    }

    #[test]
    fn redirect_clears_cookie() {
        let response = redirect_to_login(Some("admin_session"));
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers()[header::LOCATION], "/admin/login");
        assert_eq!(
            response.headers()[header::SET_COOKIE],
            "admin_session=; Path=/; Max-Age=0; HttpOnly; SameSite=Strict"
        );
    }

    #[test]
    fn production_cookie_is_secure() {
        let cookie = session_cookie("admin_session", "t", 60, Environment::Production);
        assert!(cookie.ends_with("; Secure"));
        assert!(!session_cookie("admin_session", "t", 60, Environment::Development).contains("Secure"));
    }
}
