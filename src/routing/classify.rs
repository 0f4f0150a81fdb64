//! Route classification by path prefix.

pub const API_PREFIX: &str = "/api/";
pub const ADMIN_ROOT: &str = "/admin";
pub const ADMIN_LOGIN: &str = "/admin/login";
pub const ADMIN_DASHBOARD: &str = "/admin/dashboard";

/// Which checks the pipeline applies to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// No checks beyond security headers.
    Public,
    /// Rate limited.
    Api,
    /// Admin login page: redirects away when a valid session is present.
    AdminLogin,
    /// Requires a valid admin session.
    AdminProtected,
}

impl RouteClass {
    pub fn classify(path: &str) -> Self {
        if path.starts_with(API_PREFIX) {
            RouteClass::Api
        } else if path == ADMIN_LOGIN {
            RouteClass::AdminLogin
        } else if path == ADMIN_ROOT || path.starts_with("/admin/") {
            RouteClass::AdminProtected
        } else {
            RouteClass::Public
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RouteClass::Public => "public",
            RouteClass::Api => "api",
            RouteClass::AdminLogin => "admin_login",
            RouteClass::AdminProtected => "admin",
        }
    }
}
