//! Route table — which paths are static, public, API, or protected.

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/dashboard";
pub const ONBOARDING_PATH: &str = "/onboarding";
pub const API_PREFIX: &str = "/api";
pub const REDIRECTED_FROM_PARAM: &str = "redirectedFrom";

/// Reachable without a session (exact match).
pub const PUBLIC_ROUTES: &[&str] = &["/login", "/signup", "/forgot-password", "/reset-password", "/auth/callback", "/"];

/// Public routes that bounce authenticated users to the dashboard.
pub const AUTH_PAGES: &[&str] = &["/", "/login", "/signup"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Build internals and public assets; the guard never runs.
    Static,
    /// Login/signup/home: public, but redirect when already signed in.
    AuthPage,
    /// Any other public route.
    Public,
    /// Under the API prefix; handlers enforce their own auth.
    Api,
    /// Everything else needs a session.
    Protected,
}

impl RouteClass {
    #[must_use]
    pub fn needs_session_lookup(self) -> bool {
        matches!(self, Self::AuthPage | Self::Protected)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    static_prefixes: Vec<String>,
}

impl RouteTable {
    #[must_use]
    pub fn new(static_prefixes: Vec<String>) -> Self {
        Self { static_prefixes }
    }

    /// Whether the guard applies to `path` at all.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        !self.static_prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }

    /// Classify a request path. Static prefixes are checked first, then the
    /// exact public set, then the API prefix.
    #[must_use]
    pub fn classify(&self, path: &str) -> RouteClass {
        if !self.matches(path) {
            RouteClass::Static
        } else if AUTH_PAGES.contains(&path) {
            RouteClass::AuthPage
        } else if PUBLIC_ROUTES.contains(&path) {
            RouteClass::Public
        } else if path.starts_with(API_PREFIX) {
            RouteClass::Api
        } else {
            RouteClass::Protected
        }
    }
}

/// `/login?redirectedFrom=<encoded path>`.
#[must_use]
pub fn login_redirect(original_path: &str) -> String {
    format!("{LOGIN_PATH}?{REDIRECTED_FROM_PARAM}={}", urlencoding::encode(original_path))
}

#[cfg(test)]
#[path = "routes_test.rs"]
mod tests;
