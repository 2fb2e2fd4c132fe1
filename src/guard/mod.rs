//! Route guard — runs ahead of every request.
//!
//! SYSTEM CONTEXT
//! ==============
//! Installed as an axum middleware over the whole router. For each request
//! path it decides to pass through, bounce a signed-in user off an auth
//! page, or send an anonymous user to login with the original path attached
//! as `redirectedFrom`.
//!
//! ERROR HANDLING
//! ==============
//! A failed session lookup is indistinguishable from "no session". The guard
//! fails closed: protected routes redirect to login, never through.

pub mod routes;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};

use crate::services::session::{SessionProvider, resolve_session};
use crate::state::AppState;
use routes::{DASHBOARD_PATH, RouteClass, RouteTable, login_redirect};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    Pass,
    Redirect(String),
}

/// Decide what to do with a request for `path`.
///
/// The session provider is only consulted for auth pages and protected
/// routes; static assets, other public routes and the API never trigger a
/// lookup.
pub async fn decide(
    table: &RouteTable,
    path: &str,
    sessions: &dyn SessionProvider,
    token: Option<&str>,
) -> GuardOutcome {
    let class = table.classify(path);
    if !class.needs_session_lookup() {
        return GuardOutcome::Pass;
    }

    let session = resolve_session(sessions, token).await;
    match (class, session) {
        (RouteClass::AuthPage, Some(session)) => {
            tracing::debug!(%path, user_id = %session.user_id, "signed-in user on auth page; redirecting to dashboard");
            GuardOutcome::Redirect(DASHBOARD_PATH.to_owned())
        }
        (RouteClass::Protected, None) => {
            tracing::info!(%path, "redirecting unauthenticated user to login");
            GuardOutcome::Redirect(login_redirect(path))
        }
        _ => GuardOutcome::Pass,
    }
}

/// Axum middleware wrapper around [`decide`].
pub async fn route_guard(State(state): State<AppState>, jar: CookieJar, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_owned();
    let token = jar.get(&state.config.session_cookie).map(Cookie::value);

    match decide(&state.routes, &path, state.sessions.as_ref(), token).await {
        GuardOutcome::Pass => next.run(req).await,
        GuardOutcome::Redirect(location) => Redirect::temporary(&location).into_response(),
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
