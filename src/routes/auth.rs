//! Auth plumbing — session extractors and the auth-status endpoint.

use std::convert::Infallible;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Serialize;

use crate::onboarding::gate::AuthStatus;
use crate::services::session::{Session, resolve_session};
use crate::state::AppState;

// =============================================================================
// AUTH EXTRACTORS
// =============================================================================

async fn session_from_parts(parts: &Parts, state: &AppState) -> Option<Session> {
    let jar = CookieJar::from_headers(&parts.headers);
    let token = jar.get(&state.config.session_cookie).map(Cookie::value);
    resolve_session(state.sessions.as_ref(), token).await
}

/// Authenticated user extracted from the session cookie.
/// Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub session: Session,
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        session_from_parts(parts, &app_state)
            .await
            .map(|session| Self { session })
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

/// Session if there is a valid one; never rejects.
pub struct MaybeAuthUser(pub Option<Session>);

impl MaybeAuthUser {
    #[must_use]
    pub fn status(&self) -> AuthStatus {
        if self.0.is_some() { AuthStatus::Authenticated } else { AuthStatus::Unauthenticated }
    }
}

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        Ok(Self(session_from_parts(parts, &app_state).await))
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Debug, Serialize)]
pub struct AuthState {
    pub status: AuthStatus,
    pub user: Option<Session>,
}

/// `GET /api/auth/session` — current auth status for the front-end.
pub async fn session_status(auth: MaybeAuthUser) -> Json<AuthState> {
    Json(AuthState { status: auth.status(), user: auth.0 })
}
