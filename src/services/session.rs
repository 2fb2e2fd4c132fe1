//! Session lookup against the external identity provider.
//!
//! ARCHITECTURE
//! ============
//! The gateway never issues or mutates sessions. It reads the access token
//! the front-end stored in a cookie and asks the identity provider who it
//! belongs to. `SessionProvider` is the seam; `RemoteSessionProvider` talks
//! HTTP, tests substitute in-memory fakes.
//!
//! ERROR HANDLING
//! ==============
//! Lookup failures are returned to the caller as `SessionError`. Callers that
//! make routing decisions collapse them into "no session" via
//! [`resolve_session`], so an unavailable identity provider fails closed.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::IdentityConfig;

const USER_ENDPOINT: &str = "/auth/v1/user";
const CONNECT_TIMEOUT_SECS: u64 = 5;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The HTTP request to the identity provider failed.
    #[error("identity request failed: {0}")]
    Request(String),
    /// The identity provider returned an unexpected status.
    #[error("identity response error: status {status}")]
    Response { status: u16 },
    /// The identity provider response body could not be deserialized.
    #[error("identity response parse failed: {0}")]
    Parse(String),
    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

/// Proof of authentication as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub user_id: Uuid,
    pub email: Option<String>,
    /// Expiry as unix seconds, from the access token's `exp` claim.
    pub expires_at: Option<i64>,
}

impl Session {
    /// A session past its expiry is no longer proof of anything.
    #[must_use]
    pub fn is_expired_at(&self, now_unix: i64) -> bool {
        self.expires_at.is_some_and(|exp| exp < now_unix)
    }
}

/// Capability to look up the session behind an access token.
#[async_trait::async_trait]
pub trait SessionProvider: Send + Sync {
    /// Return the session for `token`, `None` when the provider does not
    /// recognize it.
    async fn get_session(&self, token: &str) -> Result<Option<Session>, SessionError>;
}

/// Look up a session and reduce the result to "valid session or not".
///
/// A missing token skips the provider call. Lookup errors and expired
/// sessions are both treated as no session.
pub async fn resolve_session(provider: &dyn SessionProvider, token: Option<&str>) -> Option<Session> {
    let token = token.filter(|t| !t.is_empty())?;
    match provider.get_session(token).await {
        Ok(Some(session)) if session.is_expired_at(OffsetDateTime::now_utc().unix_timestamp()) => {
            tracing::debug!(user_id = %session.user_id, "session expired");
            None
        }
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(error = %e, "session lookup failed; treating as unauthenticated");
            None
        }
    }
}

// =============================================================================
// REMOTE PROVIDER
// =============================================================================

#[derive(Debug, Deserialize)]
struct IdentityUser {
    id: Uuid,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenClaims {
    exp: Option<i64>,
}

/// Read the `exp` claim from a JWT access token. The signature is not
/// checked here; the identity provider has already accepted the token.
pub(crate) fn token_expiry(token: &str) -> Option<i64> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice::<TokenClaims>(&bytes).ok()?.exp
}

/// Identity provider client (`GET {base}/auth/v1/user`).
pub struct RemoteSessionProvider {
    http: reqwest::Client,
    user_url: String,
    api_key: String,
}

impl RemoteSessionProvider {
    /// Build a client from identity settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &IdentityConfig) -> Result<Self, SessionError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| SessionError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, user_url: format!("{}{USER_ENDPOINT}", config.base_url), api_key: config.api_key.clone() })
    }
}

#[async_trait::async_trait]
impl SessionProvider for RemoteSessionProvider {
    async fn get_session(&self, token: &str) -> Result<Option<Session>, SessionError> {
        let response = self
            .http
            .get(&self.user_url)
            .header("apikey", &self.api_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| SessionError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| SessionError::Request(e.to_string()))?;

        parse_user_response(status, &text, token)
    }
}

/// Map an identity provider response for `token` to a session lookup result.
pub(crate) fn parse_user_response(status: u16, body: &str, token: &str) -> Result<Option<Session>, SessionError> {
    match status {
        200 => {
            let user: IdentityUser = serde_json::from_str(body).map_err(|e| SessionError::Parse(e.to_string()))?;
            Ok(Some(Session { user_id: user.id, email: user.email, expires_at: token_expiry(token) }))
        }
        401 | 403 => Ok(None),
        _ => Err(SessionError::Response { status }),
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
