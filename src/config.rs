//! Gateway configuration parsed from environment variables.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SESSION_COOKIE: &str = "sb-access-token";
pub const DEFAULT_SITE_DIR: &str = "./site";
pub const DEFAULT_IDENTITY_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_STATIC_PREFIXES: &[&str] = &["/_next/static", "/_next/image", "/favicon.ico", "/public"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("missing required env var {0}")]
    Missing(&'static str),
    /// A value was present but unusable.
    #[error("config parse failed: {0}")]
    Parse(String),
}

/// Identity provider connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    pub port: u16,
    pub database_url: String,
    pub identity: IdentityConfig,
    /// Cookie that carries the identity provider access token.
    pub session_cookie: String,
    /// Built front-end served for every route the gateway does not handle.
    pub site_dir: PathBuf,
    /// Path prefixes that skip the route guard entirely.
    pub static_prefixes: Vec<String>,
}

impl GateConfig {
    /// Build typed config from environment variables.
    ///
    /// Required:
    /// - `DATABASE_URL`
    /// - `IDENTITY_URL`
    /// - `IDENTITY_API_KEY`
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `IDENTITY_TIMEOUT_SECS`: default 10
    /// - `SESSION_COOKIE`: default `sb-access-token`
    /// - `SITE_DIR`: default `./site`
    /// - `STATIC_PREFIXES`: comma separated, default is the front-end build internals
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or the identity URL
    /// is not an http(s) URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = required("DATABASE_URL")?;
        let identity = IdentityConfig {
            base_url: parse_base_url(&required("IDENTITY_URL")?)?,
            api_key: required("IDENTITY_API_KEY")?,
            timeout: Duration::from_secs(env_parse("IDENTITY_TIMEOUT_SECS", DEFAULT_IDENTITY_TIMEOUT_SECS)),
        };

        Ok(Self {
            port: env_parse("PORT", DEFAULT_PORT),
            database_url,
            identity,
            session_cookie: std::env::var("SESSION_COOKIE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SESSION_COOKIE.to_owned()),
            site_dir: site_dir_from(std::env::var("SITE_DIR").ok()),
            static_prefixes: parse_prefix_list(std::env::var("STATIC_PREFIXES").ok().as_deref()),
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(key))
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn site_dir_from(raw: Option<String>) -> PathBuf {
    raw.filter(|v| !v.trim().is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_SITE_DIR), PathBuf::from)
}

fn parse_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::Parse(format!("IDENTITY_URL must be an http(s) URL, got '{raw}'")));
    }
    Ok(trimmed.to_owned())
}

/// Parse a comma separated prefix list. Entries are trimmed, empty entries
/// dropped, and a leading `/` added when missing. Absent or empty input
/// yields the default prefixes.
pub(crate) fn parse_prefix_list(raw: Option<&str>) -> Vec<String> {
    let parsed: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| if p.starts_with('/') { p.to_owned() } else { format!("/{p}") })
        .collect();

    if parsed.is_empty() {
        DEFAULT_STATIC_PREFIXES.iter().map(|p| (*p).to_owned()).collect()
    } else {
        parsed
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
