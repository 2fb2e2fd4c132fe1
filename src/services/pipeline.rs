//! Pipeline service — form validation, normalization, persistence.
//!
//! DESIGN
//! ======
//! A pipeline is a user's content-aggregation unit: sources, a delivery
//! schedule and the addresses to deliver to. The onboarding wizard creates
//! the first one. Validation and normalization are pure so they can be
//! tested without a database; `PipelineStore` is the persistence seam over
//! the externally owned `pipeline_configs` table.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

const DEFAULT_SCHEDULE: &str = "daily";
const DEFAULT_DELIVERY_TIME: &str = "09:00";
const PIPELINE_ID_SUFFIX_DIGITS: usize = 6;

const PG_UNIQUE_VIOLATION: &str = "23505";
const PG_CHECK_VIOLATION: &str = "23514";

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

// =============================================================================
// ERRORS
// =============================================================================

/// First problem found in a submitted pipeline form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Pipeline name is required")]
    MissingName,
    #[error("Focus is required")]
    MissingFocus,
    #[error("At least one subreddit is required")]
    MissingSubreddit,
    #[error("Email is required for delivery")]
    MissingEmail,
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),
    #[error("Delivery time must be HH:MM, got '{0}'")]
    InvalidDeliveryTime(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("A pipeline with this name already exists. Please choose a different name.")]
    DuplicateName,
    #[error("Invalid data format. Please check your inputs and try again.")]
    InvalidData,
    #[error("Pipeline not found")]
    NotFound(i64),
    #[error("Database error: {0}")]
    Db(sqlx::Error),
}

impl From<sqlx::Error> for PipelineError {
    fn from(e: sqlx::Error) -> Self {
        let code = e
            .as_database_error()
            .and_then(|db| db.code())
            .map(std::borrow::Cow::into_owned);
        match code.as_deref() {
            Some(PG_UNIQUE_VIOLATION) => Self::DuplicateName,
            Some(PG_CHECK_VIOLATION) => Self::InvalidData,
            _ => Self::Db(e),
        }
    }
}

// =============================================================================
// FORM
// =============================================================================

fn default_schedule() -> String {
    DEFAULT_SCHEDULE.to_owned()
}

fn default_delivery_time() -> String {
    DEFAULT_DELIVERY_TIME.to_owned()
}

fn default_active() -> bool {
    true
}

/// Pipeline fields as submitted by the front-end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineForm {
    pub pipeline_name: String,
    pub focus: String,
    #[serde(default = "default_schedule")]
    pub schedule: String,
    /// `HH:MM`, local to the delivery schedule.
    #[serde(default = "default_delivery_time")]
    pub delivery_time: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub delivery_email: Vec<String>,
    #[serde(default)]
    pub subreddits: Vec<String>,
    #[serde(default)]
    pub source: Vec<String>,
}

/// Validated, normalized form fields shared by create and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineChanges {
    pub pipeline_name: String,
    pub focus: String,
    pub schedule: String,
    /// `HH:MM:SS`.
    pub delivery_time: String,
    pub is_active: bool,
    pub delivery_email: Vec<String>,
    pub subreddits: Vec<String>,
    pub source: Vec<String>,
}

/// A validated, normalized pipeline ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPipeline {
    pub user_id: Uuid,
    pub pipeline_id: String,
    pub pipeline_name: String,
    pub focus: String,
    pub schedule: String,
    /// `HH:MM:SS`.
    pub delivery_time: String,
    pub is_active: bool,
    pub delivery_email: Vec<String>,
    pub subreddits: Vec<String>,
    pub source: Vec<String>,
}

impl PipelineForm {
    /// Validate the form and normalize it for a new pipeline.
    ///
    /// `now_millis` seeds the `pipeline_id` suffix.
    ///
    /// # Errors
    ///
    /// Returns the first validation problem, in form order.
    pub fn into_new_pipeline(self, user_id: Uuid, now_millis: u128) -> Result<NewPipeline, ValidationError> {
        let c = self.into_changes()?;
        Ok(NewPipeline {
            user_id,
            pipeline_id: pipeline_id_for(&c.pipeline_name, now_millis),
            pipeline_name: c.pipeline_name,
            focus: c.focus,
            schedule: c.schedule,
            delivery_time: c.delivery_time,
            is_active: c.is_active,
            delivery_email: c.delivery_email,
            subreddits: c.subreddits,
            source: c.source,
        })
    }

    /// Validate the form and normalize it for storage. The public
    /// `pipeline_id` is not part of the changes; it never moves on edit.
    ///
    /// # Errors
    ///
    /// Returns the first validation problem, in form order.
    pub fn into_changes(self) -> Result<PipelineChanges, ValidationError> {
        let pipeline_name = self.pipeline_name.trim().to_owned();
        if pipeline_name.is_empty() {
            return Err(ValidationError::MissingName);
        }
        if self.focus.trim().is_empty() {
            return Err(ValidationError::MissingFocus);
        }

        let subreddits: Vec<String> = self
            .subreddits
            .iter()
            .map(|s| clean_subreddit_name(s.trim()).to_owned())
            .filter(|s| !s.is_empty())
            .collect();
        if subreddits.is_empty() {
            return Err(ValidationError::MissingSubreddit);
        }

        let delivery_email: Vec<String> = self
            .delivery_email
            .iter()
            .map(|e| e.trim().to_owned())
            .filter(|e| !e.is_empty())
            .collect();
        if delivery_email.is_empty() {
            return Err(ValidationError::MissingEmail);
        }
        if let Some(bad) = delivery_email.iter().find(|e| !is_valid_email(e)) {
            return Err(ValidationError::InvalidEmail(bad.clone()));
        }

        let delivery_time = normalize_delivery_time(&self.delivery_time)?;

        Ok(PipelineChanges {
            pipeline_name,
            focus: self.focus.trim().to_owned(),
            schedule: self.schedule,
            delivery_time,
            is_active: self.is_active,
            delivery_email,
            subreddits,
            source: self.source,
        })
    }
}

#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Strip a typed `r/` prefix from a subreddit name.
#[must_use]
pub fn clean_subreddit_name(subreddit: &str) -> &str {
    subreddit.strip_prefix("r/").unwrap_or(subreddit)
}

/// Prefix each subreddit with `r/` for display, leaving prefixed ones alone.
#[must_use]
pub fn format_subreddits(subreddits: &[String]) -> Vec<String> {
    subreddits
        .iter()
        .map(|s| if s.starts_with("r/") { s.clone() } else { format!("r/{s}") })
        .collect()
}

/// Derive the public pipeline id: slugged name plus the last six digits of
/// the creation timestamp.
#[must_use]
pub fn pipeline_id_for(name: &str, now_millis: u128) -> String {
    let slug = WHITESPACE_RE.replace_all(&name.to_lowercase(), "-").into_owned();
    let stamp = now_millis.to_string();
    let suffix = &stamp[stamp.len().saturating_sub(PIPELINE_ID_SUFFIX_DIGITS)..];
    format!("{slug}-{suffix}")
}

/// Accept `HH:MM` (or already-normalized `HH:MM:SS`) and return `HH:MM:00`.
fn normalize_delivery_time(raw: &str) -> Result<String, ValidationError> {
    let invalid = || ValidationError::InvalidDeliveryTime(raw.to_owned());
    let trimmed = raw.trim();
    let mut parts = trimmed.split(':');
    let (Some(h), Some(m)) = (parts.next(), parts.next()) else {
        return Err(invalid());
    };
    if parts.next().is_some_and(|s| s != "00") || parts.next().is_some() {
        return Err(invalid());
    }
    let two_digits = |s: &str| s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit());
    if !two_digits(h) || !two_digits(m) {
        return Err(invalid());
    }
    let hour: u8 = h.parse().map_err(|_| invalid())?;
    let minute: u8 = m.parse().map_err(|_| invalid())?;
    if hour > 23 || minute > 59 {
        return Err(invalid());
    }
    Ok(format!("{h}:{m}:00"))
}

// =============================================================================
// STORE
// =============================================================================

/// Stored pipeline as returned to the front-end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineRecord {
    pub id: i64,
    pub user_id: Uuid,
    pub pipeline_id: String,
    pub pipeline_name: String,
    pub focus: String,
    pub schedule: String,
    pub delivery_time: String,
    pub is_active: bool,
    pub delivery_email: Vec<String>,
    pub subreddits: Vec<String>,
    pub source: Vec<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// List entry for the content view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineSummary {
    pub id: i64,
    pub pipeline_name: String,
    pub created_at: String,
}

#[async_trait::async_trait]
pub trait PipelineStore: Send + Sync {
    async fn create(&self, pipeline: &NewPipeline) -> Result<PipelineRecord, PipelineError>;

    /// Fetch one of the user's pipelines by row id.
    async fn fetch(&self, user_id: Uuid, id: i64) -> Result<PipelineRecord, PipelineError>;

    /// Overwrite one of the user's pipelines and stamp `updated_at`.
    async fn update(&self, user_id: Uuid, id: i64, changes: &PipelineChanges) -> Result<PipelineRecord, PipelineError>;

    /// The user's pipelines, newest first.
    async fn list(&self, user_id: Uuid) -> Result<Vec<PipelineSummary>, PipelineError>;
}

pub struct PgPipelineStore {
    pool: PgPool,
}

impl PgPipelineStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const RETURNING_COLUMNS: &str = r"id, user_id, pipeline_id, pipeline_name, focus, schedule,
    delivery_time::text AS delivery_time, is_active,
    COALESCE(delivery_email, '{}') AS delivery_email,
    COALESCE(subreddits, '{}') AS subreddits,
    COALESCE(source, '{}') AS source,
    created_at::text AS created_at, updated_at::text AS updated_at";

fn record_from_row(row: &PgRow) -> PipelineRecord {
    PipelineRecord {
        id: row.get("id"),
        user_id: row.get("user_id"),
        pipeline_id: row.get("pipeline_id"),
        pipeline_name: row.get("pipeline_name"),
        focus: row.get("focus"),
        schedule: row.get("schedule"),
        delivery_time: row.get("delivery_time"),
        is_active: row.get("is_active"),
        delivery_email: row.get("delivery_email"),
        subreddits: row.get("subreddits"),
        source: row.get("source"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait::async_trait]
impl PipelineStore for PgPipelineStore {
    async fn create(&self, p: &NewPipeline) -> Result<PipelineRecord, PipelineError> {
        let sql = format!(
            r"INSERT INTO pipeline_configs
                  (user_id, pipeline_id, pipeline_name, focus, schedule, delivery_time,
                   is_active, delivery_email, subreddits, source)
              VALUES ($1, $2, $3, $4, $5, $6::time, $7, $8, $9, $10)
              RETURNING {RETURNING_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(p.user_id)
            .bind(&p.pipeline_id)
            .bind(&p.pipeline_name)
            .bind(&p.focus)
            .bind(&p.schedule)
            .bind(&p.delivery_time)
            .bind(p.is_active)
            .bind(&p.delivery_email)
            .bind(&p.subreddits)
            .bind(&p.source)
            .fetch_one(&self.pool)
            .await?;
        Ok(record_from_row(&row))
    }

    async fn fetch(&self, user_id: Uuid, id: i64) -> Result<PipelineRecord, PipelineError> {
        let sql = format!("SELECT {RETURNING_COLUMNS} FROM pipeline_configs WHERE id = $1 AND user_id = $2");
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(PipelineError::NotFound(id))?;
        Ok(record_from_row(&row))
    }

    async fn update(&self, user_id: Uuid, id: i64, c: &PipelineChanges) -> Result<PipelineRecord, PipelineError> {
        let sql = format!(
            r"UPDATE pipeline_configs
              SET pipeline_name = $3, focus = $4, schedule = $5, delivery_time = $6::time,
                  is_active = $7, delivery_email = $8, subreddits = $9, source = $10,
                  updated_at = now()
              WHERE id = $1 AND user_id = $2
              RETURNING {RETURNING_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(user_id)
            .bind(&c.pipeline_name)
            .bind(&c.focus)
            .bind(&c.schedule)
            .bind(&c.delivery_time)
            .bind(c.is_active)
            .bind(&c.delivery_email)
            .bind(&c.subreddits)
            .bind(&c.source)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(PipelineError::NotFound(id))?;
        Ok(record_from_row(&row))
    }

    async fn list(&self, user_id: Uuid) -> Result<Vec<PipelineSummary>, PipelineError> {
        let rows = sqlx::query(
            r"SELECT id, pipeline_name, created_at::text AS created_at
              FROM pipeline_configs
              WHERE user_id = $1
              ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|r| PipelineSummary {
                id: r.get("id"),
                pipeline_name: r.get("pipeline_name"),
                created_at: r.get("created_at"),
            })
            .collect())
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
