//! Pipeline routes — create, edit, list and look up a user's pipelines.

use axum::extract::rejection::PathRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::auth::AuthUser;
use crate::guard::routes::DASHBOARD_PATH;
use crate::services::pipeline::{PipelineError, PipelineForm, PipelineRecord, PipelineSummary, format_subreddits};
use crate::state::AppState;

/// Where content views send the user back to after a failed lookup.
pub const CONTENT_BACK_PATH: &str = "/dashboard/content";

pub(crate) fn pipeline_error_to_status(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::Validation(_) | PipelineError::InvalidData => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::DuplicateName => StatusCode::CONFLICT,
        PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
        PipelineError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn error_body(message: &str) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "error": message }))
}

/// Inline error state for content views: a message plus where "back" goes.
fn content_error(status: StatusCode, message: &str, back: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message, "back": back }))).into_response()
}

fn pipeline_not_found() -> Response {
    content_error(StatusCode::NOT_FOUND, "Pipeline not found", CONTENT_BACK_PATH)
}

pub(crate) fn now_millis() -> u128 {
    u128::try_from(OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000).unwrap_or_default()
}

/// `POST /api/pipelines` — validate and create a pipeline.
pub async fn create_pipeline(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(form): Json<PipelineForm>,
) -> Response {
    let user_id = auth.session.user_id;
    let result = match form.into_new_pipeline(user_id, now_millis()) {
        Ok(p) => state.pipelines.create(&p).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => {
            if matches!(e, PipelineError::Db(_)) {
                tracing::error!(%user_id, error = %e, "pipeline create failed");
            }
            (pipeline_error_to_status(&e), error_body(&e.to_string())).into_response()
        }
    }
}

/// Pipeline plus display-ready fields for content views.
#[derive(Debug, Serialize)]
pub struct ContentPipeline {
    #[serde(flatten)]
    pub pipeline: PipelineRecord,
    /// Subreddits with their `r/` prefix.
    pub subreddit_labels: Vec<String>,
}

/// `GET /api/pipelines/{id}` — fetch a pipeline for a content view.
///
/// Failures come back as an inline error state the view can render with a
/// back link, not as a bare status. A malformed id gets the not-found state.
pub async fn get_pipeline(
    State(state): State<AppState>,
    auth: AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> Response {
    let Ok(Path(id)) = id else {
        return pipeline_not_found();
    };
    match state.pipelines.fetch(auth.session.user_id, id).await {
        Ok(pipeline) => {
            let subreddit_labels = format_subreddits(&pipeline.subreddits);
            Json(ContentPipeline { pipeline, subreddit_labels }).into_response()
        }
        Err(PipelineError::NotFound(_)) => pipeline_not_found(),
        Err(e) => {
            tracing::error!(pipeline = id, error = %e, "pipeline lookup failed");
            content_error(StatusCode::BAD_GATEWAY, &e.to_string(), CONTENT_BACK_PATH)
        }
    }
}

/// `PUT /api/pipelines/{id}` — validate and overwrite one of the user's
/// pipelines. The public `pipeline_id` is left as created.
pub async fn update_pipeline(
    State(state): State<AppState>,
    auth: AuthUser,
    id: Result<Path<i64>, PathRejection>,
    Json(form): Json<PipelineForm>,
) -> Response {
    let Ok(Path(id)) = id else {
        return pipeline_not_found();
    };
    let user_id = auth.session.user_id;
    let result = match form.into_changes() {
        Ok(changes) => state.pipelines.update(user_id, id, &changes).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(record) => Json(record).into_response(),
        Err(PipelineError::NotFound(_)) => pipeline_not_found(),
        Err(e) => {
            if matches!(e, PipelineError::Db(_)) {
                tracing::error!(%user_id, pipeline = id, error = %e, "pipeline update failed");
            }
            (pipeline_error_to_status(&e), error_body(&e.to_string())).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Case-insensitive substring of the pipeline name.
    pub q: Option<String>,
}

/// `GET /api/pipelines` — the user's pipelines, newest first.
pub async fn list_pipelines(State(state): State<AppState>, auth: AuthUser, Query(query): Query<ListQuery>) -> Response {
    let user_id = auth.session.user_id;
    match state.pipelines.list(user_id).await {
        Ok(mut pipelines) => {
            if let Some(q) = query.q.map(|q| q.trim().to_lowercase()).filter(|q| !q.is_empty()) {
                pipelines.retain(|p| p.pipeline_name.to_lowercase().contains(&q));
            }
            Json::<Vec<PipelineSummary>>(pipelines).into_response()
        }
        Err(e) => {
            tracing::error!(%user_id, error = %e, "pipeline list failed");
            content_error(StatusCode::BAD_GATEWAY, &e.to_string(), DASHBOARD_PATH)
        }
    }
}

#[cfg(test)]
#[path = "pipelines_test.rs"]
mod tests;
