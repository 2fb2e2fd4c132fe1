//! Onboarding routes — wizard page and step transitions.
//!
//! DESIGN
//! ======
//! Each signed-in user gets one `OnboardingMachine` in `AppState::wizards`,
//! created lazily on first visit. A finished machine stays in the map until
//! its completion is persisted; from then on the stored flag answers alone.
//!
//! TRADE-OFFS
//! ==========
//! Completion is persisted from a spawned task and never awaited by the
//! request. A failed write is logged and the finished machine is kept, so the
//! user is treated as done until restart, after which they may see the
//! wizard again.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Redirect, Response};
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::auth::{AuthUser, MaybeAuthUser};
use super::pipelines::{error_body, now_millis, pipeline_error_to_status};
use crate::guard::routes::DASHBOARD_PATH;
use crate::onboarding::gate::{GateDecision, evaluate};
use crate::onboarding::views::{LOADING_PAGE, OnboardingView, render_page, view_for, view_for_name};
use crate::onboarding::{Finish, OnboardingMachine, OnboardingStep, Transition};
use crate::services::onboarding::{OnboardingStore, is_onboarding};
use crate::services::pipeline::{PipelineError, PipelineForm, PipelineRecord};
use crate::state::{AppState, WizardMap};

#[derive(Debug, Clone, Serialize)]
pub struct OnboardingSnapshot {
    pub is_onboarding: bool,
    pub current_step: OnboardingStep,
    /// How this user's wizard ended, while the gateway still holds it.
    /// `None` once completion is persisted and only the stored flag remains.
    pub finished: Option<Finish>,
    /// Where the client should go next, once the wizard is done.
    pub redirect: Option<&'static str>,
}

// =============================================================================
// HELPERS
// =============================================================================

/// Whether the user is mid-onboarding: an in-memory finished machine wins,
/// otherwise the persisted flag decides.
async fn user_is_onboarding(state: &AppState, user_id: Uuid) -> bool {
    if let Some(machine) = state.wizards.read().await.get(&user_id) {
        if machine.is_finished() {
            return false;
        }
    }
    is_onboarding(state.onboarding.as_ref(), user_id).await
}

async fn snapshot(state: &AppState, user_id: Uuid) -> OnboardingSnapshot {
    let onboarding = user_is_onboarding(state, user_id).await;
    let machine = state
        .wizards
        .read()
        .await
        .get(&user_id)
        .copied()
        .unwrap_or_default();
    OnboardingSnapshot {
        is_onboarding: onboarding,
        current_step: machine.current_step(),
        finished: machine.finish(),
        redirect: (!onboarding).then_some(DASHBOARD_PATH),
    }
}

/// Apply `f` to the user's machine, creating it on first use.
async fn with_machine<T>(state: &AppState, user_id: Uuid, f: impl FnOnce(&mut OnboardingMachine) -> T) -> T {
    let mut wizards = state.wizards.write().await;
    f(wizards.entry(user_id).or_default())
}

/// Persist completion without blocking the caller. On success the user's
/// machine is dropped; on failure it stays as the record of completion.
pub(crate) fn persist_completion(
    store: Arc<dyn OnboardingStore>,
    wizards: WizardMap,
    user_id: Uuid,
    how: Finish,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match store.mark_completed(user_id).await {
            Ok(()) => {
                wizards.write().await.remove(&user_id);
                tracing::info!(%user_id, ?how, "onboarding completion persisted");
            }
            Err(e) => tracing::error!(%user_id, ?how, error = %e, "failed to persist onboarding completion"),
        }
    })
}

async fn finish(state: &AppState, user_id: Uuid, how: Finish) -> OnboardingSnapshot {
    if user_is_onboarding(state, user_id).await {
        let transition = with_machine(state, user_id, |m| match how {
            Finish::Completed => m.complete_onboarding(),
            Finish::Skipped => m.skip_onboarding(),
        })
        .await;
        if let Transition::Finished(how) = transition {
            let _persist = persist_completion(state.onboarding.clone(), state.wizards.clone(), user_id, how);
        }
    }
    snapshot(state, user_id).await
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `GET /onboarding` — gate the wizard and render the current step.
pub async fn page(State(state): State<AppState>, auth: MaybeAuthUser) -> Response {
    let status = auth.status();
    let (onboarding, step) = match &auth.0 {
        Some(session) => {
            let onboarding = user_is_onboarding(&state, session.user_id).await;
            let step = if onboarding {
                with_machine(&state, session.user_id, |m| m.current_step()).await
            } else {
                OnboardingStep::Welcome
            };
            (onboarding, step)
        }
        None => (false, OnboardingStep::Welcome),
    };

    match evaluate(status, onboarding, step) {
        GateDecision::Loading => Html(LOADING_PAGE).into_response(),
        GateDecision::NavigateTo(path) => Redirect::temporary(path).into_response(),
        GateDecision::Render(step) => Html(render_page(&view_for(step))).into_response(),
    }
}

/// `GET /api/onboarding/views/{step}` — view content for a step name.
pub async fn view(Path(step): Path<String>) -> Json<OnboardingView> {
    Json(view_for_name(&step))
}

/// `GET /api/onboarding` — current wizard state.
pub async fn status(State(state): State<AppState>, auth: AuthUser) -> Json<OnboardingSnapshot> {
    Json(snapshot(&state, auth.session.user_id).await)
}

/// `POST /api/onboarding/next` — advance one step.
pub async fn next(State(state): State<AppState>, auth: AuthUser) -> Result<Json<OnboardingSnapshot>, StatusCode> {
    let user_id = auth.session.user_id;
    if !user_is_onboarding(&state, user_id).await {
        return Err(StatusCode::CONFLICT);
    }
    with_machine(&state, user_id, OnboardingMachine::next_step).await;
    Ok(Json(snapshot(&state, user_id).await))
}

/// `POST /api/onboarding/skip` — leave the wizard without finishing it.
pub async fn skip(State(state): State<AppState>, auth: AuthUser) -> Json<OnboardingSnapshot> {
    Json(finish(&state, auth.session.user_id, Finish::Skipped).await)
}

/// `POST /api/onboarding/complete` — finish the wizard.
pub async fn complete(State(state): State<AppState>, auth: AuthUser) -> Json<OnboardingSnapshot> {
    Json(finish(&state, auth.session.user_id, Finish::Completed).await)
}

#[derive(Debug, Serialize)]
pub struct PipelineCreated {
    pub pipeline: PipelineRecord,
    pub onboarding: OnboardingSnapshot,
}

/// `POST /api/onboarding/pipeline` — create the first pipeline and move on
/// to the success step.
pub async fn create_pipeline(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(form): Json<PipelineForm>,
) -> Response {
    let user_id = auth.session.user_id;
    let at_creation_step = user_is_onboarding(&state, user_id).await
        && with_machine(&state, user_id, |m| m.current_step()).await == OnboardingStep::PipelineCreation;
    if !at_creation_step {
        return (StatusCode::CONFLICT, error_body("Pipeline creation is not the current onboarding step"))
            .into_response();
    }

    let new_pipeline = match form.into_new_pipeline(user_id, now_millis()) {
        Ok(p) => p,
        Err(e) => {
            let err = PipelineError::from(e);
            return (pipeline_error_to_status(&err), error_body(&err.to_string())).into_response();
        }
    };

    match state.pipelines.create(&new_pipeline).await {
        Ok(pipeline) => {
            with_machine(&state, user_id, OnboardingMachine::next_step).await;
            tracing::info!(%user_id, pipeline_id = %pipeline.pipeline_id, "onboarding pipeline created");
            let onboarding = snapshot(&state, user_id).await;
            (StatusCode::CREATED, Json(PipelineCreated { pipeline, onboarding })).into_response()
        }
        Err(e) => {
            tracing::warn!(%user_id, error = %e, "onboarding pipeline creation failed");
            (pipeline_error_to_status(&e), error_body(&e.to_string())).into_response()
        }
    }
}

#[cfg(test)]
#[path = "onboarding_test.rs"]
mod tests;
