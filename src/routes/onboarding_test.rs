use super::*;
use crate::routes::test_support::{body_json, body_string, location, send};
use crate::state::test_helpers::{
    FakeOnboardingStore, FakePipelineStore, FakeSessions, TestApp, session_for, test_app,
};

const TOKEN: &str = "tok-onboarding";

fn app_with(onboarding: FakeOnboardingStore, user_id: Uuid) -> TestApp {
    test_app(FakeSessions::new().with(TOKEN, session_for(user_id)), onboarding, FakePipelineStore::new())
}

fn new_user() -> (TestApp, Uuid) {
    let user_id = Uuid::new_v4();
    (app_with(FakeOnboardingStore::new(), user_id), user_id)
}

fn pipeline_form() -> serde_json::Value {
    serde_json::json!({
        "pipeline_name": "My First Pipeline",
        "focus": "Systems programming",
        "delivery_email": ["ada@example.com"],
        "subreddits": ["rust"]
    })
}

/// Let spawned persistence tasks run.
async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
}

async fn advance(app: &TestApp, times: usize) -> serde_json::Value {
    let mut last = serde_json::Value::Null;
    for _ in 0..times {
        let resp = send(&app.state, "POST", "/api/onboarding/next", Some(TOKEN), None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        last = body_json(resp).await;
    }
    last
}

// =============================================================================
// page gate
// =============================================================================

#[tokio::test]
async fn page_handler_without_session_goes_to_login() {
    let (app, _) = new_user();
    let resp = page(State(app.state.clone()), MaybeAuthUser(None)).await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&resp), Some("/login"));
}

#[tokio::test]
async fn anonymous_page_request_is_stopped_by_guard() {
    let (app, _) = new_user();
    let resp = send(&app.state, "GET", "/onboarding", None, None).await;
    assert_eq!(location(&resp), Some("/login?redirectedFrom=%2Fonboarding"));
}

#[tokio::test]
async fn new_user_sees_welcome() {
    let (app, _) = new_user();
    let resp = send(&app.state, "GET", "/onboarding", Some(TOKEN), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_string(resp).await;
    assert!(html.contains(r#"data-step="welcome""#));
}

#[tokio::test]
async fn completed_user_is_sent_to_dashboard() {
    let user_id = Uuid::new_v4();
    let app = app_with(FakeOnboardingStore::new().with(user_id, Some(true)), user_id);
    let resp = send(&app.state, "GET", "/onboarding", Some(TOKEN), None).await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&resp), Some("/dashboard"));
}

#[tokio::test]
async fn unreadable_status_keeps_user_in_wizard() {
    let user_id = Uuid::new_v4();
    let app = app_with(FakeOnboardingStore::failing(), user_id);
    let resp = send(&app.state, "GET", "/onboarding", Some(TOKEN), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn page_renders_advanced_step() {
    let (app, _) = new_user();
    advance(&app, 2).await;
    let html = body_string(send(&app.state, "GET", "/onboarding", Some(TOKEN), None).await).await;
    assert!(html.contains(r#"data-step="pipeline-creation""#));
}

// =============================================================================
// transitions
// =============================================================================

#[tokio::test]
async fn api_requires_session() {
    let (app, _) = new_user();
    for (method, path) in [
        ("GET", "/api/onboarding"),
        ("POST", "/api/onboarding/next"),
        ("POST", "/api/onboarding/skip"),
        ("POST", "/api/onboarding/complete"),
    ] {
        let resp = send(&app.state, method, path, None, None).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{method} {path}");
    }
}

#[tokio::test]
async fn status_of_new_user_is_welcome() {
    let (app, _) = new_user();
    let body = body_json(send(&app.state, "GET", "/api/onboarding", Some(TOKEN), None).await).await;
    assert_eq!(body["is_onboarding"], true);
    assert_eq!(body["current_step"], "welcome");
    assert!(body["redirect"].is_null());
}

#[tokio::test]
async fn three_nexts_reach_success_and_clamp() {
    let (app, _) = new_user();
    assert_eq!(advance(&app, 3).await["current_step"], "success");
    assert_eq!(advance(&app, 1).await["current_step"], "success");
}

#[tokio::test]
async fn skip_finishes_from_any_step() {
    let (app, user_id) = new_user();
    advance(&app, 1).await;
    let body = body_json(send(&app.state, "POST", "/api/onboarding/skip", Some(TOKEN), None).await).await;
    assert_eq!(body["is_onboarding"], false);
    assert_eq!(body["finished"], "skipped");
    assert_eq!(body["redirect"], "/dashboard");
    settle().await;
    assert_eq!(app.onboarding.completed(user_id), Some(true));

    let resp = send(&app.state, "GET", "/onboarding", Some(TOKEN), None).await;
    assert_eq!(location(&resp), Some("/dashboard"));
}

#[tokio::test]
async fn complete_is_idempotent() {
    let (app, _) = new_user();
    advance(&app, 3).await;
    let first = body_json(send(&app.state, "POST", "/api/onboarding/complete", Some(TOKEN), None).await).await;
    let second = body_json(send(&app.state, "POST", "/api/onboarding/skip", Some(TOKEN), None).await).await;
    assert_eq!(first["finished"], "completed");
    assert_eq!(second["is_onboarding"], false);
    assert_ne!(second["finished"], "skipped");
    settle().await;
    assert_eq!(app.onboarding.writes(), 1);
}

#[tokio::test]
async fn persisted_completion_releases_wizards() {
    let users: Vec<Uuid> = (0..10).map(|_| Uuid::new_v4()).collect();
    let sessions = users
        .iter()
        .fold(FakeSessions::new(), |s, id| s.with(&id.to_string(), session_for(*id)));
    let app = test_app(sessions, FakeOnboardingStore::new(), FakePipelineStore::new());

    for id in &users {
        let token = id.to_string();
        send(&app.state, "GET", "/onboarding", Some(&token), None).await;
        send(&app.state, "POST", "/api/onboarding/complete", Some(&token), None).await;
    }
    settle().await;

    assert_eq!(app.onboarding.writes(), users.len());
    assert!(app.state.wizards.read().await.is_empty());
    for id in &users {
        let resp = send(&app.state, "GET", "/onboarding", Some(&id.to_string()), None).await;
        assert_eq!(location(&resp), Some("/dashboard"));
    }
}

#[tokio::test]
async fn next_after_finish_conflicts() {
    let (app, _) = new_user();
    send(&app.state, "POST", "/api/onboarding/skip", Some(TOKEN), None).await;
    let resp = send(&app.state, "POST", "/api/onboarding/next", Some(TOKEN), None).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn failed_persistence_does_not_roll_back() {
    let user_id = Uuid::new_v4();
    let app = app_with(FakeOnboardingStore::failing_writes(), user_id);
    let body = body_json(send(&app.state, "POST", "/api/onboarding/skip", Some(TOKEN), None).await).await;
    assert_eq!(body["is_onboarding"], false);
    settle().await;
    assert!(app.state.wizards.read().await[&user_id].is_finished());
    let resp = send(&app.state, "GET", "/onboarding", Some(TOKEN), None).await;
    assert_eq!(location(&resp), Some("/dashboard"));
}

// =============================================================================
// persist_completion
// =============================================================================

fn finished_wizard(user_id: Uuid, how: Finish) -> WizardMap {
    let mut machine = OnboardingMachine::new();
    match how {
        Finish::Completed => machine.complete_onboarding(),
        Finish::Skipped => machine.skip_onboarding(),
    };
    Arc::new(tokio::sync::RwLock::new(std::collections::HashMap::from([(user_id, machine)])))
}

#[tokio::test]
async fn persist_completion_writes_flag_and_drops_machine() {
    let store = Arc::new(FakeOnboardingStore::new());
    let user_id = Uuid::new_v4();
    let wizards = finished_wizard(user_id, Finish::Completed);
    persist_completion(store.clone(), wizards.clone(), user_id, Finish::Completed).await.unwrap();
    assert_eq!(store.completed(user_id), Some(true));
    assert_eq!(store.writes(), 1);
    assert!(wizards.read().await.is_empty());
}

#[tokio::test]
async fn persist_completion_failure_keeps_machine() {
    let store = Arc::new(FakeOnboardingStore::failing_writes());
    let user_id = Uuid::new_v4();
    let wizards = finished_wizard(user_id, Finish::Skipped);
    persist_completion(store.clone(), wizards.clone(), user_id, Finish::Skipped).await.unwrap();
    assert_eq!(store.completed(user_id), None);
    assert_eq!(store.writes(), 1);
    assert_eq!(wizards.read().await[&user_id].finish(), Some(Finish::Skipped));
}

// =============================================================================
// pipeline creation step
// =============================================================================

#[tokio::test]
async fn pipeline_before_creation_step_conflicts() {
    let (app, _) = new_user();
    let resp = send(&app.state, "POST", "/api/onboarding/pipeline", Some(TOKEN), Some(pipeline_form())).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(app.pipelines.len(), 0);
}

#[tokio::test]
async fn pipeline_at_creation_step_advances_to_success() {
    let (app, user_id) = new_user();
    advance(&app, 2).await;
    let resp = send(&app.state, "POST", "/api/onboarding/pipeline", Some(TOKEN), Some(pipeline_form())).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    assert_eq!(body["onboarding"]["current_step"], "success");
    assert_eq!(body["pipeline"]["user_id"], user_id.to_string());
    assert_eq!(body["pipeline"]["delivery_time"], "09:00:00");
    assert_eq!(app.pipelines.len(), 1);
}

#[tokio::test]
async fn invalid_pipeline_keeps_step() {
    let (app, _) = new_user();
    advance(&app, 2).await;
    let mut form = pipeline_form();
    form["focus"] = serde_json::json!("");
    let resp = send(&app.state, "POST", "/api/onboarding/pipeline", Some(TOKEN), Some(form)).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(resp).await["error"], "Focus is required");
    let status = body_json(send(&app.state, "GET", "/api/onboarding", Some(TOKEN), None).await).await;
    assert_eq!(status["current_step"], "pipeline-creation");
}

// =============================================================================
// step views
// =============================================================================

#[tokio::test]
async fn view_endpoint_maps_step_names() {
    let (app, _) = new_user();
    let body = body_json(send(&app.state, "GET", "/api/onboarding/views/success", None, None).await).await;
    assert_eq!(body["step"], "success");
    assert_eq!(body["actions"][0]["endpoint"], "/api/onboarding/complete");
}

#[tokio::test]
async fn view_endpoint_falls_back_to_welcome() {
    let (app, _) = new_user();
    let body = body_json(send(&app.state, "GET", "/api/onboarding/views/not-a-step", None, None).await).await;
    assert_eq!(body["step"], "welcome");
}
