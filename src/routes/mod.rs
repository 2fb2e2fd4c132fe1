//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the onboarding page, the JSON API and the front-end build under a
//! single Axum router. The route guard wraps everything, including the
//! static fallback, so every request path is classified before it is served.

pub mod auth;
pub mod onboarding;
pub mod pipelines;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::guard;
use crate::guard::routes::ONBOARDING_PATH;
use crate::state::AppState;

/// Full application router: API + wizard page + front-end fallback, behind
/// the route guard.
pub fn app(state: AppState) -> Router {
    let site = ServeDir::new(&state.config.site_dir).append_index_html_on_directories(true);

    Router::new()
        .route(ONBOARDING_PATH, get(onboarding::page))
        .route("/api/auth/session", get(auth::session_status))
        .route("/api/onboarding", get(onboarding::status))
        .route("/api/onboarding/views/{step}", get(onboarding::view))
        .route("/api/onboarding/next", post(onboarding::next))
        .route("/api/onboarding/skip", post(onboarding::skip))
        .route("/api/onboarding/complete", post(onboarding::complete))
        .route("/api/onboarding/pipeline", post(onboarding::create_pipeline))
        .route("/api/pipelines", get(pipelines::list_pipelines).post(pipelines::create_pipeline))
        .route("/api/pipelines/{id}", get(pipelines::get_pipeline).put(pipelines::update_pipeline))
        .route("/api/healthz", get(healthz))
        .fallback_service(site)
        .layer(middleware::from_fn_with_state(state.clone(), guard::route_guard))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::body::Body;
    use axum::http::{Request, Response, header};
    use tower::ServiceExt;

    use crate::config::DEFAULT_SESSION_COOKIE;
    use crate::state::AppState;

    pub async fn send(state: &AppState, method: &str, path: &str, token: Option<&str>, json: Option<serde_json::Value>) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::COOKIE, format!("{DEFAULT_SESSION_COOKIE}={token}"));
        }
        let body = match json {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        super::app(state.clone())
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }

    pub fn location(resp: &Response<Body>) -> Option<&str> {
        resp.headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    pub async fn body_string(resp: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    pub async fn body_json(resp: Response<Body>) -> serde_json::Value {
        serde_json::from_str(&body_string(resp).await).unwrap()
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
