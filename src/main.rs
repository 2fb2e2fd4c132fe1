mod config;
mod db;
mod guard;
mod onboarding;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use services::onboarding::PgOnboardingStore;
use services::pipeline::PgPipelineStore;
use services::session::RemoteSessionProvider;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = config::GateConfig::from_env().expect("invalid configuration");
    let port = config.port;

    let pool = db::init_pool(&config.database_url)
        .await
        .expect("database init failed");

    let sessions = RemoteSessionProvider::new(&config.identity).expect("identity client init failed");
    tracing::info!(identity = %config.identity.base_url, cookie = %config.session_cookie, "session provider initialized");

    let state = state::AppState::new(
        config,
        Arc::new(sessions),
        Arc::new(PgOnboardingStore::new(pool.clone())),
        Arc::new(PgPipelineStore::new(pool)),
    );

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "curator-gate listening");
    axum::serve(listener, app).await.expect("server failed");
}
