//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is built once in `main` and injected into handlers and the
//! route guard via the `State` extractor. External collaborators sit behind
//! trait objects so tests swap in fakes. The only state the gateway owns is
//! the per-user wizard machine map.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::GateConfig;
use crate::guard::routes::RouteTable;
use crate::onboarding::OnboardingMachine;
use crate::services::onboarding::OnboardingStore;
use crate::services::pipeline::PipelineStore;
use crate::services::session::SessionProvider;

/// Live wizard machines keyed by user id.
pub type WizardMap = Arc<RwLock<HashMap<Uuid, OnboardingMachine>>>;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GateConfig>,
    pub routes: Arc<RouteTable>,
    pub sessions: Arc<dyn SessionProvider>,
    pub onboarding: Arc<dyn OnboardingStore>,
    pub pipelines: Arc<dyn PipelineStore>,
    /// Unfinished wizards, plus finished ones whose completion is not yet
    /// persisted.
    pub wizards: WizardMap,
}

impl AppState {
    #[must_use]
    pub fn new(
        config: GateConfig,
        sessions: Arc<dyn SessionProvider>,
        onboarding: Arc<dyn OnboardingStore>,
        pipelines: Arc<dyn PipelineStore>,
    ) -> Self {
        let routes = RouteTable::new(config.static_prefixes.clone());
        Self {
            config: Arc::new(config),
            routes: Arc::new(routes),
            sessions,
            onboarding,
            pipelines,
            wizards: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
mod tests {
    use super::test_helpers::*;

    #[tokio::test]
    async fn new_state_has_no_wizards() {
        let app = test_app(FakeSessions::new(), FakeOnboardingStore::new(), FakePipelineStore::new());
        assert!(app.state.wizards.read().await.is_empty());
    }

    #[test]
    fn route_table_uses_configured_prefixes() {
        let app = test_app(FakeSessions::new(), FakeOnboardingStore::new(), FakePipelineStore::new());
        assert!(!app.state.routes.matches("/favicon.ico"));
        assert!(app.state.routes.matches("/dashboard"));
    }
}
