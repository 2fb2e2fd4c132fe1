//! External collaborators used by the guard, the wizard and the API routes.
//!
//! ARCHITECTURE
//! ============
//! Each service exposes a trait at the seam (session lookup, onboarding
//! status, pipeline storage) plus the production implementation. Route
//! handlers hold `Arc<dyn Trait>` through `AppState` and never talk to the
//! identity provider or Postgres directly.

pub mod onboarding;
pub mod pipeline;
pub mod session;
