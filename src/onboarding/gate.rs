//! Render gate for the onboarding area.
//!
//! Every render of the wizard goes through [`evaluate`], which turns the
//! current auth status and onboarding flag into either a navigation or the
//! view to show. No redirect is decided while auth is still loading.

use serde::Serialize;

use super::OnboardingStep;
use crate::guard::routes::{DASHBOARD_PATH, LOGIN_PATH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthStatus {
    Loading,
    Authenticated,
    Unauthenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Auth not resolved yet; show a placeholder.
    Loading,
    NavigateTo(&'static str),
    Render(OnboardingStep),
}

/// Decide what the onboarding area shows.
#[must_use]
pub fn evaluate(status: AuthStatus, is_onboarding: bool, step: OnboardingStep) -> GateDecision {
    match status {
        AuthStatus::Loading => GateDecision::Loading,
        AuthStatus::Unauthenticated => GateDecision::NavigateTo(LOGIN_PATH),
        AuthStatus::Authenticated if !is_onboarding => GateDecision::NavigateTo(DASHBOARD_PATH),
        AuthStatus::Authenticated => GateDecision::Render(step),
    }
}

#[cfg(test)]
#[path = "gate_test.rs"]
mod tests;
