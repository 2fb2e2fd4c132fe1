//! Onboarding wizard state machine.
//!
//! DESIGN
//! ======
//! A fixed, linear four-step wizard (`welcome → introduction →
//! pipeline-creation → success`) plus a terminal "finished" state. Steps
//! only move forward. `skip` and `complete` jump straight to terminal from
//! any step. Terminal is sticky: once finished, nothing moves the machine
//! again.
//!
//! The machine is a plain value with synchronous transitions. Persisting the
//! "finished" fact is the caller's job (see `routes::onboarding`).

pub mod gate;
pub mod views;

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// STEP
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnboardingStep {
    Welcome,
    Introduction,
    PipelineCreation,
    Success,
}

impl OnboardingStep {
    pub const ALL: [Self; 4] = [Self::Welcome, Self::Introduction, Self::PipelineCreation, Self::Success];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::Introduction => "introduction",
            Self::PipelineCreation => "pipeline-creation",
            Self::Success => "success",
        }
    }

    /// Parse a persisted or client-supplied step name.
    ///
    /// Unrecognized names fall back to `Welcome`, never an error.
    #[must_use]
    pub fn from_name_lossy(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|step| step.as_str() == name)
            .unwrap_or(Self::Welcome)
    }

    /// The following step, `None` at the last one.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Welcome => Some(Self::Introduction),
            Self::Introduction => Some(Self::PipelineCreation),
            Self::PipelineCreation => Some(Self::Success),
            Self::Success => None,
        }
    }
}

impl fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// MACHINE
// =============================================================================

/// How the wizard reached terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Finish {
    Completed,
    Skipped,
}

/// Result of a terminal transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The machine just became terminal; the caller should persist it.
    Finished(Finish),
    /// The machine was already terminal; nothing changed.
    AlreadyFinished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OnboardingMachine {
    current_step: OnboardingStep,
    finished: Option<Finish>,
}

impl Default for OnboardingMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl OnboardingMachine {
    #[must_use]
    pub fn new() -> Self {
        Self { current_step: OnboardingStep::Welcome, finished: None }
    }

    #[must_use]
    pub fn current_step(&self) -> OnboardingStep {
        self.current_step
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished.is_some()
    }

    #[must_use]
    pub fn finish(&self) -> Option<Finish> {
        self.finished
    }

    /// Advance one step. Clamps at `Success`; no-op once finished.
    pub fn next_step(&mut self) -> OnboardingStep {
        if self.finished.is_none() {
            if let Some(next) = self.current_step.next() {
                self.current_step = next;
            }
        }
        self.current_step
    }

    /// Jump to terminal without visiting the remaining steps.
    pub fn skip_onboarding(&mut self) -> Transition {
        self.finish_with(Finish::Skipped)
    }

    /// Jump to terminal after the user finished the wizard.
    pub fn complete_onboarding(&mut self) -> Transition {
        self.finish_with(Finish::Completed)
    }

    fn finish_with(&mut self, how: Finish) -> Transition {
        if self.finished.is_some() {
            return Transition::AlreadyFinished;
        }
        self.finished = Some(how);
        Transition::Finished(how)
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
