//! Step-to-view mapping for the wizard shell.
//!
//! The gateway renders a minimal page per step; the front-end bundle
//! hydrates it and wires the `data-action` buttons to the onboarding API.

use serde::Serialize;

use super::OnboardingStep;

/// A button on a wizard page and the API endpoint it posts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ViewAction {
    pub label: &'static str,
    pub endpoint: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OnboardingView {
    pub step: OnboardingStep,
    pub title: &'static str,
    pub body: &'static str,
    pub actions: &'static [ViewAction],
}

const NEXT: ViewAction = ViewAction { label: "Continue", endpoint: "/api/onboarding/next" };
const SKIP: ViewAction = ViewAction { label: "Skip setup", endpoint: "/api/onboarding/skip" };
const CREATE: ViewAction = ViewAction { label: "Create pipeline", endpoint: "/api/onboarding/pipeline" };
const FINISH: ViewAction = ViewAction { label: "Go to dashboard", endpoint: "/api/onboarding/complete" };

/// The fixed view for each step.
#[must_use]
pub fn view_for(step: OnboardingStep) -> OnboardingView {
    match step {
        OnboardingStep::Welcome => OnboardingView {
            step,
            title: "Welcome",
            body: "Let's set up your first content pipeline. It only takes a minute.",
            actions: &[NEXT, SKIP],
        },
        OnboardingStep::Introduction => OnboardingView {
            step,
            title: "How pipelines work",
            body: "A pipeline watches the sources you pick, curates what matters and delivers a digest on your schedule.",
            actions: &[NEXT],
        },
        OnboardingStep::PipelineCreation => OnboardingView {
            step,
            title: "Create your first pipeline",
            body: "Name it, describe your focus, choose sources and tell us where to deliver.",
            actions: &[CREATE],
        },
        OnboardingStep::Success => OnboardingView {
            step,
            title: "You're all set",
            body: "Your pipeline is live. The first digest arrives at the next scheduled delivery.",
            actions: &[FINISH],
        },
    }
}

/// View for a step name from the client; unknown names get the welcome view.
#[must_use]
pub fn view_for_name(name: &str) -> OnboardingView {
    view_for(OnboardingStep::from_name_lossy(name))
}

/// Render the page shell for a view.
#[must_use]
pub fn render_page(view: &OnboardingView) -> String {
    let actions: String = view
        .actions
        .iter()
        .map(|a| format!(r#"<button type="button" data-action="{}">{}</button>"#, a.endpoint, a.label))
        .collect();
    format!(
        r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>{title} · Onboarding</title></head>
<body>
<main id="onboarding" data-step="{step}">
<h1>{title}</h1>
<p>{body}</p>
<div class="actions">{actions}</div>
</main>
</body>
</html>
"#,
        title = view.title,
        step = view.step,
        body = view.body,
    )
}

/// Placeholder shown while auth status is still resolving.
pub const LOADING_PAGE: &str = r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>Loading</title></head>
<body><main id="onboarding" data-step="loading" aria-busy="true"></main></body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_step_maps_to_its_own_view() {
        for step in OnboardingStep::ALL {
            assert_eq!(view_for(step).step, step);
        }
    }

    #[test]
    fn only_welcome_offers_skip() {
        for step in OnboardingStep::ALL {
            let has_skip = view_for(step).actions.contains(&SKIP);
            assert_eq!(has_skip, step == OnboardingStep::Welcome, "step {step}");
        }
    }

    #[test]
    fn unknown_view_name_is_welcome() {
        assert_eq!(view_for_name("introduction").step, OnboardingStep::Introduction);
        assert_eq!(view_for_name("bogus").step, OnboardingStep::Welcome);
    }

    #[test]
    fn rendered_page_carries_step_and_actions() {
        let html = render_page(&view_for(OnboardingStep::Success));
        assert!(html.contains(r#"data-step="success""#));
        assert!(html.contains(r#"data-action="/api/onboarding/complete""#));
        assert!(html.contains("<h1>You're all set</h1>"));
    }
}
