//! Step completion validation.
//!
//! Completion is decided per step type. Tutorial and practice steps ask an
//! external [`CompletionSignal`]; this is the only await point in navigation.

use std::sync::Arc;

use async_trait::async_trait;

use crate::flow::{Step, StepType};
use crate::navigator::FlowState;
use crate::rules::BranchingRuleRegistry;

/// Completion reports from the tutorial/practice collaborator.
#[async_trait]
pub trait CompletionSignal: Send + Sync {
    /// Whether the user finished the step. `None` means the step is not
    /// instrumented, which counts as complete.
    async fn has_completed(&self, step_id: &str) -> Option<bool>;
}

/// Validates whether the current step may be left going forward.
#[derive(Clone)]
pub struct StepValidator {
    registry: Arc<BranchingRuleRegistry>,
    signal: Option<Arc<dyn CompletionSignal>>,
}

impl StepValidator {
    pub fn new(registry: Arc<BranchingRuleRegistry>) -> Self {
        Self {
            registry,
            signal: None,
        }
    }

    pub fn with_signal(mut self, signal: Arc<dyn CompletionSignal>) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Check whether `step` counts as complete in `state`.
    pub async fn validate(&self, step: &Step, state: &FlowState) -> bool {
        let profile = state.user_profile.as_ref();

        let (type_ok, reason) = match step.step_type {
            StepType::Intro | StepType::Summary => (true, "visited"),
            StepType::Questionnaire => match profile {
                Some(p) if !p.is_empty() => (true, "profile attached"),
                _ => (false, "no profile attached"),
            },
            StepType::Configuration => match profile.and_then(|p| p.selected_configuration()) {
                Some(_) => (true, "configuration selected"),
                None => (false, "no configuration selected"),
            },
            StepType::Tutorial | StepType::Practice => match &self.signal {
                // TODO: confirm with product whether a missing signal should block required tutorials
                None => (true, "no completion signal installed"),
                Some(signal) => match signal.has_completed(&step.id).await {
                    Some(true) => (true, "completion signal reported done"),
                    Some(false) => (false, "completion signal reported not done"),
                    None => (true, "step not instrumented"),
                },
            },
        };

        // A profiled user whose conditions no longer hold has not completed the step.
        let adaptive_ok = match profile {
            Some(p) if step.is_conditional() => {
                self.registry.evaluate_any(&step.adaptive_conditions, p)
            }
            _ => true,
        };

        let valid = type_ok && adaptive_ok;
        tracing::debug!(
            step_id = %step.id,
            step_type = %step.step_type,
            valid,
            reason,
            adaptive_ok,
            "Validated step"
        );
        valid
    }
}

impl std::fmt::Debug for StepValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepValidator")
            .field("rules", &self.registry.len())
            .field("has_signal", &self.signal.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::profile::{SELECTED_CONFIGURATION_KEY, UserProfile};
    use serde_json::json;

    struct MapSignal(HashMap<&'static str, bool>);

    #[async_trait]
    impl CompletionSignal for MapSignal {
        async fn has_completed(&self, step_id: &str) -> Option<bool> {
            self.0.get(step_id).copied()
        }
    }

    fn validator() -> StepValidator {
        StepValidator::new(Arc::new(BranchingRuleRegistry::with_default_rules()))
    }

    fn state_with(profile: Option<UserProfile>) -> FlowState {
        let mut state = FlowState::new("test-session");
        state.user_profile = profile;
        state
    }

    #[tokio::test]
    async fn intro_and_summary_always_valid() {
        let v = validator();
        let state = state_with(None);
        assert!(v.validate(&Step::required("w", StepType::Intro), &state).await);
        assert!(v.validate(&Step::required("s", StepType::Summary), &state).await);
    }

    #[tokio::test]
    async fn questionnaire_needs_non_empty_profile() {
        let v = validator();
        let step = Step::required("assessment", StepType::Questionnaire);
        assert!(!v.validate(&step, &state_with(None)).await);
        assert!(!v.validate(&step, &state_with(Some(UserProfile::new()))).await);
        let profile = UserProfile::new().with_attribute("experienceLevel", "beginner");
        assert!(v.validate(&step, &state_with(Some(profile))).await);
    }

    #[tokio::test]
    async fn configuration_needs_selection() {
        let v = validator();
        let step = Step::required("setup", StepType::Configuration);
        let profile = UserProfile::new().with_attribute("experienceLevel", "beginner");
        assert!(!v.validate(&step, &state_with(Some(profile.clone()))).await);
        let profile = profile.with_attribute(SELECTED_CONFIGURATION_KEY, "screen-reader-preset");
        assert!(v.validate(&step, &state_with(Some(profile))).await);
    }

    #[tokio::test]
    async fn tutorial_defaults_to_valid_without_signal() {
        let v = validator();
        let step = Step::required("basics", StepType::Tutorial);
        assert!(v.validate(&step, &state_with(None)).await);
    }

    #[tokio::test]
    async fn tutorial_follows_signal() {
        let signal = MapSignal(HashMap::from([("basics", false), ("drills", true)]));
        let v = validator().with_signal(Arc::new(signal));
        let state = state_with(None);
        assert!(!v.validate(&Step::required("basics", StepType::Tutorial), &state).await);
        assert!(v.validate(&Step::required("drills", StepType::Practice), &state).await);
        // Uninstrumented step
        assert!(v.validate(&Step::required("other", StepType::Practice), &state).await);
    }

    #[tokio::test]
    async fn adaptively_ineligible_step_is_not_complete() {
        let v = validator();
        let step = Step::optional("keyboard-tutorial", StepType::Tutorial).with_condition("needsKeyboard");

        let keyboard = UserProfile::from_value(json!({"preferences": {"keyboardOnly": true}}));
        assert!(v.validate(&step, &state_with(Some(keyboard))).await);

        let mouse = UserProfile::from_value(json!({"preferences": {"keyboardOnly": false}}));
        assert!(!v.validate(&step, &state_with(Some(mouse))).await);

        // Without a profile the step is never considered ineligible.
        assert!(v.validate(&step, &state_with(None)).await);
    }
}
