//! Adaptive path planner: selects which steps a given user will walk.
//!
//! Inclusion rules, applied per step:
//! - required steps are always included;
//! - optional steps with conditions are included iff any condition holds;
//! - optional steps without conditions are included only when no profile is
//!   known, so a session without personalization data sees every step.
//!
//! The result is sorted ascending and depends only on the definition, the
//! profile and the registry.

use serde::Serialize;

use crate::flow::{FlowDefinition, Step};
use crate::profile::UserProfile;
use crate::rules::BranchingRuleRegistry;

/// Planner output with the steps that were left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedPath {
    pub included: Vec<usize>,
    pub excluded: Vec<usize>,
}

/// Computes adaptive paths against a rule registry.
#[derive(Debug, Clone, Copy)]
pub struct AdaptivePathPlanner<'a> {
    registry: &'a BranchingRuleRegistry,
}

impl<'a> AdaptivePathPlanner<'a> {
    pub fn new(registry: &'a BranchingRuleRegistry) -> Self {
        Self { registry }
    }

    /// Whether a single step belongs on the path for `profile`.
    pub fn is_eligible(&self, step: &Step, profile: Option<&UserProfile>) -> bool {
        if step.required {
            return true;
        }
        match profile {
            None => true,
            Some(profile) if step.is_conditional() => self
                .registry
                .evaluate_any(&step.adaptive_conditions, profile),
            Some(_) => false,
        }
    }

    /// The ordered step indices to traverse.
    pub fn plan(&self, definition: &FlowDefinition, profile: Option<&UserProfile>) -> Vec<usize> {
        self.plan_with_exclusions(definition, profile).included
    }

    /// The ordered step indices to traverse, plus the ones left out.
    pub fn plan_with_exclusions(
        &self,
        definition: &FlowDefinition,
        profile: Option<&UserProfile>,
    ) -> PlannedPath {
        let (included, excluded): (Vec<usize>, Vec<usize>) = (0..definition.len())
            .partition(|&i| self.is_eligible(&definition.steps()[i], profile));

        tracing::debug!(
            included = ?included,
            excluded = ?excluded,
            has_profile = profile.is_some(),
            "Planned adaptive path"
        );

        PlannedPath { included, excluded }
    }
}
