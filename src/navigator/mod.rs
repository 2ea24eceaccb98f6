//! Flow navigator: the stateful core of an onboarding session.
//!
//! A navigator owns one session's [`FlowState`] and [`NavigationHistory`] and
//! moves through the flow with next/previous/jump/skip. Every operation either
//! commits its whole transition or leaves the state untouched. Recoverable
//! failures come back as [`NavigationError`]; lifecycle misuse comes back as
//! [`SessionError`].
//!
//! Only `navigate_next` and `skip_current_step` are async: they may wait on
//! the external completion signal used by tutorial and practice steps.

pub mod history;
pub mod progress;
pub mod state;

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::config::FlowConfig;
use crate::error::{Error, NavigationError, Result, SessionError};
use crate::flow::{FlowDefinition, Step};
use crate::planner::AdaptivePathPlanner;
use crate::profile::UserProfile;
use crate::rules::BranchingRuleRegistry;
use crate::validator::{CompletionSignal, StepValidator};

pub use history::{NavigationHistory, NavigationHistoryEntry, NavigationReason};
pub use progress::{FlowAnalytics, FlowProgress};
pub use state::{FlowSnapshot, FlowState, generate_session_id};

/// Reported when forward navigation finds no further step.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FlowCompletion {
    pub session_id: String,
    pub final_step_index: usize,
    pub completed_steps: usize,
    pub completed_at: chrono::DateTime<Utc>,
}

/// Result of a successful forward move.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NextOutcome {
    Advanced(NavigationHistoryEntry),
    Completed(FlowCompletion),
}

impl NextOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

struct ActiveSession {
    state: FlowState,
    history: NavigationHistory,
}

enum Lifecycle {
    Uninitialized,
    Active(ActiveSession),
    Ended,
}

/// Drives one onboarding session through a flow definition.
pub struct FlowNavigator {
    definition: Arc<FlowDefinition>,
    registry: Arc<BranchingRuleRegistry>,
    validator: StepValidator,
    config: FlowConfig,
    lifecycle: Lifecycle,
}

impl FlowNavigator {
    pub fn new(
        definition: Arc<FlowDefinition>,
        registry: Arc<BranchingRuleRegistry>,
        config: FlowConfig,
    ) -> Self {
        Self {
            validator: StepValidator::new(Arc::clone(&registry)),
            definition,
            registry,
            config,
            lifecycle: Lifecycle::Uninitialized,
        }
    }

    /// Install the tutorial/practice completion signal.
    pub fn with_completion_signal(mut self, signal: Arc<dyn CompletionSignal>) -> Self {
        self.validator = self.validator.with_signal(signal);
        self
    }

    pub fn definition(&self) -> &FlowDefinition {
        &self.definition
    }

    pub fn registry(&self) -> &BranchingRuleRegistry {
        &self.registry
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Active(_))
    }

    fn active(lifecycle: &Lifecycle) -> std::result::Result<&ActiveSession, SessionError> {
        match lifecycle {
            Lifecycle::Active(session) => Ok(session),
            Lifecycle::Uninitialized => Err(SessionError::NotInitialized),
            Lifecycle::Ended => Err(SessionError::Ended),
        }
    }

    fn active_mut(
        lifecycle: &mut Lifecycle,
    ) -> std::result::Result<&mut ActiveSession, SessionError> {
        match lifecycle {
            Lifecycle::Active(session) => Ok(session),
            Lifecycle::Uninitialized => Err(SessionError::NotInitialized),
            Lifecycle::Ended => Err(SessionError::Ended),
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Start the session at step 0. No-op if already initialized.
    pub fn initialize(&mut self, profile: Option<UserProfile>) -> Result<()> {
        self.initialize_at(profile, 0)
    }

    /// Start (or resume) the session at `start_index`. No-op if already initialized.
    pub fn initialize_at(&mut self, profile: Option<UserProfile>, start_index: usize) -> Result<()> {
        match self.lifecycle {
            Lifecycle::Ended => return Err(SessionError::Ended.into()),
            Lifecycle::Active(_) => return Ok(()),
            Lifecycle::Uninitialized => {}
        }
        if start_index >= self.definition.len() {
            return Err(NavigationError::InvalidStepIndex {
                index: start_index,
                len: self.definition.len(),
            }
            .into());
        }

        let state = self.fresh_state(profile, start_index);
        info!(
            session_id = %state.session_id,
            start_index,
            adaptive_path = ?state.adaptive_path,
            "Onboarding flow initialized"
        );
        self.lifecycle = Lifecycle::Active(ActiveSession {
            state,
            history: NavigationHistory::new(self.config.max_history_entries),
        });
        Ok(())
    }

    fn fresh_state(&self, profile: Option<UserProfile>, start_index: usize) -> FlowState {
        let mut state = FlowState::new(generate_session_id());
        state.current_step_index = start_index;
        state.session_start_time = Some(Utc::now());
        state.adaptive_path = self.compute_path(profile.as_ref());
        state.user_profile = profile;
        state
    }

    fn compute_path(&self, profile: Option<&UserProfile>) -> Vec<usize> {
        match profile {
            Some(profile) if self.config.enable_adaptive_flow => {
                AdaptivePathPlanner::new(&self.registry).plan(&self.definition, Some(profile))
            }
            _ => Vec::new(),
        }
    }

    /// Back to step 0 with a fresh session id, keeping only the user profile.
    pub fn reset_flow(&mut self) -> Result<()> {
        let profile = Self::active(&self.lifecycle)?.state.user_profile.clone();
        let state = self.fresh_state(profile, 0);
        info!(session_id = %state.session_id, "Onboarding flow reset");
        self.lifecycle = Lifecycle::Active(ActiveSession {
            state,
            history: NavigationHistory::new(self.config.max_history_entries),
        });
        Ok(())
    }

    /// End the session. Any later operation fails with [`SessionError::Ended`].
    pub fn end_session(&mut self) {
        if let Lifecycle::Active(session) = &self.lifecycle {
            info!(session_id = %session.state.session_id, "Onboarding session ended");
        }
        self.lifecycle = Lifecycle::Ended;
    }

    // ── Profile ─────────────────────────────────────────────────────

    /// Attach or replace the user profile, recomputing the adaptive path when
    /// adaptive flow is enabled.
    pub fn update_user_profile(&mut self, profile: UserProfile) -> Result<()> {
        Self::active(&self.lifecycle)?;
        let path = self.compute_path(Some(&profile));
        let session = Self::active_mut(&mut self.lifecycle)?;
        session.state.user_profile = Some(profile);
        if self.config.enable_adaptive_flow {
            debug!(session_id = %session.state.session_id, adaptive_path = ?path, "Adaptive path updated");
            session.state.adaptive_path = path;
        }
        reopen_if_extended(&self.definition, &self.registry, &mut session.state);
        Ok(())
    }

    /// Recompute the adaptive path from the attached profile.
    pub fn recalculate_adaptive_path(&mut self) -> Result<Vec<usize>> {
        if !self.config.enable_adaptive_flow {
            return Err(NavigationError::AdaptiveFlowDisabled.into());
        }
        let path = self.compute_path(Self::active(&self.lifecycle)?.state.user_profile.as_ref());
        let session = Self::active_mut(&mut self.lifecycle)?;
        session.state.adaptive_path = path.clone();
        reopen_if_extended(&self.definition, &self.registry, &mut session.state);
        Ok(path)
    }

    /// Whether forward scanning passes over `step` for the active profile.
    ///
    /// True only for an optional step with conditions when a profile is
    /// attached and none of the conditions hold. Required steps are never
    /// passed over.
    pub fn should_skip_step(&self, step: &Step) -> bool {
        let profile = match &self.lifecycle {
            Lifecycle::Active(session) => session.state.user_profile.as_ref(),
            _ => None,
        };
        auto_skips(&self.registry, step, profile)
    }

    // ── Navigation ──────────────────────────────────────────────────

    /// Complete the current step and move to the next one.
    pub async fn navigate_next(&mut self) -> Result<NextOutcome> {
        let session = Self::active(&self.lifecycle)?;
        let current = session.state.current_step_index;
        let step = self
            .definition
            .get(current)
            .ok_or_else(|| SessionError::InvariantViolation(format!("current index {current} out of range")))?;

        if !self.validator.validate(step, &session.state).await && step.required {
            debug!(session_id = %session.state.session_id, step_id = %step.id, "Forward navigation blocked");
            return Err(NavigationError::StepIncomplete {
                step_id: step.id.clone(),
            }
            .into());
        }

        let next = next_index(&self.definition, &self.registry, &session.state);
        let session = Self::active_mut(&mut self.lifecycle)?;
        session.state.completed_steps.insert(current);

        let Some(next) = next else {
            let completed_at = *session.state.flow_completed_at.get_or_insert_with(Utc::now);
            let completion = FlowCompletion {
                session_id: session.state.session_id.clone(),
                final_step_index: current,
                completed_steps: session.state.completed_steps.len(),
                completed_at,
            };
            info!(
                session_id = %completion.session_id,
                completed_steps = completion.completed_steps,
                "Onboarding flow completed"
            );
            return Ok(NextOutcome::Completed(completion));
        };

        let entry = session.history.record(current, next, NavigationReason::Forward);
        session.state.current_step_index = next;
        debug!(session_id = %session.state.session_id, from = current, to = next, "Navigated forward");
        Ok(NextOutcome::Advanced(entry))
    }

    /// Return to the step the user came from, un-completing it for revision.
    pub fn navigate_previous(&mut self) -> Result<NavigationHistoryEntry> {
        let session = Self::active_mut(&mut self.lifecycle)?;
        let current = session.state.current_step_index;
        if current == 0 {
            return Err(NavigationError::AtFirstStep.into());
        }

        let previous = session
            .history
            .last_entry_into(current)
            .map(|e| e.from)
            .or_else(|| {
                session
                    .state
                    .adaptive_path
                    .iter()
                    .rev()
                    .find(|&&i| i < current)
                    .copied()
            })
            .unwrap_or(current - 1);

        session.state.completed_steps.remove(&current);
        session.state.completed_steps.remove(&previous);
        session.state.flow_completed_at = None;
        session.state.current_step_index = previous;
        let entry = session.history.record(current, previous, NavigationReason::Back);
        debug!(session_id = %session.state.session_id, from = current, to = previous, "Navigated back");
        Ok(entry)
    }

    /// Move directly to `target` if its prerequisites are met.
    ///
    /// Moving forward also requires every required step before `target` to be
    /// complete, unless `allow_jump_past_required` is set.
    pub fn jump_to_step(&mut self, target: usize) -> Result<NavigationHistoryEntry> {
        let definition = &self.definition;
        let session = Self::active_mut(&mut self.lifecycle)?;
        let Some(step) = definition.get(target) else {
            return Err(NavigationError::InvalidStepIndex {
                index: target,
                len: definition.len(),
            }
            .into());
        };

        let state = &session.state;
        let current = state.current_step_index;
        let missing_prerequisites: Vec<String> = step
            .prerequisites
            .iter()
            .filter(|id| definition.index_of(id).is_none_or(|i| !state.is_completed(i)))
            .cloned()
            .collect();
        let incomplete_required: Vec<String> =
            if self.config.allow_jump_past_required || target <= current {
                Vec::new()
            } else {
                definition
                    .required_indices()
                    .filter(|&i| i < target && !state.is_completed(i))
                    .filter_map(|i| definition.get(i).map(|s| s.id.clone()))
                    .collect()
            };

        if !missing_prerequisites.is_empty() || !incomplete_required.is_empty() {
            debug!(
                session_id = %state.session_id,
                target = %step.id,
                missing = ?missing_prerequisites,
                incomplete = ?incomplete_required,
                "Jump rejected"
            );
            return Err(NavigationError::PrerequisitesNotMet {
                target: step.id.clone(),
                missing_prerequisites,
                incomplete_required,
            }
            .into());
        }

        session.state.current_step_index = target;
        session.state.flow_completed_at = None;
        let entry = session.history.record(current, target, NavigationReason::Jump);
        debug!(session_id = %session.state.session_id, from = current, to = target, "Jumped");
        Ok(entry)
    }

    /// Skip the current optional step and move forward.
    pub async fn skip_current_step(&mut self) -> Result<NextOutcome> {
        if !self.config.enable_step_skipping {
            return Err(NavigationError::StepSkippingDisabled.into());
        }
        let session = Self::active_mut(&mut self.lifecycle)?;
        let current = session.state.current_step_index;
        let step = self
            .definition
            .get(current)
            .ok_or_else(|| SessionError::InvariantViolation(format!("current index {current} out of range")))?;
        if step.required {
            return Err(NavigationError::RequiredStepCannotSkip {
                step_id: step.id.clone(),
            }
            .into());
        }

        session.state.skipped_steps.insert(current);
        debug!(session_id = %session.state.session_id, step_id = %step.id, "Skipped step");
        self.navigate_next().await
    }

    // ── Read accessors ──────────────────────────────────────────────

    pub fn state(&self) -> std::result::Result<&FlowState, SessionError> {
        Ok(&Self::active(&self.lifecycle)?.state)
    }

    pub fn history(&self) -> std::result::Result<&NavigationHistory, SessionError> {
        Ok(&Self::active(&self.lifecycle)?.history)
    }

    pub fn current_step(&self) -> std::result::Result<&Step, SessionError> {
        let index = Self::active(&self.lifecycle)?.state.current_step_index;
        self.definition
            .get(index)
            .ok_or_else(|| SessionError::InvariantViolation(format!("current index {index} out of range")))
    }

    /// Steps the user is expected to walk: the adaptive path when computed,
    /// otherwise every step forward scanning would not pass over.
    fn active_indices(&self, state: &FlowState) -> Vec<usize> {
        if state.has_adaptive_path() {
            return state.adaptive_path.clone();
        }
        let profile = state.user_profile.as_ref();
        (0..self.definition.len())
            .filter(|&i| !auto_skips(&self.registry, &self.definition.steps()[i], profile))
            .collect()
    }

    pub fn get_flow_progress(&self) -> std::result::Result<FlowProgress, SessionError> {
        let state = self.state()?;
        let active = self.active_indices(state);
        Ok(FlowProgress::compute(&self.definition, state, &active))
    }

    pub fn get_flow_analytics(&self) -> std::result::Result<FlowAnalytics, SessionError> {
        let session = Self::active(&self.lifecycle)?;
        let active = self.active_indices(&session.state);
        let excluded: Vec<usize> = (0..self.definition.len())
            .filter(|i| !active.contains(i))
            .collect();
        Ok(FlowAnalytics::compute(
            &self.definition,
            &session.state,
            &session.history,
            &active,
            &excluded,
        ))
    }

    // ── Snapshots ───────────────────────────────────────────────────

    /// Copy of the state and history for a host to persist.
    pub fn snapshot(&self) -> std::result::Result<FlowSnapshot, SessionError> {
        let session = Self::active(&self.lifecycle)?;
        Ok(FlowSnapshot {
            state: session.state.clone(),
            history: session.history.entries().to_vec(),
        })
    }

    /// Replace the session with a previously saved snapshot.
    ///
    /// The snapshot is checked against this navigator's definition first; on
    /// failure nothing changes.
    pub fn restore(&mut self, snapshot: FlowSnapshot) -> Result<()> {
        if matches!(self.lifecycle, Lifecycle::Ended) {
            return Err(SessionError::Ended.into());
        }
        self.check_snapshot(&snapshot)?;

        info!(
            session_id = %snapshot.state.session_id,
            current_step_index = snapshot.state.current_step_index,
            "Onboarding flow restored"
        );
        self.lifecycle = Lifecycle::Active(ActiveSession {
            history: NavigationHistory::from_entries(snapshot.history, self.config.max_history_entries),
            state: snapshot.state,
        });
        Ok(())
    }

    fn check_snapshot(&self, snapshot: &FlowSnapshot) -> Result<()> {
        let len = self.definition.len();
        let state = &snapshot.state;
        let out_of_range = std::iter::once(state.current_step_index)
            .chain(state.completed_steps.iter().copied())
            .chain(state.skipped_steps.iter().copied())
            .chain(state.adaptive_path.iter().copied())
            .chain(snapshot.history.iter().flat_map(|e| [e.from, e.to]))
            .find(|&i| i >= len);
        if let Some(index) = out_of_range {
            return Err(NavigationError::InvalidStepIndex { index, len }.into());
        }

        if let Some(&i) = state
            .skipped_steps
            .iter()
            .find(|&&i| self.definition.steps()[i].required)
        {
            return Err(invariant(format!("required step {i} recorded as skipped")));
        }
        if state.has_adaptive_path() {
            if !state.adaptive_path.windows(2).all(|w| w[0] < w[1]) {
                return Err(invariant("adaptive path is not strictly increasing".into()));
            }
            if let Some(i) = self
                .definition
                .required_indices()
                .find(|i| !state.adaptive_path.contains(i))
            {
                return Err(invariant(format!("adaptive path is missing required step {i}")));
            }
        }
        Ok(())
    }
}

fn invariant(message: String) -> Error {
    SessionError::InvariantViolation(message).into()
}

/// Optional conditional step whose conditions all fail for an attached profile.
fn auto_skips(registry: &BranchingRuleRegistry, step: &Step, profile: Option<&UserProfile>) -> bool {
    if step.required {
        return false;
    }
    match profile {
        Some(profile) if step.is_conditional() => {
            !registry.evaluate_any(&step.adaptive_conditions, profile)
        }
        _ => false,
    }
}

/// Clear the completion mark when the flow now has a step after the current one.
fn reopen_if_extended(definition: &FlowDefinition, registry: &BranchingRuleRegistry, state: &mut FlowState) {
    if state.is_flow_complete() && next_index(definition, registry, state).is_some() {
        debug!(session_id = %state.session_id, "Flow reopened by profile change");
        state.flow_completed_at = None;
    }
}

/// Next index to visit from the current one, or `None` at the end of the flow.
fn next_index(
    definition: &FlowDefinition,
    registry: &BranchingRuleRegistry,
    state: &FlowState,
) -> Option<usize> {
    let current = state.current_step_index;
    if state.has_adaptive_path() {
        return state.adaptive_path.iter().copied().find(|&i| i > current);
    }
    let profile = state.user_profile.as_ref();
    (current + 1..definition.len()).find(|&i| !auto_skips(registry, &definition.steps()[i], profile))
}
