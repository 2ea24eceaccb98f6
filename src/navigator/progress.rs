//! Read-only progress and analytics views for hosts.
//!
//! The navigator emits no events; hosts poll these after each operation and
//! forward them to their own persistence or telemetry.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::flow::FlowDefinition;

use super::history::{NavigationHistory, NavigationReason};
use super::state::FlowState;

/// Where the user is in the flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowProgress {
    pub session_id: String,
    pub current_step_index: usize,
    pub current_step_id: String,
    pub total_steps: usize,
    /// Steps the user is expected to walk (adaptive path, or every reachable step).
    pub active_steps: usize,
    pub completed_count: usize,
    pub skipped_count: usize,
    pub percent_complete: u8,
    pub estimated_seconds_remaining: u64,
    pub is_complete: bool,
}

/// Session summary for analytics sinks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowAnalytics {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub session_duration_seconds: i64,
    pub profile_attached: bool,
    pub adaptive_path: Vec<String>,
    pub excluded_steps: Vec<String>,
    pub completed_steps: Vec<String>,
    pub skipped_steps: Vec<String>,
    pub forward_transitions: usize,
    pub back_transitions: usize,
    pub jumps: usize,
    pub total_estimated_seconds: u64,
    pub remaining_estimated_seconds: u64,
    pub percent_complete: u8,
    pub is_complete: bool,
}

fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done * 100 + total / 2) / total).min(100) as u8
}

/// Active steps neither completed nor skipped.
fn remaining(state: &FlowState, active: &[usize]) -> Vec<usize> {
    active
        .iter()
        .copied()
        .filter(|i| !state.completed_steps.contains(i) && !state.skipped_steps.contains(i))
        .collect()
}

impl FlowProgress {
    pub(crate) fn compute(definition: &FlowDefinition, state: &FlowState, active: &[usize]) -> Self {
        let completed_on_path = active
            .iter()
            .filter(|&&i| state.completed_steps.contains(&i))
            .count();
        let current_step_id = definition
            .get(state.current_step_index)
            .map(|s| s.id.clone())
            .unwrap_or_default();

        Self {
            session_id: state.session_id.clone(),
            current_step_index: state.current_step_index,
            current_step_id,
            total_steps: definition.len(),
            active_steps: active.len(),
            completed_count: state.completed_steps.len(),
            skipped_count: state.skipped_steps.len(),
            percent_complete: percent(completed_on_path, active.len()),
            estimated_seconds_remaining: definition
                .estimated_seconds(&remaining(state, active)),
            is_complete: state.is_flow_complete(),
        }
    }
}

impl FlowAnalytics {
    pub(crate) fn compute(
        definition: &FlowDefinition,
        state: &FlowState,
        history: &NavigationHistory,
        active: &[usize],
        excluded: &[usize],
    ) -> Self {
        let end = state.flow_completed_at.unwrap_or_else(Utc::now);
        let session_duration_seconds = state
            .session_start_time
            .map(|start| end.signed_duration_since(start).num_seconds().max(0))
            .unwrap_or(0);
        let completed_on_path = active
            .iter()
            .filter(|&&i| state.completed_steps.contains(&i))
            .count();

        Self {
            session_id: state.session_id.clone(),
            started_at: state.session_start_time,
            completed_at: state.flow_completed_at,
            session_duration_seconds,
            profile_attached: state.user_profile.is_some(),
            adaptive_path: definition.ids_of(&state.adaptive_path),
            excluded_steps: definition.ids_of(excluded),
            completed_steps: definition.ids_of(&state.completed_steps),
            skipped_steps: definition.ids_of(&state.skipped_steps),
            forward_transitions: history.count(NavigationReason::Forward),
            back_transitions: history.count(NavigationReason::Back),
            jumps: history.count(NavigationReason::Jump),
            total_estimated_seconds: definition.estimated_seconds(active),
            remaining_estimated_seconds: definition
                .estimated_seconds(&remaining(state, active)),
            percent_complete: percent(completed_on_path, active.len()),
            is_complete: state.is_flow_complete(),
        }
    }
}
