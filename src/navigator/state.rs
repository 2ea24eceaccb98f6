//! Per-session flow state and its serializable snapshot.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};

use crate::profile::UserProfile;

use super::history::NavigationHistoryEntry;

/// Mutable state of one onboarding session.
///
/// Owned by a single [`FlowNavigator`](super::FlowNavigator); replaced
/// wholesale on reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowState {
    pub session_id: String,
    pub current_step_index: usize,
    pub completed_steps: BTreeSet<usize>,
    pub skipped_steps: BTreeSet<usize>,
    /// Indices chosen by the planner; empty when no path was computed.
    pub adaptive_path: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_profile: Option<UserProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_start_time: Option<DateTime<Utc>>,
    /// Set when forward navigation first finds no further step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_completed_at: Option<DateTime<Utc>>,
}

impl FlowState {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            current_step_index: 0,
            completed_steps: BTreeSet::new(),
            skipped_steps: BTreeSet::new(),
            adaptive_path: Vec::new(),
            user_profile: None,
            session_start_time: None,
            flow_completed_at: None,
        }
    }

    pub fn is_completed(&self, index: usize) -> bool {
        self.completed_steps.contains(&index)
    }

    pub fn has_adaptive_path(&self) -> bool {
        !self.adaptive_path.is_empty()
    }

    pub fn is_flow_complete(&self) -> bool {
        self.flow_completed_at.is_some()
    }
}

/// Generate a session id: `flow_<unix millis>_<8 random alphanumerics>`.
pub fn generate_session_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("flow_{}_{}", Utc::now().timestamp_millis(), suffix.to_lowercase())
}

/// Everything a host needs to save and later restore a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowSnapshot {
    pub state: FlowState,
    #[serde(default)]
    pub history: Vec<NavigationHistoryEntry>,
}
