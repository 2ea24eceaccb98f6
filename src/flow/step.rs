//! Step descriptors: the nodes of a flow definition.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Kind of onboarding step; decides how completion is validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Intro,
    Questionnaire,
    Configuration,
    Tutorial,
    Practice,
    Summary,
}

impl std::fmt::Display for StepType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Intro => "intro",
            Self::Questionnaire => "questionnaire",
            Self::Configuration => "configuration",
            Self::Tutorial => "tutorial",
            Self::Practice => "practice",
            Self::Summary => "summary",
        };
        write!(f, "{s}")
    }
}

/// One unit of the guided sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Stable key, unique within a flow.
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(rename = "type")]
    pub step_type: StepType,
    pub required: bool,
    #[serde(default)]
    pub estimated_time_seconds: u32,
    /// Step ids that must be completed before this step may be jumped to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prerequisites: Vec<String>,
    /// Rule names; any one holding makes an optional step eligible.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub adaptive_conditions: BTreeSet<String>,
}

impl Step {
    /// A required step with no prerequisites or conditions.
    pub fn required(id: impl Into<String>, step_type: StepType) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            step_type,
            required: true,
            estimated_time_seconds: 0,
            prerequisites: Vec::new(),
            adaptive_conditions: BTreeSet::new(),
        }
    }

    /// An optional step with no prerequisites or conditions.
    pub fn optional(id: impl Into<String>, step_type: StepType) -> Self {
        Self {
            required: false,
            ..Self::required(id, step_type)
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_estimated_time(mut self, seconds: u32) -> Self {
        self.estimated_time_seconds = seconds;
        self
    }

    pub fn with_prerequisite(mut self, step_id: impl Into<String>) -> Self {
        self.prerequisites.push(step_id.into());
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.adaptive_conditions.insert(condition.into());
        self
    }

    /// Whether eligibility depends on the user profile.
    pub fn is_conditional(&self) -> bool {
        !self.adaptive_conditions.is_empty()
    }
}
