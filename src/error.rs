//! Error types for the onboarding flow engine.

use serde::{Deserialize, Serialize};

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Navigation error: {0}")]
    Navigation(#[from] NavigationError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Flow definition error: {0}")]
    Definition(#[from] DefinitionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl Error {
    /// The navigation kind, if this is a result-based navigation failure.
    pub fn navigation_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Navigation(e) => Some(e.kind()),
            _ => None,
        }
    }
}

/// Recoverable navigation failures.
///
/// These are returned by the operation that detected them and never leave the
/// flow state partially mutated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("Step {step_id} is required and not yet complete")]
    StepIncomplete { step_id: String },

    #[error("Already at the first step")]
    AtFirstStep,

    #[error(
        "Cannot enter step {target}: missing prerequisites {missing_prerequisites:?}, incomplete required steps {incomplete_required:?}"
    )]
    PrerequisitesNotMet {
        target: String,
        missing_prerequisites: Vec<String>,
        incomplete_required: Vec<String>,
    },

    #[error("Step {step_id} is required and cannot be skipped")]
    RequiredStepCannotSkip { step_id: String },

    #[error("Step index {index} out of range (flow has {len} steps)")]
    InvalidStepIndex { index: usize, len: usize },

    #[error("Step skipping is disabled")]
    StepSkippingDisabled,

    #[error("Adaptive flow is disabled")]
    AdaptiveFlowDisabled,
}

/// Discriminant of a [`NavigationError`], suitable for analytics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    StepIncomplete,
    AtFirstStep,
    PrerequisitesNotMet,
    RequiredStepCannotSkip,
    InvalidStepIndex,
    StepSkippingDisabled,
    AdaptiveFlowDisabled,
}

impl NavigationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::StepIncomplete { .. } => ErrorKind::StepIncomplete,
            Self::AtFirstStep => ErrorKind::AtFirstStep,
            Self::PrerequisitesNotMet { .. } => ErrorKind::PrerequisitesNotMet,
            Self::RequiredStepCannotSkip { .. } => ErrorKind::RequiredStepCannotSkip,
            Self::InvalidStepIndex { .. } => ErrorKind::InvalidStepIndex,
            Self::StepSkippingDisabled => ErrorKind::StepSkippingDisabled,
            Self::AdaptiveFlowDisabled => ErrorKind::AdaptiveFlowDisabled,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::StepIncomplete => "step_incomplete",
            Self::AtFirstStep => "at_first_step",
            Self::PrerequisitesNotMet => "prerequisites_not_met",
            Self::RequiredStepCannotSkip => "required_step_cannot_skip",
            Self::InvalidStepIndex => "invalid_step_index",
            Self::StepSkippingDisabled => "step_skipping_disabled",
            Self::AdaptiveFlowDisabled => "adaptive_flow_disabled",
        };
        write!(f, "{s}")
    }
}

/// Programmer errors: misuse of the session lifecycle or a broken invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Flow session has not been initialized")]
    NotInitialized,

    #[error("Flow session has ended")]
    Ended,

    #[error("Internal invariant violated: {0}")]
    InvariantViolation(String),
}

/// Flow definition validation errors.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("Flow definition has no steps")]
    Empty,

    #[error("Duplicate step id: {0}")]
    DuplicateStepId(String),

    #[error("Step {step_id} lists unknown prerequisite {prerequisite}")]
    UnknownPrerequisite {
        step_id: String,
        prerequisite: String,
    },

    #[error("Step {0} lists itself as a prerequisite")]
    SelfPrerequisite(String),

    #[error("Failed to parse flow definition: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Progress store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(NavigationError::AtFirstStep.kind(), ErrorKind::AtFirstStep);
        let err = NavigationError::PrerequisitesNotMet {
            target: "summary".into(),
            missing_prerequisites: vec![],
            incomplete_required: vec!["assessment".into()],
        };
        assert_eq!(err.kind(), ErrorKind::PrerequisitesNotMet);
    }

    #[test]
    fn kind_display_matches_serde() {
        let kinds = [
            ErrorKind::StepIncomplete,
            ErrorKind::AtFirstStep,
            ErrorKind::PrerequisitesNotMet,
            ErrorKind::RequiredStepCannotSkip,
            ErrorKind::InvalidStepIndex,
            ErrorKind::StepSkippingDisabled,
            ErrorKind::AdaptiveFlowDisabled,
        ];
        for kind in kinds {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(format!("\"{kind}\""), json);
        }
    }

    #[test]
    fn top_level_exposes_navigation_kind() {
        let err: Error = NavigationError::StepSkippingDisabled.into();
        assert_eq!(err.navigation_kind(), Some(ErrorKind::StepSkippingDisabled));

        let err: Error = SessionError::NotInitialized.into();
        assert_eq!(err.navigation_kind(), None);
    }
}
