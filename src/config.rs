//! Configuration types.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Feature flags and limits for a flow navigator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Compute an adaptive path from the user profile.
    pub enable_adaptive_flow: bool,
    /// Allow optional steps to be skipped explicitly.
    pub enable_step_skipping: bool,
    /// Allow `jump_to_step` to pass over incomplete required steps.
    pub allow_jump_past_required: bool,
    /// Navigation history cap (oldest entries are dropped first).
    pub max_history_entries: usize,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            enable_adaptive_flow: true,
            enable_step_skipping: true,
            allow_jump_past_required: false,
            max_history_entries: 500,
        }
    }
}

impl FlowConfig {
    /// Build a config from `ONBOARDING_*` environment variables.
    ///
    /// Unset variables keep their defaults; set but unparsable ones are errors.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            enable_adaptive_flow: env_bool("ONBOARDING_ADAPTIVE_FLOW")?
                .unwrap_or(defaults.enable_adaptive_flow),
            enable_step_skipping: env_bool("ONBOARDING_STEP_SKIPPING")?
                .unwrap_or(defaults.enable_step_skipping),
            allow_jump_past_required: env_bool("ONBOARDING_ALLOW_JUMP_PAST_REQUIRED")?
                .unwrap_or(defaults.allow_jump_past_required),
            max_history_entries: match std::env::var("ONBOARDING_MAX_HISTORY") {
                Ok(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                    key: "ONBOARDING_MAX_HISTORY".into(),
                    message: format!("{e}"),
                })?,
                Err(_) => defaults.max_history_entries,
            },
        })
    }
}

fn env_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => parse_bool(&raw)
            .map(Some)
            .ok_or_else(|| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected a boolean, got {raw:?}"),
            }),
        Err(_) => Ok(None),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = FlowConfig::default();
        assert!(config.enable_adaptive_flow);
        assert!(config.enable_step_skipping);
        assert!(!config.allow_jump_past_required);
        assert_eq!(config.max_history_entries, 500);
    }

    #[test]
    fn parse_bool_variants() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" yes "), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("no"), Some(false));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn serde_fills_missing_fields_with_defaults() {
        let config: FlowConfig =
            serde_json::from_str(r#"{"enable_step_skipping": false}"#).unwrap();
        assert!(!config.enable_step_skipping);
        assert!(config.enable_adaptive_flow);
        assert_eq!(config.max_history_entries, 500);
    }

    #[test]
    fn from_env_rejects_bad_boolean() {
        // SAFETY: This test runs in isolation; no other test reads ONBOARDING_STEP_SKIPPING.
        unsafe { std::env::set_var("ONBOARDING_STEP_SKIPPING", "sometimes") };
        let result = FlowConfig::from_env();
        unsafe { std::env::remove_var("ONBOARDING_STEP_SKIPPING") };
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }
}
