//! Declarative rule conditions over user-profile attributes.
//!
//! Conditions are plain data, so a rule set built from them can be loaded from
//! JSON, printed for debugging, and compared in tests.

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::profile::{UserProfile, is_truthy};

/// A boolean expression over dotted profile paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RuleCondition {
    /// Value at `path` is present and truthy.
    Truthy { path: String },
    /// Value at `path` equals `value`.
    Equals { path: String, value: Value },
    /// Array at `path` contains `value`, or string at `path` contains it as a substring.
    Contains { path: String, value: Value },
    /// String at `path` matches the regex `pattern`.
    Matches { path: String, pattern: String },
    Any { conditions: Vec<RuleCondition> },
    All { conditions: Vec<RuleCondition> },
    Not { condition: Box<RuleCondition> },
}

impl RuleCondition {
    pub fn truthy(path: impl Into<String>) -> Self {
        Self::Truthy { path: path.into() }
    }

    pub fn equals(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equals {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn contains(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Contains {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn matches(path: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::Matches {
            path: path.into(),
            pattern: pattern.into(),
        }
    }

    /// Every regex pattern used anywhere in this condition tree.
    pub fn patterns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_patterns(&mut out);
        out
    }

    fn collect_patterns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Matches { pattern, .. } => out.push(pattern),
            Self::Any { conditions } | Self::All { conditions } => {
                for c in conditions {
                    c.collect_patterns(out);
                }
            }
            Self::Not { condition } => condition.collect_patterns(out),
            Self::Truthy { .. } | Self::Equals { .. } | Self::Contains { .. } => {}
        }
    }

    /// Evaluate against a profile. `compiled` maps each pattern to its regex;
    /// a pattern missing from it never matches.
    pub fn evaluate(&self, profile: &UserProfile, compiled: &HashMap<String, Regex>) -> bool {
        match self {
            Self::Truthy { path } => profile.get_path(path).is_some_and(is_truthy),
            Self::Equals { path, value } => profile.get_path(path) == Some(value),
            Self::Contains { path, value } => match profile.get_path(path) {
                Some(Value::Array(items)) => items.contains(value),
                Some(Value::String(s)) => value.as_str().is_some_and(|needle| s.contains(needle)),
                _ => false,
            },
            Self::Matches { path, pattern } => {
                let Some(text) = profile.get_path(path).and_then(Value::as_str) else {
                    return false;
                };
                compiled.get(pattern).is_some_and(|re| re.is_match(text))
            }
            Self::Any { conditions } => conditions.iter().any(|c| c.evaluate(profile, compiled)),
            Self::All { conditions } => conditions.iter().all(|c| c.evaluate(profile, compiled)),
            Self::Not { condition } => !condition.evaluate(profile, compiled),
        }
    }
}
