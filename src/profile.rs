//! User profile: an opaque attribute bag supplied by the host.
//!
//! The navigator never interprets profile fields itself. Branching rules read
//! attributes through dotted paths (`"preferences.keyboardOnly"`), and the step
//! validator only asks whether the profile is empty and whether a configuration
//! choice has been made.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Attribute key holding the user's chosen configuration preset.
pub const SELECTED_CONFIGURATION_KEY: &str = "selectedConfiguration";

/// Arbitrary user attributes (disabilities, preferences, experience level, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile {
    attributes: Map<String, Value>,
}

impl UserProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON value. Non-object values yield an empty profile.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(attributes) => Self { attributes },
            _ => Self::default(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Resolve a dotted path such as `"preferences.keyboardOnly"`.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.attributes.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Whether the value at `path` is JSON-truthy.
    pub fn is_truthy(&self, path: &str) -> bool {
        self.get_path(path).is_some_and(is_truthy)
    }

    /// The configuration choice declared by the user, if any.
    pub fn selected_configuration(&self) -> Option<&Value> {
        self.get_path(SELECTED_CONFIGURATION_KEY)
            .filter(|v| is_truthy(v))
    }
}

/// JavaScript-style truthiness for JSON values.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
