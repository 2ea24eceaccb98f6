//! Branching rule registry: named predicates that gate optional steps.
//!
//! A rule is either a plain function pointer or a declarative
//! [`RuleCondition`]. Both are pure: evaluation never mutates the profile and
//! performs no I/O. Names that were never registered evaluate to `false`, so an
//! unknown condition can never open a step.

pub mod condition;

use std::collections::{BTreeMap, HashMap};

use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::profile::UserProfile;

pub use condition::RuleCondition;

/// A pure predicate over a user profile.
pub type RulePredicate = fn(&UserProfile) -> bool;

/// How a rule is evaluated.
#[derive(Debug, Clone)]
pub enum RuleKind {
    Predicate(RulePredicate),
    Condition(RuleCondition),
}

/// A registered rule.
#[derive(Debug, Clone)]
pub struct BranchingRule {
    pub name: String,
    pub description: String,
    pub kind: RuleKind,
}

/// Serializable summary of a registered rule, for debugging and diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleDescriptor {
    pub name: String,
    pub description: String,
    /// `None` for function-pointer rules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<RuleCondition>,
}

/// Registry of branching rules, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct BranchingRuleRegistry {
    rules: BTreeMap<String, BranchingRule>,
    /// Compiled regexes for every `Matches` pattern in registered conditions.
    patterns: HashMap<String, Regex>,
}

impl BranchingRuleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-loaded with the standard accessibility and
    /// experience-level rules.
    pub fn with_default_rules() -> Self {
        let mut registry = Self::new();
        registry.register_described(
            "needsKeyboard",
            "User navigates by keyboard only",
            needs_keyboard,
        );
        registry.register_described(
            "needsScreenReader",
            "User relies on a screen reader",
            needs_screen_reader,
        );
        registry.register_described(
            "needsHighContrast",
            "User asked for high-contrast visuals or declared low vision",
            needs_high_contrast,
        );
        registry.register_described(
            "prefersReducedMotion",
            "User prefers reduced motion",
            prefers_reduced_motion,
        );
        registry.register_described(
            "needsMotorSupport",
            "User declared a motor disability",
            needs_motor_support,
        );
        registry.register_described(
            "needsCognitiveSupport",
            "User declared a cognitive disability",
            needs_cognitive_support,
        );
        registry.register_described("isBeginner", "Experience level is beginner", is_beginner);
        registry.register_described(
            "isAdvanced",
            "Experience level is advanced or expert",
            is_advanced,
        );
        registry
    }

    /// Register (or replace) a predicate rule.
    pub fn register(&mut self, name: impl Into<String>, predicate: RulePredicate) {
        self.register_described(name, "", predicate);
    }

    /// Register (or replace) a predicate rule with a human-readable description.
    pub fn register_described(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        predicate: RulePredicate,
    ) {
        self.insert(BranchingRule {
            name: name.into(),
            description: description.into(),
            kind: RuleKind::Predicate(predicate),
        });
    }

    /// Register (or replace) a declarative rule. Fails if any regex in the
    /// condition does not compile; the registry is unchanged in that case.
    pub fn register_condition(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        condition: RuleCondition,
    ) -> Result<(), regex::Error> {
        let name = name.into();
        let mut compiled = Vec::new();
        for pattern in condition.patterns() {
            if self.patterns.contains_key(pattern) {
                continue;
            }
            match Regex::new(pattern) {
                Ok(regex) => compiled.push((pattern.to_string(), regex)),
                Err(e) => {
                    warn!(rule = %name, pattern, "Rejected branching rule: {}", e);
                    return Err(e);
                }
            }
        }
        self.patterns.extend(compiled);
        self.insert(BranchingRule {
            name,
            description: description.into(),
            kind: RuleKind::Condition(condition),
        });
        Ok(())
    }

    fn insert(&mut self, rule: BranchingRule) {
        if self.rules.contains_key(&rule.name) {
            debug!(rule = %rule.name, "Replacing existing branching rule");
        }
        self.rules.insert(rule.name.clone(), rule);
    }

    /// Evaluate a rule by name. Unregistered names are `false`.
    pub fn evaluate(&self, name: &str, profile: &UserProfile) -> bool {
        let Some(rule) = self.rules.get(name) else {
            debug!(rule = %name, "Unknown branching rule evaluated as false");
            return false;
        };
        match &rule.kind {
            RuleKind::Predicate(predicate) => predicate(profile),
            RuleKind::Condition(condition) => condition.evaluate(profile, &self.patterns),
        }
    }

    /// True if at least one of the named rules holds.
    pub fn evaluate_any<'a>(
        &self,
        names: impl IntoIterator<Item = &'a String>,
        profile: &UserProfile,
    ) -> bool {
        names.into_iter().any(|name| self.evaluate(name, profile))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&BranchingRule> {
        self.rules.get(name)
    }

    /// Registered rule names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.rules.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Describe every registered rule, sorted by name.
    pub fn describe(&self) -> Vec<RuleDescriptor> {
        self.rules
            .values()
            .map(|rule| RuleDescriptor {
                name: rule.name.clone(),
                description: rule.description.clone(),
                condition: match &rule.kind {
                    RuleKind::Predicate(_) => None,
                    RuleKind::Condition(c) => Some(c.clone()),
                },
            })
            .collect()
    }
}

// ── Default rules ───────────────────────────────────────────────────

fn has_disability(profile: &UserProfile, name: &str) -> bool {
    profile
        .get_path("disabilities")
        .and_then(|v| v.as_array())
        .is_some_and(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str())
                .any(|d| d.eq_ignore_ascii_case(name))
        })
}

fn experience_level(profile: &UserProfile) -> Option<&str> {
    profile.get_path("experienceLevel").and_then(|v| v.as_str())
}

fn needs_keyboard(profile: &UserProfile) -> bool {
    profile.is_truthy("preferences.keyboardOnly") || profile.is_truthy("preferences.keyboardNavigation")
}

fn needs_screen_reader(profile: &UserProfile) -> bool {
    profile.is_truthy("preferences.screenReader")
        || has_disability(profile, "visual")
        || has_disability(profile, "blind")
}

fn needs_high_contrast(profile: &UserProfile) -> bool {
    profile.is_truthy("preferences.highContrast") || has_disability(profile, "low-vision")
}

fn prefers_reduced_motion(profile: &UserProfile) -> bool {
    profile.is_truthy("preferences.reducedMotion")
}

fn needs_motor_support(profile: &UserProfile) -> bool {
    has_disability(profile, "motor")
}

fn needs_cognitive_support(profile: &UserProfile) -> bool {
    has_disability(profile, "cognitive")
}

fn is_beginner(profile: &UserProfile) -> bool {
    experience_level(profile).is_some_and(|l| l.eq_ignore_ascii_case("beginner"))
}

fn is_advanced(profile: &UserProfile) -> bool {
    experience_level(profile)
        .is_some_and(|l| l.eq_ignore_ascii_case("advanced") || l.eq_ignore_ascii_case("expert"))
}
