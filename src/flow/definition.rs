//! Flow definition: the immutable, validated step graph.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::DefinitionError;

use super::step::Step;

/// Ordered list of steps with an id → index lookup.
#[derive(Debug, Clone)]
pub struct FlowDefinition {
    steps: Vec<Step>,
    index_by_id: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct RawDefinition {
    steps: Vec<Step>,
}

impl FlowDefinition {
    /// Validate and build a definition.
    pub fn new(steps: Vec<Step>) -> Result<Self, DefinitionError> {
        if steps.is_empty() {
            return Err(DefinitionError::Empty);
        }

        let mut index_by_id = HashMap::with_capacity(steps.len());
        for (index, step) in steps.iter().enumerate() {
            if index_by_id.insert(step.id.clone(), index).is_some() {
                return Err(DefinitionError::DuplicateStepId(step.id.clone()));
            }
        }

        for step in &steps {
            for prerequisite in &step.prerequisites {
                if prerequisite == &step.id {
                    return Err(DefinitionError::SelfPrerequisite(step.id.clone()));
                }
                if !index_by_id.contains_key(prerequisite) {
                    return Err(DefinitionError::UnknownPrerequisite {
                        step_id: step.id.clone(),
                        prerequisite: prerequisite.clone(),
                    });
                }
            }
        }

        Ok(Self { steps, index_by_id })
    }

    /// Parse `{"steps": [...]}` JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self, DefinitionError> {
        let raw: RawDefinition = serde_json::from_str(json)?;
        Self::new(raw.steps)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false for a validated definition.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn index_of(&self, step_id: &str) -> Option<usize> {
        self.index_by_id.get(step_id).copied()
    }

    /// Indices of every required step, ascending.
    pub fn required_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.steps
            .iter()
            .enumerate()
            .filter(|(_, s)| s.required)
            .map(|(i, _)| i)
    }

    /// Sum of estimated times over the given indices.
    pub fn estimated_seconds<'a>(&self, indices: impl IntoIterator<Item = &'a usize>) -> u64 {
        indices
            .into_iter()
            .filter_map(|&i| self.steps.get(i))
            .map(|s| u64::from(s.estimated_time_seconds))
            .sum()
    }

    /// Map indices to step ids, ignoring out-of-range entries.
    pub fn ids_of<'a>(&self, indices: impl IntoIterator<Item = &'a usize>) -> Vec<String> {
        indices
            .into_iter()
            .filter_map(|&i| self.steps.get(i))
            .map(|s| s.id.clone())
            .collect()
    }
}
