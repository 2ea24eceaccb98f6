//! Flow definitions: the step graph an onboarding session walks.

pub mod definition;
pub mod step;

pub use definition::FlowDefinition;
pub use step::{Step, StepType};
