//! Onboarding Flow: adaptive, resumable step navigation for guided onboarding.

pub mod config;
pub mod error;
pub mod flow;
pub mod navigator;
pub mod planner;
pub mod profile;
pub mod rules;
pub mod session;
pub mod store;
pub mod validator;

pub use config::FlowConfig;
pub use error::{Error, ErrorKind, NavigationError, Result, SessionError};
pub use flow::{FlowDefinition, Step, StepType};
pub use navigator::{FlowNavigator, FlowSnapshot, NextOutcome};
pub use profile::UserProfile;
pub use rules::BranchingRuleRegistry;
pub use session::FlowSession;
pub use store::{MemoryProgressStore, ProgressStore};
