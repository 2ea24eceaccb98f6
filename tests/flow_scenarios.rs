//! End-to-end navigation scenarios over the public API.

use std::sync::Arc;

use serde_json::json;

use onboarding_flow::planner::AdaptivePathPlanner;
use onboarding_flow::{
    BranchingRuleRegistry, Error, ErrorKind, FlowConfig, FlowDefinition, FlowNavigator,
    FlowSession, MemoryProgressStore, NavigationError, NextOutcome, Step, StepType, UserProfile,
};

const FLOW_JSON: &str = r#"{
    "steps": [
        {"id": "welcome", "type": "intro", "required": true, "estimated_time_seconds": 30},
        {"id": "assessment", "type": "questionnaire", "required": true, "estimated_time_seconds": 120},
        {
            "id": "keyboard-tutorial",
            "type": "tutorial",
            "required": false,
            "estimated_time_seconds": 180,
            "prerequisites": ["assessment"],
            "adaptive_conditions": ["needsKeyboard"]
        },
        {"id": "summary", "type": "summary", "required": true, "estimated_time_seconds": 20}
    ]
}"#;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn definition() -> Arc<FlowDefinition> {
    Arc::new(FlowDefinition::from_json(FLOW_JSON).unwrap())
}

fn registry() -> Arc<BranchingRuleRegistry> {
    Arc::new(BranchingRuleRegistry::with_default_rules())
}

fn navigator() -> FlowNavigator {
    init_tracing();
    FlowNavigator::new(definition(), registry(), FlowConfig::default())
}

fn keyboard_user() -> UserProfile {
    UserProfile::from_value(json!({"preferences": {"keyboardOnly": true}}))
}

fn navigation_error(err: Error) -> NavigationError {
    match err {
        Error::Navigation(e) => e,
        other => panic!("Expected a navigation error, got {other:?}"),
    }
}

#[test]
fn keyboard_profile_includes_keyboard_tutorial() {
    let mut nav = navigator();
    nav.initialize(Some(keyboard_user())).unwrap();
    assert_eq!(nav.state().unwrap().adaptive_path, vec![0, 1, 2, 3]);
}

#[test]
fn empty_profile_excludes_conditional_step() {
    let mut nav = navigator();
    nav.initialize(Some(UserProfile::new())).unwrap();
    assert_eq!(nav.state().unwrap().adaptive_path, vec![0, 1, 3]);

    let analytics = nav.get_flow_analytics().unwrap();
    assert_eq!(analytics.excluded_steps, vec!["keyboard-tutorial"]);
}

#[tokio::test]
async fn no_profile_walks_every_step() {
    let mut nav = navigator();
    nav.initialize(None).unwrap();
    assert!(nav.state().unwrap().adaptive_path.is_empty());
    assert_eq!(nav.get_flow_progress().unwrap().active_steps, 4);
    for step in nav.definition().steps().to_vec() {
        assert!(!nav.should_skip_step(&step));
    }

    let outcome = nav.navigate_next().await.unwrap();
    assert!(matches!(outcome, NextOutcome::Advanced(ref e) if e.to == 1));

    // The questionnaire has no answers to accept without a profile.
    let err = nav.navigate_next().await.unwrap_err();
    assert_eq!(err.navigation_kind(), Some(ErrorKind::StepIncomplete));

    // Past the questionnaire the forward scan still visits the keyboard tutorial.
    let mut nav = navigator();
    nav.initialize_at(None, 2).unwrap();
    assert_eq!(nav.current_step().unwrap().id, "keyboard-tutorial");
    let outcome = nav.navigate_next().await.unwrap();
    assert!(matches!(outcome, NextOutcome::Advanced(ref e) if e.to == 3));
    assert!(nav.navigate_next().await.unwrap().is_completed());
}

#[tokio::test]
async fn jump_past_incomplete_required_step_is_rejected() {
    let mut nav = navigator();
    nav.initialize(Some(keyboard_user())).unwrap();
    nav.navigate_next().await.unwrap();

    match navigation_error(nav.jump_to_step(3).unwrap_err()) {
        NavigationError::PrerequisitesNotMet {
            target,
            missing_prerequisites,
            incomplete_required,
        } => {
            assert_eq!(target, "summary");
            assert!(missing_prerequisites.is_empty());
            assert_eq!(incomplete_required, vec!["assessment"]);
        }
        other => panic!("Expected PrerequisitesNotMet, got {other:?}"),
    }

    match navigation_error(nav.jump_to_step(2).unwrap_err()) {
        NavigationError::PrerequisitesNotMet {
            missing_prerequisites,
            ..
        } => assert_eq!(missing_prerequisites, vec!["assessment"]),
        other => panic!("Expected PrerequisitesNotMet, got {other:?}"),
    }
    assert_eq!(nav.state().unwrap().current_step_index, 1);
}

#[tokio::test]
async fn completion_is_idempotent() {
    let mut nav = navigator();
    nav.initialize(Some(keyboard_user())).unwrap();
    for _ in 0..3 {
        assert!(!nav.navigate_next().await.unwrap().is_completed());
    }

    let first = nav.navigate_next().await.unwrap();
    let history_len = nav.history().unwrap().len();
    let state = nav.state().unwrap().clone();

    let second = nav.navigate_next().await.unwrap();
    assert!(first.is_completed());
    assert_eq!(first, second);
    assert_eq!(nav.history().unwrap().len(), history_len);
    assert_eq!(nav.state().unwrap(), &state);
    assert_eq!(nav.get_flow_progress().unwrap().percent_complete, 100);
}

#[tokio::test]
async fn forward_navigation_only_grows_completed_set() {
    let mut nav = navigator();
    nav.initialize(Some(keyboard_user())).unwrap();
    let mut previous = nav.state().unwrap().completed_steps.clone();
    loop {
        let outcome = nav.navigate_next().await.unwrap();
        let completed = nav.state().unwrap().completed_steps.clone();
        assert!(previous.is_subset(&completed));
        previous = completed;
        if outcome.is_completed() {
            break;
        }
    }
    assert_eq!(previous.len(), 4);
}

#[tokio::test]
async fn back_navigation_undoes_completion() {
    let mut nav = navigator();
    nav.initialize(Some(keyboard_user())).unwrap();
    nav.navigate_next().await.unwrap();
    nav.navigate_next().await.unwrap();
    assert!(nav.state().unwrap().is_completed(1));

    let entry = nav.navigate_previous().unwrap();
    assert_eq!((entry.from, entry.to), (2, 1));
    let state = nav.state().unwrap();
    assert!(!state.is_completed(1));
    assert!(!state.is_completed(2));
    assert!(state.is_completed(0));
}

#[test]
fn planner_is_deterministic() {
    let definition = definition();
    let registry = registry();
    let planner = AdaptivePathPlanner::new(&registry);
    for profile in [None, Some(UserProfile::new()), Some(keyboard_user())] {
        let first = planner.plan(&definition, profile.as_ref());
        let second = planner.plan(&definition, profile.as_ref());
        assert_eq!(first, second);
        assert!(first.windows(2).all(|w| w[0] < w[1]));
        assert!(definition.required_indices().all(|i| first.contains(&i)));
    }
}

#[tokio::test]
async fn required_steps_are_never_skipped() {
    let mut nav = navigator();
    nav.initialize(Some(keyboard_user())).unwrap();
    loop {
        let required = nav.current_step().unwrap().required;
        let outcome = if required {
            let err = nav.skip_current_step().await.unwrap_err();
            assert_eq!(err.navigation_kind(), Some(ErrorKind::RequiredStepCannotSkip));
            nav.navigate_next().await.unwrap()
        } else {
            nav.skip_current_step().await.unwrap()
        };
        if outcome.is_completed() {
            break;
        }
    }

    let state = nav.state().unwrap();
    assert_eq!(state.skipped_steps.len(), 1);
    assert!(state.skipped_steps.contains(&2));
}

#[tokio::test]
async fn prerequisites_gate_direct_jumps() {
    let mut nav = navigator();
    nav.initialize(Some(keyboard_user())).unwrap();
    let err = nav.jump_to_step(2).unwrap_err();
    assert_eq!(err.navigation_kind(), Some(ErrorKind::PrerequisitesNotMet));

    nav.navigate_next().await.unwrap();
    nav.navigate_next().await.unwrap();
    nav.jump_to_step(0).unwrap();
    let entry = nav.jump_to_step(2).unwrap();
    assert_eq!((entry.from, entry.to), (0, 2));
}

#[tokio::test]
async fn session_resumes_from_store() {
    init_tracing();
    let store = Arc::new(MemoryProgressStore::new());
    let session = FlowSession::new(FlowNavigator::new(definition(), registry(), FlowConfig::default()))
        .with_store(store.clone(), "user-42");
    session.start(Some(keyboard_user())).await.unwrap();
    session.navigate_next().await.unwrap();
    session.save().await.unwrap();

    let resumed = FlowSession::new(FlowNavigator::new(definition(), registry(), FlowConfig::default()))
        .with_store(store, "user-42");
    assert!(resumed.resume_or_start(None).await.unwrap());
    let progress = resumed.progress().await.unwrap();
    assert_eq!(progress.current_step_id, "assessment");
    assert_eq!(progress.completed_count, 1);
}

#[test]
fn custom_steps_and_rules_compose() {
    let mut registry = BranchingRuleRegistry::new();
    registry.register("isManager", |p| p.is_truthy("role.manager"));
    let definition = FlowDefinition::new(vec![
        Step::required("welcome", StepType::Intro),
        Step::optional("team-setup", StepType::Configuration).with_condition("isManager"),
        Step::required("summary", StepType::Summary),
    ])
    .unwrap();

    let planner = AdaptivePathPlanner::new(&registry);
    let manager = UserProfile::from_value(json!({"role": {"manager": true}}));
    assert_eq!(planner.plan(&definition, Some(&manager)), vec![0, 1, 2]);
    assert_eq!(planner.plan(&definition, Some(&UserProfile::new())), vec![0, 2]);
}
