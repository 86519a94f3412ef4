mod support;

use std::sync::{Arc, Mutex};
use support::{arithmetic, signs, six_step_chain, six_step_scheme};
use tierflow::core::config::PipelineConfig;
use tierflow::core::pipeline::{
    ExecutionContext, FnPolicy, Location, LocationIndex, PipelineManager, Scheme, StepMetadata,
};
use tierflow::core::types::{ErrorCategory, ManagerState};

fn built_chain() -> PipelineManager {
    let mut manager = PipelineManager::new().with_scheme(&six_step_scheme());
    manager.build(&[arithmetic()]).unwrap();
    manager
}

#[test]
fn test_six_step_chain_returns_input() {
    let manager = built_chain();
    manager.execute_on_data(2i16).unwrap();

    assert_eq!(manager.results::<i16>(), vec![2]);
    assert_eq!(manager.output_len(), 1);
    assert_eq!(manager.state(), ManagerState::Completed);
}

#[test]
fn test_intermediate_values_follow_the_chain() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let policy = FnPolicy::new(move |ctx: &ExecutionContext, index: &LocationIndex| {
        let value = ctx
            .piece_as::<i16>()
            .map(|v| i32::from(*v))
            .or_else(|| ctx.piece_as::<i32>().copied());
        if let Some(value) = value {
            recorder.lock().unwrap().push(value);
        }
        let next = ctx.location().next_tier();
        if index.contains(next) {
            next
        } else {
            Location::INVALID
        }
    });

    let mut manager = PipelineManager::new()
        .with_scheme(&six_step_scheme())
        .with_policy(policy);
    manager.build(&[arithmetic()]).unwrap();
    manager.execute_on_data(2i16).unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![4, 2, 5, 25, 5, 2]);
}

#[test]
fn test_collection_maps_each_item_back_to_itself() {
    let manager = built_chain();
    let report = manager
        .execute_on_collection([2i16, 3, 4, 5, 10])
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.completed, 5);
    assert_eq!(report.total(), 5);
    assert_eq!(manager.results::<i16>(), vec![2, 3, 4, 5, 10]);
}

#[test]
fn test_outputs_accumulate_until_cleared() {
    let manager = built_chain();
    manager.execute_on_data(3i16).unwrap();
    manager.execute_on_data(4i16).unwrap();
    assert_eq!(manager.results::<i16>(), vec![3, 4]);
    // Results of another type are filtered out.
    assert!(manager.results::<i32>().is_empty());

    manager.clear_results();
    assert_eq!(manager.output_len(), 0);
}

#[test]
fn test_execute_before_build_is_rejected() {
    let manager = PipelineManager::new().with_scheme(&six_step_scheme());
    let err = manager.execute_on_data(2i16).unwrap_err();
    assert_eq!(err.category, ErrorCategory::ExecutionStateError);
    assert_eq!(err.code, "TF-EXEC-001");

    let err = manager.execute_on_collection([1i16]).unwrap_err();
    assert_eq!(err.code, "TF-EXEC-001");
}

#[test]
fn test_wrong_input_type_is_type_mismatch() {
    let manager = built_chain();
    let err = manager.execute_on_data(String::from("two")).unwrap_err();
    assert_eq!(err.category, ErrorCategory::TypeMismatch);
    assert_eq!(err.code, "TF-EXEC-003");
    assert_eq!(err.context.get("location").map(String::as_str), Some("(0,0)"));
    assert_eq!(manager.output_len(), 0);
    assert_eq!(manager.state(), ManagerState::Failed);

    // The pipeline stays built; the next good item completes.
    manager.execute_on_data(2i16).unwrap();
    assert_eq!(manager.state(), ManagerState::Completed);
}

#[test]
fn test_missing_entry_step_is_reported() {
    let scheme = Scheme::from_steps(six_step_chain().into_iter().skip(1));
    let mut manager = PipelineManager::new().with_scheme(&scheme);
    manager.build(&[arithmetic()]).unwrap();

    let err = manager.execute_on_data(4i32).unwrap_err();
    assert_eq!(err.code, "TF-EXEC-002");
}

#[test]
fn test_duplicate_locations_fail_at_first_execution() {
    let scheme = Scheme::from_steps([
        StepMetadata::typed::<i16, i16>("Arithmetic", "Add3", Location::ORIGIN),
        StepMetadata::typed::<i16, i16>("Arithmetic", "Subtract3", Location::ORIGIN),
    ]);
    let mut manager = PipelineManager::new().with_scheme(&scheme);
    manager.build(&[arithmetic()]).unwrap();

    let err = manager.execute_on_data(1i16).unwrap_err();
    assert_eq!(err.category, ErrorCategory::ConfigurationError);
    assert_eq!(err.code, "TF-CONFIG-002");
}

fn routing_manager(config: PipelineConfig) -> PipelineManager {
    // Negative values are sent to a location without a step.
    let policy = FnPolicy::new(|ctx: &ExecutionContext, index: &LocationIndex| {
        match ctx.piece_as::<i16>() {
            Some(v) if *v < 0 => Location::new(0, 9),
            _ => {
                let next = ctx.location().next_tier();
                if index.contains(next) {
                    next
                } else {
                    Location::INVALID
                }
            }
        }
    });
    let scheme = Scheme::from_steps([StepMetadata::typed::<i16, i16>(
        "Arithmetic",
        "Add3",
        Location::ORIGIN,
    )]);
    let mut manager = PipelineManager::new()
        .with_scheme(&scheme)
        .with_policy(policy)
        .with_config(config);
    manager.build(&[arithmetic()]).unwrap();
    manager
}

#[test]
fn test_failing_item_does_not_stop_the_collection() {
    let manager = routing_manager(PipelineConfig::default());
    let report = manager.execute_on_collection([1i16, -10, 2]).unwrap();

    assert!(!report.is_success());
    assert_eq!(report.completed, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 1);
    assert_eq!(report.failures[0].error.code, "TF-EXEC-002");
    assert_eq!(report.skipped, 0);
    assert_eq!(manager.results::<i16>(), vec![4, 5]);
    assert_eq!(manager.state(), ManagerState::Failed);

    manager.execute_on_collection([7i16]).unwrap();
    assert_eq!(manager.state(), ManagerState::Completed);
}

#[test]
fn test_stop_on_first_failure_counts_skipped_items() {
    let mut config = PipelineConfig::default();
    config.execution.continue_on_error = false;
    let manager = routing_manager(config);
    let report = manager.execute_on_collection([1i16, -10, 2, 3]).unwrap();

    assert_eq!(report.completed, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.total(), 4);
}

#[test]
fn test_step_cap_stops_cycles() {
    let mut config = PipelineConfig::default();
    config.execution.max_steps_per_item = 5;
    let scheme = Scheme::from_steps([StepMetadata::typed::<i16, i16>(
        "Arithmetic",
        "Add3",
        Location::ORIGIN,
    )]);
    let mut manager = PipelineManager::new()
        .with_scheme(&scheme)
        .with_policy(FnPolicy::new(|_: &ExecutionContext, _: &LocationIndex| {
            Location::ORIGIN
        }))
        .with_config(config);
    manager.build(&[arithmetic()]).unwrap();

    let err = manager.execute_on_data(0i16).unwrap_err();
    assert_eq!(err.code, "TF-EXEC-004");
}

#[test]
fn test_custom_policy_branches_by_value() {
    let scheme = Scheme::from_steps([
        StepMetadata::typed::<i16, i16>("Arithmetic", "Add3", Location::new(0, 0)),
        StepMetadata::typed::<i16, i16>("Signs", "Double", Location::new(1, 0)),
        StepMetadata::typed::<i16, i16>("Signs", "Negate", Location::new(2, 0)),
    ]);
    let policy = FnPolicy::new(|ctx: &ExecutionContext, _: &LocationIndex| {
        if ctx.location() != Location::ORIGIN {
            return Location::INVALID;
        }
        match ctx.piece_as::<i16>() {
            Some(v) if v % 2 == 0 => Location::new(1, 0),
            _ => Location::new(2, 0),
        }
    });
    let mut manager = PipelineManager::new()
        .with_scheme(&scheme)
        .with_policy(policy);
    let results = manager.build(&[arithmetic(), signs()]).unwrap();
    assert!(results.iter().all(|result| result.is_completed()));

    manager.execute_on_collection([1i16, 2]).unwrap();
    // 1 + 3 = 4 is doubled, 2 + 3 = 5 is negated.
    assert_eq!(manager.results::<i16>(), vec![8, -5]);
}

#[test]
fn test_rebuild_clears_stale_index() {
    let mut manager = built_chain();
    manager.execute_on_data(2i16).unwrap();

    let shorter = Scheme::from_steps(six_step_chain().into_iter().take(3));
    manager.rebuild(Some(&shorter), &[arithmetic()]).unwrap();
    manager.execute_on_data(2i16).unwrap();

    // Finalizing the new generation drops the previous outputs.
    assert_eq!(manager.results::<i16>(), vec![5]);
}
