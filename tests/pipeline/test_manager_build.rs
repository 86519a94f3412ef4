mod support;

use std::any::Any;
use std::sync::Arc;
use support::{
    arithmetic, blender, signs, six_step_chain, six_step_scheme, six_step_scheme_with_blender,
};
use tierflow::core::pipeline::{
    Capability, Location, PipelineManager, Provider, RegistrationTable, Scheme,
    StepBuildOutcome, StepMetadata,
};
use tierflow::core::types::{ErrorCategory, ManagerState};

fn outcomes(results: &[tierflow::core::pipeline::StepInsertionResult]) -> Vec<StepBuildOutcome> {
    results.iter().map(|result| result.outcome).collect()
}

#[test]
fn test_fully_satisfied_scheme_binds_every_step() {
    let mut manager = PipelineManager::new().with_scheme(&six_step_scheme());
    let results = manager.build(&[arithmetic()]).unwrap();

    assert_eq!(results.len(), 6);
    assert!(results.iter().all(|result| result.is_completed()));
    assert!(manager.is_ready());
    assert!(manager.missing_steps().is_empty());
    assert_eq!(manager.state(), ManagerState::Ready);
    assert_eq!(manager.bound_steps().count(), 6);
}

#[test]
fn test_missing_capability_yields_one_method_not_found() {
    let cube = StepMetadata::typed::<i16, i32>("Arithmetic", "Cube", Location::new(0, 6));
    let mut scheme = six_step_scheme();
    scheme.try_add(cube.clone());

    let mut manager = PipelineManager::new().with_scheme(&scheme);
    let results = manager.build(&[arithmetic()]).unwrap();

    let missing: Vec<_> = results
        .iter()
        .filter(|result| result.outcome == StepBuildOutcome::MethodNotFound)
        .collect();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].metadata.as_ref(), Some(&cube));
    assert_eq!(manager.missing_steps(), vec![cube]);
    assert!(!manager.is_ready());
}

#[test]
fn test_signature_mismatch_is_method_not_found() {
    // Add3 exists but takes i16, not i32.
    let scheme = Scheme::from_steps([StepMetadata::typed::<i32, i32>(
        "Arithmetic",
        "Add3",
        Location::ORIGIN,
    )]);
    let mut manager = PipelineManager::new().with_scheme(&scheme);
    let results = manager.build(&[arithmetic()]).unwrap();
    assert_eq!(outcomes(&results), vec![StepBuildOutcome::MethodNotFound]);
}

#[test]
fn test_unrequested_providers_are_not_required() {
    let mut manager = PipelineManager::new().with_scheme(&six_step_scheme());
    let results = manager
        .build(&[signs(), arithmetic(), arithmetic()])
        .unwrap();

    assert_eq!(results.len(), 8);
    assert_eq!(results[0].outcome, StepBuildOutcome::ObjectNotRequired);
    assert_eq!(results[0].provider_type, "Signs");
    assert!(results[0].metadata.is_none());
    // The second Arithmetic finds its bucket already claimed.
    assert_eq!(results[7].outcome, StepBuildOutcome::ObjectNotRequired);
    assert_eq!(
        results
            .iter()
            .filter(|result| result.is_completed())
            .count(),
        6
    );
}

#[test]
fn test_later_provider_claims_steps_left_unbound() {
    struct Late;

    impl Provider for Late {
        fn provider_type(&self) -> &str {
            "Arithmetic"
        }

        fn capabilities(self: Arc<Self>) -> Vec<Capability> {
            vec![Capability::unary("Cube", |v: i16| i32::from(v).pow(3))]
        }

        fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    let mut scheme = six_step_scheme();
    scheme.try_add(StepMetadata::typed::<i16, i32>(
        "Arithmetic",
        "Cube",
        Location::new(1, 0),
    ));
    let mut manager = PipelineManager::new().with_scheme(&scheme);
    let late: Arc<dyn Provider> = Arc::new(Late);
    let results = manager.build(&[arithmetic(), late]).unwrap();

    assert_eq!(results.len(), 8);
    assert_eq!(results[6].outcome, StepBuildOutcome::MethodNotFound);
    assert_eq!(results[7].outcome, StepBuildOutcome::Completed);
    assert!(manager.is_ready());
}

#[test]
fn test_build_without_scheme_is_configuration_error() {
    let mut manager = PipelineManager::new();
    let err = manager.build(&[arithmetic()]).unwrap_err();
    assert_eq!(err.category, ErrorCategory::ConfigurationError);
    assert_eq!(err.code, "TF-CONFIG-001");
    assert_eq!(manager.state(), ManagerState::Unbuilt);
}

#[test]
fn test_multi_parameter_capability_aborts_build() {
    let scheme = Scheme::from_steps([StepMetadata::typed::<i16, i16>(
        "Blender",
        "Mix",
        Location::ORIGIN,
    )]);
    let mut manager = PipelineManager::new().with_scheme(&scheme);
    let err = manager.build(&[blender()]).unwrap_err();
    assert_eq!(err.category, ErrorCategory::StructuralError);
    assert_eq!(err.code, "TF-BIND-001");
    assert_eq!(
        err.context.get("provider_type").map(String::as_str),
        Some("Blender")
    );
}

#[test]
fn test_aborted_build_cannot_be_executed() {
    let mut manager = PipelineManager::new().with_scheme(&six_step_scheme_with_blender());
    let err = manager.build(&[arithmetic(), blender()]).unwrap_err();
    assert_eq!(err.code, "TF-BIND-001");

    assert_eq!(manager.state(), ManagerState::Unbuilt);
    assert_eq!(manager.bound_steps().count(), 0);
    assert_eq!(manager.missing_steps().len(), 7);
    assert!(!manager.is_ready());

    let err = manager.execute_on_data(2i16).unwrap_err();
    assert_eq!(err.category, ErrorCategory::ExecutionStateError);
    assert_eq!(err.code, "TF-EXEC-001");
    assert_eq!(manager.output_len(), 0);

    // The scheme survives the failed attempt and builds without the bad provider.
    let results = manager.build(&[arithmetic()]).unwrap();
    assert_eq!(results.iter().filter(|result| result.is_completed()).count(), 6);
    manager.execute_on_data(2i16).unwrap();
    assert_eq!(manager.results::<i16>(), vec![2]);
}

#[test]
fn test_duplicate_provider_instances_report_missing_step_once() {
    let cube = StepMetadata::typed::<i16, i32>("Arithmetic", "Cube", Location::new(0, 6));
    let mut scheme = six_step_scheme();
    scheme.try_add(cube.clone());

    let mut manager = PipelineManager::new().with_scheme(&scheme);
    let results = manager.build(&[arithmetic(), arithmetic()]).unwrap();

    let missing: Vec<_> = results
        .iter()
        .filter(|result| result.outcome == StepBuildOutcome::MethodNotFound)
        .collect();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].metadata.as_ref(), Some(&cube));
    assert_eq!(results.len(), 8);
    assert_eq!(results[7].outcome, StepBuildOutcome::ObjectNotRequired);
    assert_eq!(manager.missing_steps(), vec![cube]);
}

#[test]
fn test_registration_table_binds_without_introspection() {
    struct Offset {
        by: i16,
    }

    impl Provider for Offset {
        fn provider_type(&self) -> &str {
            "Offset"
        }

        fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    let mut builder = RegistrationTable::builder();
    builder.register::<Offset, i16, i16, _>("Offset", "Shift", |offset, v| v + offset.by);
    let table = builder.build();
    assert_eq!(table.len(), 1);

    let scheme = Scheme::from_steps([StepMetadata::typed::<i16, i16>(
        "Offset",
        "Shift",
        Location::ORIGIN,
    )]);
    let mut manager = PipelineManager::new()
        .with_scheme(&scheme)
        .with_resolver(table);
    let offset: Arc<dyn Provider> = Arc::new(Offset { by: 40 });
    let results = manager.build(&[offset]).unwrap();
    assert_eq!(outcomes(&results), vec![StepBuildOutcome::Completed]);

    manager.execute_on_data(2i16).unwrap();
    assert_eq!(manager.results::<i16>(), vec![42]);
}

#[test]
fn test_insert_step_binds_matching_entry_only() {
    let mut manager = PipelineManager::new().with_scheme(&six_step_scheme());

    let skipped = manager.insert_step("Arithmetic", "Add4", |v: i16| v + 4);
    assert_eq!(skipped.outcome, StepBuildOutcome::ObjectNotRequired);

    let inserted = manager.insert_step("Arithmetic", "Add3", |v: i16| v + 3);
    assert_eq!(inserted.outcome, StepBuildOutcome::Completed);
    assert_eq!(
        inserted.metadata.map(|metadata| metadata.location()),
        Some(Location::new(0, 2))
    );
    assert_eq!(manager.missing_steps().len(), 5);
    assert_eq!(manager.bound_steps().count(), 1);
    assert!(!manager.is_ready());
}

#[test]
fn test_rebuild_is_idempotent() {
    let mut manager = PipelineManager::new().with_scheme(&six_step_scheme());
    let first = manager.build(&[arithmetic()]).unwrap();
    let first_bound: Vec<StepMetadata> = manager.bound_steps().cloned().collect();

    let second = manager.rebuild(None, &[arithmetic()]).unwrap();
    let second_bound: Vec<StepMetadata> = manager.bound_steps().cloned().collect();

    assert_eq!(outcomes(&first), outcomes(&second));
    assert_eq!(first_bound, second_bound);
    assert_eq!(first_bound, six_step_chain());
    assert_eq!(manager.cached_step_count(), 0);

    manager.execute_on_data(7i16).unwrap();
    assert_eq!(manager.results::<i16>(), vec![7]);
}

#[test]
fn test_rebuild_with_new_scheme_caches_dropped_steps() {
    let mut manager = PipelineManager::new().with_scheme(&six_step_scheme());
    manager.build(&[arithmetic()]).unwrap();

    let shorter = Scheme::from_steps(six_step_chain().into_iter().take(2));
    let results = manager.rebuild(Some(&shorter), &[arithmetic()]).unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|result| result.is_completed()));
    assert_eq!(manager.cached_step_count(), 4);

    manager.execute_on_data(9i16).unwrap();
    assert_eq!(manager.results::<i16>(), vec![9]);
}

#[test]
fn test_plain_build_does_not_cache() {
    let mut manager = PipelineManager::new().with_scheme(&six_step_scheme());
    manager.build(&[arithmetic()]).unwrap();
    manager.build(&[arithmetic()]).unwrap();
    assert_eq!(manager.cached_step_count(), 0);
    assert!(manager.is_ready());
}
