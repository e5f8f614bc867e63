//! Integration tests for the pose service over an in-memory filesystem.

use std::path::Path;
use std::sync::Arc;

use serde_json::json;

use posegraph::application::{ApplicationError, Outcome};
use posegraph::config::Settings;
use posegraph::infrastructure::di::ServiceContainer;
use posegraph::infrastructure::traits::MemoryFileSystem;
use posegraph::util::testing;

fn sphere_settings(radius: f64) -> Settings {
    let mut settings = Settings::default();
    settings.frame.equatorial_radius = radius;
    settings.frame.polar_radius = radius;
    settings
}

#[test]
fn given_payload_file_when_applied_then_position_evaluated() {
    // Arrange
    testing::init_test_setup();
    let fs = MemoryFileSystem::new().with_file(
        "/scene.json",
        "{\"position\": {\"longitude\": 90, \"altitude\": 10}}\n",
    );
    let container = ServiceContainer::with_deps(sphere_settings(1000.0), Arc::new(fs));
    let mut service = container.pose_service().unwrap();

    // Act
    let outcome = service.apply_file(Path::new("/scene.json")).unwrap();
    let report = service.evaluate().unwrap();

    // Assert
    assert_eq!(outcome, Outcome::Applied);
    assert!((report.pose.relative_position[2] + 1010.0).abs() < 1e-6);
    assert_eq!(report.recomputations, 1);
    assert_eq!(report.scene["position"]["longitude"], json!(90));
    assert_eq!(report.scene["frame"]["equatorialRadius"], json!(1000));
}

#[test]
fn given_missing_file_when_applied_then_operation_failed() {
    let container =
        ServiceContainer::with_deps(Settings::default(), Arc::new(MemoryFileSystem::default()));
    let mut service = container.pose_service().unwrap();

    let result = service.apply_file(Path::new("/missing.json"));

    match result {
        Err(ApplicationError::OperationFailed { context, .. }) => {
            assert!(context.contains("/missing.json"));
        }
        other => panic!("expected OperationFailed, got {other:?}"),
    }
}

#[test]
fn given_unparseable_text_when_applied_then_ignored_and_scene_unchanged() {
    // Arrange
    let container =
        ServiceContainer::with_deps(Settings::default(), Arc::new(MemoryFileSystem::default()));
    let mut service = container.pose_service().unwrap();
    let before = service.report().unwrap().scene;

    // Act
    let outcome = service.apply_text("{not json").unwrap();

    // Assert
    assert_eq!(outcome, Outcome::Ignored);
    assert_eq!(service.report().unwrap().scene, before);
}

#[test]
fn given_csv_record_when_applied_to_position_then_geodetic_inputs_set() {
    let container =
        ServiceContainer::with_deps(sphere_settings(500.0), Arc::new(MemoryFileSystem::default()));
    let mut service = container.pose_service().unwrap();

    service.apply_to_position(&json!("0, 90, 0")).unwrap();
    let report = service.evaluate().unwrap();

    assert!((report.pose.relative_position[1] - 500.0).abs() < 1e-6);
    assert!(report.pose.relative_position[0].abs() < 1e-6);
}

#[test]
fn given_set_geodetic_with_invalid_latitude_then_domain_error() {
    let container =
        ServiceContainer::with_deps(Settings::default(), Arc::new(MemoryFileSystem::default()));
    let mut service = container.pose_service().unwrap();

    let result = service.set_geodetic(0.0, 120.0, 0.0);

    assert!(matches!(result, Err(ApplicationError::Domain(_))));
}

#[test]
fn given_steady_scene_when_evaluating_repeatedly_then_no_extra_recomputation() {
    let container =
        ServiceContainer::with_deps(Settings::default(), Arc::new(MemoryFileSystem::default()));
    let mut service = container.pose_service().unwrap();

    service.evaluate().unwrap();
    service.evaluate().unwrap();
    service.set_geodetic(10.0, 20.0, 0.0).unwrap();
    let report = service.evaluate().unwrap();

    assert_eq!(report.recomputations, 2);
    assert!(service.graph().node(service.root()).unwrap().is_updated());
}
