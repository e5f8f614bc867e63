//! Integration tests for geodetic frames and positions.

use std::f64::consts::{FRAC_PI_2, PI};

use rstest::rstest;
use serde_json::json;

use posegraph::application::{deserialize, serialize, ApplicationError};
use posegraph::domain::geo::{WGS84_EQUATORIAL_RADIUS, WGS84_POLAR_RADIUS};
use posegraph::domain::{geodetic_to_pose, names, DomainError, Ellipsoid, Graph, NodeId, Scalar};

const EPS: f64 = 1e-6;

fn bound_scene(radius: f64) -> (Graph, NodeId, NodeId) {
    let mut graph = Graph::new();
    let frame = graph.create(names::GEO_FRAME, "frame").unwrap();
    deserialize(
        &mut graph,
        frame,
        &json!({"equatorialRadius": radius, "polarRadius": radius}),
    )
    .unwrap();
    let position = graph.create(names::GEO_POSITION, "position").unwrap();
    graph.bind_frame(position, frame).unwrap();
    (graph, frame, position)
}

#[test]
fn given_sphere_at_origin_when_updated_then_on_x_axis() {
    // Arrange
    let (mut graph, _, position) = bound_scene(1000.0);

    // Act
    graph.update(position, 0.0, false).unwrap();

    // Assert
    let pose = graph.pose(position).unwrap();
    assert!((pose.relative_position[0] - 1000.0).abs() < EPS);
    assert!(pose.relative_position[1].abs() < EPS);
    assert!(pose.relative_position[2].abs() < EPS);
    assert!((pose.vertical[0] - 1.0).abs() < EPS);
    assert!((pose.rotation[1] - FRAC_PI_2).abs() < EPS);
}

#[test]
fn given_east_longitude_then_negative_z() {
    // Arrange
    let (mut graph, _, position) = bound_scene(1000.0);
    deserialize(&mut graph, position, &json!({"longitude": 90})).unwrap();

    // Act
    graph.update(position, 0.0, false).unwrap();

    // Assert
    let pose = graph.pose(position).unwrap();
    assert!(pose.relative_position[0].abs() < EPS);
    assert!((pose.relative_position[2] + 1000.0).abs() < EPS);
    assert!((pose.rotation[1] - PI).abs() < EPS);
}

#[rstest]
#[case(0.0)]
#[case(90.0)]
#[case(-45.0)]
fn given_north_pole_then_polar_radius_on_y(#[case] longitude: f64) {
    let pose = geodetic_to_pose(Ellipsoid::default(), longitude, 90.0, 0.0);

    assert!((pose.relative_position[1] - WGS84_POLAR_RADIUS).abs() < 1e-3);
    assert!((pose.vertical[1] - 1.0).abs() < EPS);
}

#[test]
fn given_unbound_position_then_wgs84_used() {
    let mut graph = Graph::new();
    let position = graph.create(names::GEO_POSITION, "position").unwrap();

    graph.update(position, 0.0, false).unwrap();

    let pose = graph.pose(position).unwrap();
    assert!((pose.relative_position[0] - WGS84_EQUATORIAL_RADIUS).abs() < 1e-3);
    assert_eq!(graph.frame_of(position).unwrap(), None);
}

#[test]
fn given_updated_position_when_frame_radius_changes_then_recomputed() {
    // Arrange
    let (mut graph, frame, position) = bound_scene(1000.0);
    graph.update(frame, 0.0, false).unwrap();
    graph.update(position, 0.0, false).unwrap();

    // Act
    let radius = graph.child(frame, "equatorialRadius").unwrap();
    graph.set_value(radius, Some(Scalar::Number(2000.0))).unwrap();
    assert!(!graph.node(position).unwrap().is_updated());
    graph.update(position, 0.0, false).unwrap();

    // Assert
    let pose = graph.pose(position).unwrap();
    assert!((pose.relative_position[0] - 2000.0).abs() < EPS);
}

#[test]
fn given_rebinding_then_old_frame_no_longer_invalidates() {
    // Arrange
    let (mut graph, old_frame, position) = bound_scene(1000.0);
    let new_frame = graph.create(names::GEO_FRAME, "other").unwrap();
    graph.bind_frame(position, new_frame).unwrap();
    graph.update(position, 0.0, false).unwrap();

    // Act
    let radius = graph.child(old_frame, "polarRadius").unwrap();
    graph.set_value(radius, Some(Scalar::Number(10.0))).unwrap();

    // Assert
    assert!(graph.node(position).unwrap().is_updated());
    assert_eq!(graph.frame_of(position).unwrap(), Some(new_frame));
}

#[rstest]
#[case(json!({"equatorialRadius": 0}))]
#[case(json!({"polarRadius": 0}))]
#[case(json!({"equatorialRadius": -6378137}))]
fn given_non_positive_radius_when_applied_then_rejected_and_radius_kept(
    #[case] payload: serde_json::Value,
) {
    // Arrange
    let (mut graph, frame, position) = bound_scene(1000.0);

    // Act
    let result = deserialize(&mut graph, frame, &payload);

    // Assert
    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::Validation { .. }))
    ));
    assert_eq!(graph.ellipsoid(frame).unwrap(), Ellipsoid::sphere(1000.0));
    graph.update(position, 0.0, false).unwrap();
    assert!((graph.pose(position).unwrap().relative_position[0] - 1000.0).abs() < EPS);
}

#[test]
fn given_latitude_out_of_range_then_rejected() {
    let (mut graph, _, position) = bound_scene(1000.0);
    let latitude = graph.child(position, "latitude").unwrap();

    let result = graph.set_value(latitude, Some(Scalar::Number(91.0)));

    assert!(matches!(result, Err(DomainError::Validation { .. })));
}

#[test]
fn given_wrong_node_type_when_binding_then_rejected() {
    let mut graph = Graph::new();
    let position = graph.create(names::GEO_POSITION, "position").unwrap();
    let vector = graph.create(names::VECTOR, "v").unwrap();

    let result = graph.bind_frame(position, vector);

    assert!(matches!(result, Err(DomainError::WrongNodeType { .. })));
}

#[test]
fn given_updated_position_when_serializing_then_outputs_included() {
    let (mut graph, _, position) = bound_scene(1000.0);
    graph.update(position, 0.0, false).unwrap();

    let value = serialize(&graph, position).unwrap();

    assert_eq!(value["relativePosition"], json!({"x": 1000, "y": 0, "z": 0}));
    assert_eq!(value["rotation"]["order"], json!("XYZ"));
    assert_eq!(value["longitude"], json!(0));
}
