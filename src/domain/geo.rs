//! Geodetic frame and position.
//!
//! A position converts longitude/latitude/altitude over the ellipsoid of
//! its bound frame into a frame-relative Cartesian point, a unit vertical
//! and an approximate local tangent-frame rotation.

use std::f64::consts::FRAC_PI_2;

use tracing::{debug, instrument, warn};

use crate::domain::composite::{Derivation, Field, Schema};
use crate::domain::error::DomainResult;
use crate::domain::graph::Graph;
use crate::domain::leaf::Scalar;
use crate::domain::node::NodeId;
use crate::domain::types::names;

/// WGS84 semi-major axis in meters.
pub const WGS84_EQUATORIAL_RADIUS: f64 = 6_378_137.0;
/// WGS84 semi-minor axis in meters.
pub const WGS84_POLAR_RADIUS: f64 = 6_356_752.314245;

/// Step along the unit meridian used to estimate the tangent slope.
const MERIDIAN_STEP: f64 = 1e-6;

const GEO_FRAME_FIELDS: &[Field] = &[
    Field::new("equatorialRadius", names::DISTANCE)
        .positive()
        .default_number(WGS84_EQUATORIAL_RADIUS),
    Field::new("polarRadius", names::DISTANCE)
        .positive()
        .default_number(WGS84_POLAR_RADIUS),
];

pub static GEO_FRAME_SCHEMA: Schema = Schema::plain(GEO_FRAME_FIELDS);

const GEO_POSITION_FIELDS: &[Field] = &[
    Field::new("longitude", names::ANGLE)
        .range(-180.0, 180.0)
        .default_number(0.0),
    Field::new("latitude", names::ANGLE)
        .range(-90.0, 90.0)
        .default_number(0.0),
    Field::new("altitude", names::DISTANCE).default_number(0.0),
    Field::new("relativePosition", names::VECTOR),
    Field::new("vertical", names::VECTOR),
    Field::new("rotation", names::EULER),
];

pub static GEO_POSITION_SCHEMA: Schema = Schema {
    fields: GEO_POSITION_FIELDS,
    derivation: Some(Derivation::GeoPosition),
};

/// Ellipsoid shape: equatorial and polar radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    pub equatorial: f64,
    pub polar: f64,
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self {
            equatorial: WGS84_EQUATORIAL_RADIUS,
            polar: WGS84_POLAR_RADIUS,
        }
    }
}

impl Ellipsoid {
    pub fn sphere(radius: f64) -> Self {
        Self {
            equatorial: radius,
            polar: radius,
        }
    }

    /// Polar over equatorial radius.
    pub fn flattening_ratio(&self) -> f64 {
        self.polar / self.equatorial
    }
}

/// Output of the geodetic transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub relative_position: [f64; 3],
    pub vertical: [f64; 3],
    /// Pitch, yaw, roll in radians.
    pub rotation: [f64; 3],
}

impl Pose {
    pub fn is_finite(&self) -> bool {
        self.relative_position
            .iter()
            .chain(&self.vertical)
            .chain(&self.rotation)
            .all(|v| v.is_finite())
    }
}

/// Converts geodetic coordinates (degrees, meters) into a frame-relative pose.
///
/// Longitude is negated on the way to radians so that east maps to -z.
pub fn geodetic_to_pose(
    ellipsoid: Ellipsoid,
    longitude: f64,
    latitude: f64,
    altitude: f64,
) -> Pose {
    let re = ellipsoid.equatorial;
    let f = ellipsoid.flattening_ratio();
    let lon = -longitude.to_radians();
    let lat = latitude.to_radians();
    let (s_lat, c_lat) = lat.sin_cos();
    let (s_lon, c_lon) = lon.sin_cos();

    let g = [c_lon * c_lat, s_lat, s_lon * c_lat];
    let vertical = normalize([g[0], g[1] / f, g[2]]);
    let relative_position = [
        g[0] * re + altitude * vertical[0],
        g[1] * re * f + altitude * vertical[1],
        g[2] * re + altitude * vertical[2],
    ];

    Pose {
        relative_position,
        vertical,
        rotation: [meridian_pitch(f, lat), FRAC_PI_2 - lon, 0.0],
    }
}

/// Pitch of the tangent to the unit meridian ellipse `(cos t, f sin t)` at `t = lat`,
/// from a forward finite difference.
fn meridian_pitch(f: f64, lat: f64) -> f64 {
    let sample = |t: f64| (t.cos(), f * t.sin());
    let (x0, y0) = sample(lat);
    let (x1, y1) = sample(lat + MERIDIAN_STEP);
    let (dx, dy) = (x1 - x0, y1 - y0);
    (dx / dx.hypot(dy)).clamp(-1.0, 1.0).acos() - FRAC_PI_2
}

fn normalize(v: [f64; 3]) -> [f64; 3] {
    let length = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if length == 0.0 {
        return v;
    }
    [v[0] / length, v[1] / length, v[2] / length]
}

impl Graph {
    /// Binds `position` to `frame`: the position derives against the frame's
    /// radii, and frame edits invalidate the position.
    #[instrument(level = "debug", skip(self))]
    pub fn bind_frame(&mut self, position: NodeId, frame: NodeId) -> DomainResult<()> {
        self.expect_type(position, names::GEO_POSITION)?;
        self.expect_type(frame, names::GEO_FRAME)?;
        if let Some(previous) = self.reference(position)? {
            self.unlink(previous, position)?;
        }
        self.set_reference(position, Some(frame))?;
        self.link(frame, position)?;
        Ok(())
    }

    /// Frame a position is bound to, if it is still alive.
    pub fn frame_of(&self, position: NodeId) -> DomainResult<Option<NodeId>> {
        self.expect_type(position, names::GEO_POSITION)?;
        self.reference(position)
    }

    /// Radii of a frame node.
    pub fn ellipsoid(&self, frame: NodeId) -> DomainResult<Ellipsoid> {
        self.expect_type(frame, names::GEO_FRAME)?;
        let [equatorial, polar] = self.components::<2>(frame)?;
        Ok(Ellipsoid { equatorial, polar })
    }

    /// Current derived outputs of a position node.
    pub fn pose(&self, position: NodeId) -> DomainResult<Pose> {
        self.expect_type(position, names::GEO_POSITION)?;
        let rotation = self.child(position, "rotation")?;
        Ok(Pose {
            relative_position: self.vector(self.child(position, "relativePosition")?)?,
            vertical: self.vector(self.child(position, "vertical")?)?,
            rotation: self.components::<3>(rotation)?,
        })
    }
}

/// Rotation outputs are radians; label them so.
pub(crate) fn prepare_position(graph: &mut Graph, id: NodeId) -> DomainResult<()> {
    let rotation = graph.child(id, "rotation")?;
    for axis in ["x", "y", "z"] {
        let leaf = graph.child(rotation, axis)?;
        graph.select_unit(leaf, "radians")?;
    }
    Ok(())
}

/// Recomputes a position's outputs from its current inputs and frame.
///
/// An unbound position uses the WGS84 ellipsoid. Outputs are left as they
/// are when the ellipsoid yields no finite pose.
pub(crate) fn derive_position(graph: &mut Graph, id: NodeId) -> DomainResult<()> {
    let ellipsoid = match graph.reference(id)? {
        Some(frame) => graph.ellipsoid(frame)?,
        None => Ellipsoid::default(),
    };
    let [longitude, latitude, altitude] = graph.components::<3>(id)?;
    let pose = geodetic_to_pose(ellipsoid, longitude, latitude, altitude);
    if !pose.is_finite() {
        warn!(
            "no finite pose for {:?}, keeping previous outputs of {}",
            ellipsoid, id
        );
        return Ok(());
    }
    debug!(
        "pose at lon={} lat={} alt={}: {:?}",
        longitude, latitude, altitude, pose.relative_position
    );

    let relative = graph.child(id, "relativePosition")?;
    graph.set_vector(relative, pose.relative_position)?;
    let vertical = graph.child(id, "vertical")?;
    graph.set_vector(vertical, pose.vertical)?;
    let rotation = graph.child(id, "rotation")?;
    for (axis, value) in ["x", "y", "z"].into_iter().zip(pose.rotation) {
        let leaf = graph.child(rotation, axis)?;
        graph.set_value(leaf, Some(Scalar::Number(value)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const EPS: f64 = 1e-6;

    #[test]
    fn given_sphere_at_origin_then_position_on_x_axis() {
        let pose = geodetic_to_pose(Ellipsoid::sphere(1000.0), 0.0, 0.0, 0.0);

        assert!((pose.relative_position[0] - 1000.0).abs() < EPS);
        assert!(pose.relative_position[1].abs() < EPS);
        assert!(pose.relative_position[2].abs() < EPS);
        assert!((pose.vertical[0] - 1.0).abs() < EPS);
    }

    #[rstest]
    #[case(0.0)]
    #[case(45.0)]
    #[case(-120.0)]
    #[case(180.0)]
    fn given_pole_then_y_invariant_to_longitude(#[case] longitude: f64) {
        let ellipsoid = Ellipsoid::default();

        let pose = geodetic_to_pose(ellipsoid, longitude, 90.0, 0.0);

        let expected = ellipsoid.equatorial * ellipsoid.flattening_ratio();
        assert!((pose.relative_position[1] - expected).abs() < 1e-6 * expected);
        assert!(pose.relative_position[0].abs() < 1e-3);
        assert!(pose.relative_position[2].abs() < 1e-3);
    }

    #[rstest]
    #[case(-60.0)]
    #[case(-15.0)]
    #[case(0.0)]
    #[case(30.0)]
    #[case(75.0)]
    fn given_latitude_then_finite_difference_matches_ellipse_normal(#[case] latitude: f64) {
        let f = WGS84_POLAR_RADIUS / WGS84_EQUATORIAL_RADIUS;
        let lat = f64::to_radians(latitude);

        let pitch = meridian_pitch(f, lat);

        let closed_form = lat.sin().atan2(f * lat.cos());
        assert!((pitch - closed_form).abs() < 1e-5, "{pitch} vs {closed_form}");
    }

    #[test]
    fn given_altitude_then_offset_along_vertical() {
        let ground = geodetic_to_pose(Ellipsoid::default(), 10.0, 40.0, 0.0);
        let raised = geodetic_to_pose(Ellipsoid::default(), 10.0, 40.0, 100.0);

        let offset: f64 = (0..3)
            .map(|i| (raised.relative_position[i] - ground.relative_position[i]).powi(2))
            .sum::<f64>()
            .sqrt();
        assert!((offset - 100.0).abs() < 1e-6);
    }

    #[test]
    fn given_bound_position_when_frame_changes_then_position_invalidated() {
        let mut graph = Graph::new();
        let frame = graph.create(names::GEO_FRAME, "frame").unwrap();
        let position = graph.create(names::GEO_POSITION, "position").unwrap();
        graph.bind_frame(position, frame).unwrap();
        graph.update(position, 0.0, false).unwrap();
        graph.update(frame, 0.0, false).unwrap();
        assert!(graph.node(position).unwrap().is_updated());

        let radius = graph.child(frame, "equatorialRadius").unwrap();
        graph.set_value(radius, Some(Scalar::Number(1000.0))).unwrap();

        assert!(!graph.node(position).unwrap().is_updated());
    }

    #[test]
    fn given_sphere_frame_when_updating_then_outputs_written() {
        let mut graph = Graph::new();
        let frame = graph.create(names::GEO_FRAME, "frame").unwrap();
        for name in ["equatorialRadius", "polarRadius"] {
            let leaf = graph.child(frame, name).unwrap();
            graph.set_value(leaf, Some(Scalar::Number(500.0))).unwrap();
        }
        let position = graph.create(names::GEO_POSITION, "position").unwrap();
        graph.bind_frame(position, frame).unwrap();

        graph.update(position, 0.0, false).unwrap();

        let pose = graph.pose(position).unwrap();
        assert!((pose.relative_position[0] - 500.0).abs() < EPS);
        assert!((pose.rotation[1] - FRAC_PI_2).abs() < EPS);
        assert!(graph.node(position).unwrap().is_updated());
        let yaw = graph.resolve(position, "rotation.y").unwrap();
        assert_eq!(graph.unit(yaw).unwrap().id, "radians");
    }

    #[test]
    fn given_destroyed_frame_then_reference_cleared() {
        let mut graph = Graph::new();
        let frame = graph.create(names::GEO_FRAME, "frame").unwrap();
        let position = graph.create(names::GEO_POSITION, "position").unwrap();
        graph.bind_frame(position, frame).unwrap();

        graph.destroy(frame).unwrap();

        assert_eq!(graph.frame_of(position).unwrap(), None);
        assert!(graph.update(position, 0.0, false).is_ok());
    }

    #[test]
    fn given_extreme_radii_when_updating_then_outputs_kept_and_node_valid() {
        let mut graph = Graph::new();
        let frame = graph.create(names::GEO_FRAME, "frame").unwrap();
        let position = graph.create(names::GEO_POSITION, "position").unwrap();
        graph.bind_frame(position, frame).unwrap();
        graph.update(position, 0.0, false).unwrap();
        let before = graph.pose(position).unwrap();

        let equatorial = graph.child(frame, "equatorialRadius").unwrap();
        graph.set_value(equatorial, Some(Scalar::Number(f64::MIN_POSITIVE))).unwrap();
        let polar = graph.child(frame, "polarRadius").unwrap();
        graph.set_value(polar, Some(Scalar::Number(1e300))).unwrap();
        graph.update(position, 0.0, false).unwrap();

        assert_eq!(graph.pose(position).unwrap(), before);
        assert!(graph.node(position).unwrap().is_updated());
    }
}
