//! Pose service
//!
//! Owns a graph holding one geodetic frame and one position bound to it,
//! applies payloads to them and runs update ticks.

use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::application::codec::{deserialize, serialize, Outcome};
use crate::application::{ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::{names, EventKind, Flow, Graph, NodeEvent, NodeId, Pose, Scalar};
use crate::infrastructure::traits::FileSystem;

/// Output of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoseReport {
    /// Serialized scene: `{"frame": {...}, "position": {...}}`.
    pub scene: Value,
    #[serde(skip)]
    pub pose: Pose,
    /// Number of position recomputations since the service was created.
    pub recomputations: u64,
}

/// Service evaluating geodetic positions against a configurable frame.
pub struct PoseService {
    fs: Arc<dyn FileSystem>,
    graph: Graph,
    root: NodeId,
    frame: NodeId,
    position: NodeId,
    delta_time: f64,
    recomputations: Rc<Cell<u64>>,
}

impl PoseService {
    /// Build the scene `scene { frame, position }` with the configured frame radii.
    #[instrument(level = "debug", skip_all)]
    pub fn new(fs: Arc<dyn FileSystem>, settings: &Settings) -> ApplicationResult<Self> {
        let mut graph = Graph::new();
        let root = graph.create(names::ITEM, "scene")?;
        let frame = graph.create(names::GEO_FRAME, "frame")?;
        let position = graph.create(names::GEO_POSITION, "position")?;
        graph.add_child(root, frame, None)?;
        graph.add_child(root, position, None)?;
        graph.bind_frame(position, frame)?;

        for (name, radius) in [
            ("equatorialRadius", settings.frame.equatorial_radius),
            ("polarRadius", settings.frame.polar_radius),
        ] {
            let leaf = graph.child(frame, name)?;
            graph.set_value(leaf, Some(Scalar::Number(radius)))?;
        }

        let recomputations = Rc::new(Cell::new(0));
        let counter = Rc::clone(&recomputations);
        graph.on_type(
            names::GEO_POSITION,
            EventKind::PostUpdate,
            Rc::new(move |_: &mut Graph, event: &NodeEvent| {
                counter.set(counter.get() + 1);
                debug!("position {} recomputed", event.source);
                Flow::Continue
            }),
        )?;

        Ok(Self {
            fs,
            graph,
            root,
            frame,
            position,
            delta_time: settings.update.delta_time,
            recomputations,
        })
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn frame(&self) -> NodeId {
        self.frame
    }

    pub fn position(&self) -> NodeId {
        self.position
    }

    /// Sets longitude, latitude (degrees) and altitude (meters) of the position.
    pub fn set_geodetic(&mut self, longitude: f64, latitude: f64, altitude: f64) -> ApplicationResult<()> {
        for (name, value) in [
            ("longitude", longitude),
            ("latitude", latitude),
            ("altitude", altitude),
        ] {
            let leaf = self.graph.child(self.position, name)?;
            self.graph.set_value(leaf, Some(Scalar::Number(value)))?;
        }
        Ok(())
    }

    /// Applies a payload to the scene root.
    pub fn apply(&mut self, payload: &Value) -> ApplicationResult<Outcome> {
        deserialize(&mut self.graph, self.root, payload)
    }

    /// Applies a payload to the position only (e.g. `"10,45,100"`).
    pub fn apply_to_position(&mut self, payload: &Value) -> ApplicationResult<Outcome> {
        deserialize(&mut self.graph, self.position, payload)
    }

    /// Applies text (CSV record or JSON) to the scene root.
    pub fn apply_text(&mut self, text: &str) -> ApplicationResult<Outcome> {
        self.apply(&Value::String(text.to_string()))
    }

    /// Reads a payload file and applies its content to the scene root.
    #[instrument(level = "debug", skip(self))]
    pub fn apply_file(&mut self, path: &Path) -> ApplicationResult<Outcome> {
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read payload", path)?;
        self.apply_text(content.trim())
    }

    /// Runs one update tick over the scene.
    pub fn tick(&mut self) -> ApplicationResult<()> {
        self.graph.update(self.root, self.delta_time, false)?;
        Ok(())
    }

    /// Current scene state, without updating.
    pub fn report(&self) -> ApplicationResult<PoseReport> {
        Ok(PoseReport {
            scene: serialize(&self.graph, self.root)?,
            pose: self.graph.pose(self.position)?,
            recomputations: self.recomputations.get(),
        })
    }

    /// Tick, then report.
    pub fn evaluate(&mut self) -> ApplicationResult<PoseReport> {
        self.tick()?;
        let report = self.report()?;
        info!(
            "position at {:?} (vertical {:?})",
            report.pose.relative_position, report.pose.vertical
        );
        Ok(report)
    }
}
