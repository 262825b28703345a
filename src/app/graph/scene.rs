use tracing::debug;

use crate::graph::{AddOutcome, CategoryPalette, GraphEdge, GraphSnapshot};
use crate::rag::{GraphStats, LoadedGraph, NodeInsertionPayload};

use super::super::insertion::InsertionHost;
use super::super::physics::{LayoutConfig, LayoutEngine};
use super::super::viewport::Viewport;

const FOCUS_PIN_SECS: f64 = 0.1;
const FOCUS_RESTART_ALPHA: f32 = 0.1;

struct FocusRelease {
    node_id: String,
    at: f64,
}

/// Everything tied to one loaded graph: data, layout, camera and selection state.
pub(in crate::app) struct GraphScene {
    pub(in crate::app) snapshot: GraphSnapshot,
    pub(in crate::app) engine: LayoutEngine,
    pub(in crate::app) viewport: Viewport,
    pub(in crate::app) palette: CategoryPalette,
    pub(in crate::app) stats: GraphStats,
    pub(in crate::app) selected: Option<String>,
    pub(in crate::app) new_node: Option<String>,
    focus_releases: Vec<FocusRelease>,
    now: f64,
}

impl GraphScene {
    pub(in crate::app) fn new(loaded: LoadedGraph, config: LayoutConfig, generation: u64) -> Self {
        let LoadedGraph {
            snapshot,
            palette,
            stats,
        } = loaded;
        let engine = LayoutEngine::new(&snapshot, config, generation);
        let viewport = Viewport::fitted(snapshot.node_count());
        debug!(generation, zoom = viewport.zoom, "scene created");

        Self {
            snapshot,
            engine,
            viewport,
            palette,
            stats,
            selected: None,
            new_node: None,
            focus_releases: Vec::new(),
            now: 0.0,
        }
    }

    /// Moves the scene clock forward and releases every focus pin that is due.
    pub(in crate::app) fn advance(&mut self, now: f64) {
        self.now = now;
        let before = self.focus_releases.len();
        let engine = &mut self.engine;
        self.focus_releases.retain(|release| {
            if now < release.at {
                return true;
            }
            engine.unpin(&release.node_id);
            false
        });
        if self.focus_releases.len() < before {
            self.engine.restart(FOCUS_RESTART_ALPHA);
        }
    }

    pub(in crate::app) fn next_deadline(&self) -> Option<f64> {
        self.focus_releases
            .iter()
            .map(|release| release.at)
            .min_by(f64::total_cmp)
    }

    /// Selection from a click: the new-node highlight goes away with it.
    pub(in crate::app) fn select_by_user(&mut self, id: Option<String>) {
        self.selected = id;
        self.new_node = None;
    }

    pub(in crate::app) fn teardown(&mut self) {
        self.engine.stop();
        for release in self.focus_releases.drain(..) {
            debug!(node = %release.node_id, "dropping pending focus release");
        }
    }
}

impl InsertionHost for GraphScene {
    fn generation(&self) -> u64 {
        self.engine.generation()
    }

    fn insert(&mut self, payload: NodeInsertionPayload) -> AddOutcome {
        if self.snapshot.contains(&payload.node.id) {
            return AddOutcome::AlreadyPresent;
        }

        let node = payload.node.into_node(&mut self.palette);
        let edges = payload.edges.into_iter().map(GraphEdge::from).collect();
        let outcome = self.snapshot.add_node(node, edges);
        if let AddOutcome::Added { edges_added } = outcome {
            self.stats.node_count += 1;
            self.stats.edge_count += edges_added;
            self.engine.sync(&self.snapshot);
        }
        outcome
    }

    fn focus_node(&mut self, id: &str) -> bool {
        let position = self.engine.position_of(id);
        if !self.viewport.focus_on(position) {
            return false;
        }
        if let Some(position) = position {
            self.engine.pin(id, position);
        }
        self.engine.stop();
        // A refocus of the same node only pushes its release back.
        self.focus_releases.retain(|release| release.node_id != id);
        self.focus_releases.push(FocusRelease {
            node_id: id.to_owned(),
            at: self.now + FOCUS_PIN_SECS,
        });
        true
    }

    fn mark_new(&mut self, id: &str) {
        self.new_node = Some(id.to_owned());
    }

    fn clear_new(&mut self, id: &str) {
        if self.new_node.as_deref() == Some(id) {
            self.new_node = None;
        }
    }

    fn select(&mut self, id: &str) {
        self.selected = Some(id.to_owned());
    }
}
