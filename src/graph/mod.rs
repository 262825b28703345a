mod style;

use std::collections::{HashMap, HashSet};

use eframe::egui::Color32;

pub use style::{
    CategoryPalette, MEMORY_COLOR, NEW_NODE_COLOR, NOTE_COLOR, TAG_COLOR, edge_color, edge_width,
    node_size,
};

#[derive(Clone, Debug, PartialEq)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub kind: String,
    pub category: Option<String>,
    pub created_at: Option<String>,
    pub size: f32,
    pub color: Color32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub weight: f32,
}

impl GraphEdge {
    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    Added { edges_added: usize },
    AlreadyPresent,
}

/// Node and edge collection shown by the viewer.
///
/// Ids are unique and every edge endpoint refers to a node that was present when the
/// edge was accepted. Nothing is ever removed; a reload replaces the whole snapshot.
#[derive(Clone, Debug, Default)]
pub struct GraphSnapshot {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    index_by_id: HashMap<String, usize>,
}

impl GraphSnapshot {
    pub fn new(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> Self {
        let mut snapshot = Self::default();
        snapshot.replace(nodes, edges);
        snapshot
    }

    pub fn replace(&mut self, nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) {
        self.nodes.clear();
        self.edges.clear();
        self.index_by_id.clear();

        for node in nodes {
            if self.index_by_id.contains_key(&node.id) {
                continue;
            }
            self.index_by_id.insert(node.id.clone(), self.nodes.len());
            self.nodes.push(node);
        }

        let index_by_id = &self.index_by_id;
        self.edges.extend(edges.into_iter().filter(|edge| {
            index_by_id.contains_key(&edge.source) && index_by_id.contains_key(&edge.target)
        }));
    }

    /// Appends `node` and the subset of `edges` whose endpoints exist once it is in place.
    ///
    /// Edges towards ids that are not in the snapshot yet are dropped without notice.
    pub fn add_node(&mut self, node: GraphNode, edges: Vec<GraphEdge>) -> AddOutcome {
        if self.index_by_id.contains_key(&node.id) {
            return AddOutcome::AlreadyPresent;
        }

        let node_id = node.id.clone();
        let index_by_id = &self.index_by_id;
        let accepted = edges
            .into_iter()
            .filter(|edge| {
                index_by_id.contains_key(&edge.target)
                    && (edge.source == node_id || index_by_id.contains_key(&edge.source))
            })
            .collect::<Vec<_>>();

        self.index_by_id.insert(node_id, self.nodes.len());
        self.nodes.push(node);
        let edges_added = accepted.len();
        self.edges.extend(accepted);

        AddOutcome::Added { edges_added }
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index_of(id).map(|index| &self.nodes[index])
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index_by_id.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        let mut seen = HashSet::new();
        self.nodes
            .iter()
            .filter_map(|node| node.category.as_deref())
            .filter(move |category| seen.insert(*category))
    }
}
