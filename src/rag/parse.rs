use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};

use crate::graph::{CategoryPalette, GraphEdge, GraphNode, GraphSnapshot, node_size};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl From<RawId> for String {
    fn from(value: RawId) -> Self {
        match value {
            RawId::Text(text) => text,
            RawId::Number(number) => number.to_string(),
        }
    }
}

pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(String::from)
}

pub(crate) fn deserialize_ids<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<RawId>::deserialize(deserializer).map(|ids| ids.into_iter().map(String::from).collect())
}

fn default_kind() -> String {
    "memory".to_owned()
}

#[derive(Clone, Debug, Deserialize)]
pub struct RawNode {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_kind", rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RawEdge {
    #[serde(deserialize_with = "deserialize_id")]
    pub source: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub target: String,
    #[serde(default)]
    pub weight: f32,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GraphMetadata {
    #[serde(default)]
    pub node_count: usize,
    #[serde(default)]
    pub edge_count: usize,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GraphExport {
    pub nodes: Vec<RawNode>,
    #[serde(default)]
    pub edges: Vec<RawEdge>,
    #[serde(default)]
    pub metadata: GraphMetadata,
}

/// A single note pushed into a running view, with its similarity edges.
#[derive(Clone, Debug, Deserialize)]
pub struct NodeInsertionPayload {
    pub node: RawNode,
    #[serde(default)]
    pub edges: Vec<RawEdge>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
}

pub struct LoadedGraph {
    pub snapshot: GraphSnapshot,
    pub palette: CategoryPalette,
    pub stats: GraphStats,
}

pub fn parse_graph_export(raw: &str) -> Result<GraphExport> {
    serde_json::from_str(raw).context("invalid graph export JSON")
}

impl RawNode {
    pub fn into_node(self, palette: &mut CategoryPalette) -> GraphNode {
        if let Some(category) = self.category.as_deref() {
            palette.register(category);
        }
        let color = palette.node_color(&self.kind, self.category.as_deref());
        let label = if self.label.is_empty() {
            self.id.clone()
        } else {
            self.label
        };

        GraphNode {
            size: node_size(&self.kind),
            color,
            id: self.id,
            label,
            kind: self.kind,
            category: self.category,
            created_at: self.created_at,
        }
    }
}

impl From<RawEdge> for GraphEdge {
    fn from(raw: RawEdge) -> Self {
        let weight = if raw.weight.is_finite() {
            raw.weight.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            source: raw.source,
            target: raw.target,
            weight,
        }
    }
}

impl GraphExport {
    pub fn into_loaded(self) -> LoadedGraph {
        let mut palette =
            CategoryPalette::from_categories(self.metadata.categories.iter().map(String::as_str));
        let nodes = self
            .nodes
            .into_iter()
            .map(|node| node.into_node(&mut palette))
            .collect::<Vec<_>>();
        let edges = self.edges.into_iter().map(GraphEdge::from).collect();
        let snapshot = GraphSnapshot::new(nodes, edges);

        let stats = GraphStats {
            node_count: self.metadata.node_count.max(snapshot.node_count()),
            edge_count: self.metadata.edge_count.max(snapshot.edge_count()),
        };

        LoadedGraph {
            snapshot,
            palette,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = r#"{
        "nodes": [
            {"id": 1, "label": "Trip to Lisbon", "type": "memory", "category": "travel"},
            {"id": "2", "label": "Dentist", "category": "health", "created_at": "2024-03-02"},
            {"id": 3, "label": "", "type": "note"}
        ],
        "edges": [
            {"source": 1, "target": "2", "weight": 0.82},
            {"source": 2, "target": 3, "weight": 1.7},
            {"source": 3, "target": 99, "weight": 0.4}
        ],
        "metadata": {"node_count": 3, "edge_count": 3, "categories": ["travel", "health"]}
    }"#;

    #[test]
    fn numeric_and_string_ids_normalise_to_strings() {
        let export = parse_graph_export(EXPORT).unwrap();
        let ids = export.nodes.iter().map(|node| node.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, ["1", "2", "3"]);
        assert_eq!(export.edges[0].source, "1");
        assert_eq!(export.nodes[1].kind, "memory");
    }

    #[test]
    fn loading_builds_snapshot_palette_and_stats() {
        let loaded = parse_graph_export(EXPORT).unwrap().into_loaded();

        assert_eq!(loaded.snapshot.node_count(), 3);
        assert_eq!(loaded.snapshot.edge_count(), 2);
        assert_eq!(loaded.snapshot.edges()[1].weight, 1.0);
        assert_eq!(loaded.snapshot.node("3").unwrap().label, "3");
        assert_eq!(loaded.snapshot.node("3").unwrap().size, 10.0);
        assert_eq!(loaded.palette.entries().count(), 2);
        assert_eq!(loaded.stats, GraphStats { node_count: 3, edge_count: 3 });
    }

    #[test]
    fn malformed_export_is_an_error() {
        assert!(parse_graph_export("{\"edges\": []}").is_err());
        assert!(parse_graph_export("not json").is_err());
    }

    #[test]
    fn insertion_payload_defaults_missing_edges() {
        let payload: NodeInsertionPayload =
            serde_json::from_str(r#"{"node": {"id": 7, "label": "Voice note"}}"#).unwrap();
        assert_eq!(payload.node.id, "7");
        assert!(payload.edges.is_empty());
    }
}
