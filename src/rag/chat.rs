use std::collections::HashSet;

use serde::Deserialize;

use super::parse::{deserialize_id, deserialize_ids};

/// One line of the assistant's NDJSON response stream.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChatEvent {
    Metadata {
        #[serde(rename = "memoryIds", deserialize_with = "deserialize_ids")]
        memory_ids: Vec<String>,
    },
    Expand {
        #[serde(rename = "expandedNodes")]
        expanded_nodes: Vec<ExpandedNode>,
    },
    Text {
        #[serde(default)]
        content: String,
    },
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ExpandedNode {
    #[serde(rename = "parentId", deserialize_with = "deserialize_id")]
    pub parent_id: String,
    #[serde(default, deserialize_with = "deserialize_ids")]
    pub neighbors: Vec<String>,
}

/// One expansion step: a parent and the neighbours retrieved around it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeFamily {
    pub parent_id: String,
    pub neighbor_ids: Vec<String>,
}

impl From<ExpandedNode> for NodeFamily {
    fn from(node: ExpandedNode) -> Self {
        Self {
            parent_id: node.parent_id,
            neighbor_ids: node.neighbors,
        }
    }
}

/// Roots, families and highlighted ids accumulated from the chat stream.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExplorationState {
    pub root_ids: Vec<String>,
    pub families: Vec<NodeFamily>,
    pub highlighted_ids: Vec<String>,
    revision: u64,
}

impl ExplorationState {
    /// Folds `event` into the state, returning true when the highlight inputs changed.
    pub fn apply(&mut self, event: ChatEvent) -> bool {
        match event {
            ChatEvent::Metadata { memory_ids } => {
                self.families.clear();
                self.highlighted_ids = dedup_ordered(memory_ids.iter());
                self.root_ids = memory_ids;
            }
            ChatEvent::Expand { expanded_nodes } => {
                if expanded_nodes.is_empty() {
                    return false;
                }
                self.families
                    .extend(expanded_nodes.into_iter().map(NodeFamily::from));
                self.highlighted_ids = dedup_ordered(
                    self.root_ids.iter().chain(
                        self.families
                            .iter()
                            .flat_map(|family| family.neighbor_ids.iter()),
                    ),
                );
            }
            ChatEvent::Text { .. } => return false,
        }
        self.revision = self.revision.wrapping_add(1);
        true
    }

    pub fn clear(&mut self) {
        if self.is_empty() {
            return;
        }
        self.root_ids.clear();
        self.families.clear();
        self.highlighted_ids.clear();
        self.revision = self.revision.wrapping_add(1);
    }

    pub fn is_empty(&self) -> bool {
        self.root_ids.is_empty() && self.families.is_empty() && self.highlighted_ids.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

fn dedup_ordered<'a>(ids: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> ChatEvent {
        serde_json::from_str(line).unwrap()
    }

    #[test]
    fn decodes_the_three_stream_kinds() {
        assert_eq!(
            parse(r#"{"type": "metadata", "memoryIds": [10, 20]}"#),
            ChatEvent::Metadata {
                memory_ids: vec!["10".to_owned(), "20".to_owned()]
            }
        );
        assert_eq!(
            parse(r#"{"type": "expand", "expandedNodes": [{"parentId": 10, "neighbors": [11, 12]}]}"#),
            ChatEvent::Expand {
                expanded_nodes: vec![ExpandedNode {
                    parent_id: "10".to_owned(),
                    neighbors: vec!["11".to_owned(), "12".to_owned()],
                }]
            }
        );
        assert_eq!(
            parse(r#"{"type": "text", "content": "hola"}"#),
            ChatEvent::Text {
                content: "hola".to_owned()
            }
        );
    }

    #[test]
    fn expansions_accumulate_and_extend_highlights() {
        let mut state = ExplorationState::default();
        assert!(state.apply(parse(r#"{"type": "metadata", "memoryIds": [10, 20, 30]}"#)));
        assert!(state.apply(parse(
            r#"{"type": "expand", "expandedNodes": [{"parentId": 10, "neighbors": [11, 12, 20]}]}"#
        )));
        assert!(state.apply(parse(
            r#"{"type": "expand", "expandedNodes": [{"parentId": 11, "neighbors": [13]}]}"#
        )));

        assert_eq!(state.root_ids, ["10", "20", "30"]);
        assert_eq!(state.families.len(), 2);
        assert_eq!(state.highlighted_ids, ["10", "20", "30", "11", "12", "13"]);
    }

    #[test]
    fn text_does_not_touch_highlights() {
        let mut state = ExplorationState::default();
        state.apply(parse(r#"{"type": "metadata", "memoryIds": [1]}"#));
        let revision = state.revision();

        assert!(!state.apply(parse(r#"{"type": "text", "content": "..."}"#)));
        assert_eq!(state.revision(), revision);
    }

    #[test]
    fn new_search_replaces_roots_and_drops_families() {
        let mut state = ExplorationState::default();
        state.apply(parse(r#"{"type": "metadata", "memoryIds": [1]}"#));
        state.apply(parse(r#"{"type": "expand", "expandedNodes": [{"parentId": 1, "neighbors": [2]}]}"#));
        state.apply(parse(r#"{"type": "metadata", "memoryIds": [5, 6]}"#));

        assert_eq!(state.root_ids, ["5", "6"]);
        assert!(state.families.is_empty());
        assert_eq!(state.highlighted_ids, ["5", "6"]);

        state.clear();
        assert!(state.is_empty());
    }
}
