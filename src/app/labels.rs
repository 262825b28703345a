use std::borrow::Cow;

use crate::graph::GraphEdge;
use crate::util::truncate_label;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(in crate::app) enum LabelMode {
    None,
    Selected,
    #[default]
    Adjacent,
    All,
}

impl LabelMode {
    pub(in crate::app) const ALL: [Self; 4] = [Self::None, Self::Selected, Self::Adjacent, Self::All];

    pub(in crate::app) fn label(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Selected => "Selected",
            Self::Adjacent => "Selected + neighbours",
            Self::All => "All",
        }
    }
}

pub(in crate::app) fn label_visible(
    node_id: &str,
    mode: LabelMode,
    selected_id: Option<&str>,
    edges: &[GraphEdge],
) -> bool {
    match mode {
        LabelMode::None => false,
        LabelMode::All => true,
        LabelMode::Selected => selected_id == Some(node_id),
        LabelMode::Adjacent => selected_id.is_some_and(|selected| {
            selected == node_id || edges.iter().any(|edge| edge.connects(node_id, selected))
        }),
    }
}

/// Text drawn next to a node: the full label when selected, a truncated one otherwise.
pub(in crate::app) fn label_text(label: &str, selected: bool) -> Cow<'_, str> {
    if selected {
        Cow::Borrowed(label)
    } else {
        truncate_label(label)
    }
}
