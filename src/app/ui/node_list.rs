use eframe::egui::{self, RichText, Ui};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::graph::GraphNode;
use crate::util::truncate_label;

use super::super::ViewModel;
use super::super::insertion::InsertionHost;

const ROW_HEIGHT: f32 = 20.0;

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_lowercase(), &query.to_lowercase()))
}

/// Indices of the nodes that pass the category filter and match `query`, best match first.
fn filtered_indices(nodes: &[GraphNode], query: &str, category: Option<&str>) -> Vec<usize> {
    let in_category = |node: &GraphNode| {
        category.is_none_or(|category| node.category.as_deref() == Some(category))
    };

    let query = query.trim();
    if query.is_empty() {
        return (0..nodes.len())
            .filter(|&index| in_category(&nodes[index]))
            .collect();
    }

    let matcher = SkimMatcherV2::default();
    let mut scored = nodes
        .iter()
        .enumerate()
        .filter(|(_, node)| in_category(node))
        .filter_map(|(index, node)| {
            fuzzy_match_score(&matcher, &node.label, query).map(|score| (index, score))
        })
        .collect::<Vec<_>>();
    scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    scored.into_iter().map(|(index, _)| index).collect()
}

impl ViewModel {
    pub(in crate::app) fn draw_node_list(&mut self, ui: &mut Ui) {
        ui.heading("Memories");
        ui.separator();

        if let Some(node) = self
            .scene
            .selected
            .as_deref()
            .and_then(|id| self.scene.snapshot.node(id))
        {
            ui.label(RichText::new(node.label.as_str()).strong());
            ui.label(format!("type: {}", node.kind));
            if let Some(category) = &node.category {
                ui.label(format!("category: {category}"));
            }
            if let Some(created_at) = &node.created_at {
                ui.label(format!("created: {created_at}"));
            }
            ui.separator();
        }

        ui.label("Search")
            .on_hover_text("Fuzzy match against node labels.");
        ui.text_edit_singleline(&mut self.search);

        let categories = self
            .scene
            .snapshot
            .categories()
            .map(str::to_owned)
            .collect::<Vec<_>>();
        if !categories.is_empty() {
            let selected_text = self.category_filter.as_deref().unwrap_or("All categories");
            egui::ComboBox::from_id_salt("category_filter")
                .selected_text(selected_text.to_owned())
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut self.category_filter, None, "All categories");
                    for category in categories {
                        let label = category.clone();
                        ui.selectable_value(&mut self.category_filter, Some(category), label);
                    }
                });
        }

        let indices = filtered_indices(
            self.scene.snapshot.nodes(),
            &self.search,
            self.category_filter.as_deref(),
        );
        ui.label(format!("{} of {}", indices.len(), self.scene.snapshot.node_count()));
        ui.add_space(4.0);

        let mut clicked = None;
        egui::ScrollArea::vertical()
            .id_salt("node_list_scroll")
            .auto_shrink([false, false])
            .show_rows(ui, ROW_HEIGHT, indices.len(), |ui, row_range| {
                for &index in &indices[row_range] {
                    let node = &self.scene.snapshot.nodes()[index];
                    let is_selected = self.scene.selected.as_deref() == Some(node.id.as_str());
                    ui.horizontal(|ui| {
                        ui.label(RichText::new("●").color(node.color));
                        let response = ui
                            .selectable_label(is_selected, truncate_label(&node.label).into_owned())
                            .on_hover_text(node.label.as_str());
                        if response.clicked() {
                            clicked = Some(node.id.clone());
                        }
                    });
                }
            });

        if let Some(id) = clicked {
            self.scene.select_by_user(Some(id.clone()));
            self.scene.focus_node(&id);
        }
    }
}
