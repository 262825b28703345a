use eframe::egui::{self, Align2, Color32, FontId, Rect, Sense, Stroke, Ui, vec2};

use crate::graph::{GraphEdge, NEW_NODE_COLOR, edge_color, edge_width};

use super::super::labels::{LabelMode, label_text, label_visible};
use super::super::render_utils::{
    UNHIGHLIGHTED_COLOR, blend_color, circle_visible, draw_background, edge_visible, with_alpha,
};
use super::super::ViewModel;
use super::GraphScene;

const NEW_NODE_SCALE: f32 = 2.0;

impl ViewModel {
    fn update_screen_space(&mut self, rect: Rect) {
        let scratch = &mut self.view_scratch;
        let scene = &self.scene;
        let zoom = scene.viewport.zoom;

        scratch.screen_positions.clear();
        scratch.screen_radii.clear();
        for (index, node) in scene.snapshot.nodes().iter().enumerate() {
            scratch.screen_positions.push(
                scene
                    .engine
                    .position_at(index)
                    .map(|world| scene.viewport.world_to_screen(rect, world)),
            );

            let mut radius = node.size;
            if scene.new_node.as_deref() == Some(node.id.as_str()) {
                radius *= NEW_NODE_SCALE;
            }
            if let Some(emphasis) = self.family_colors.emphasis(&node.id) {
                radius *= emphasis.radius_scale();
            }
            scratch.screen_radii.push((radius * zoom).clamp(1.5, 64.0));
        }
    }

    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        self.handle_graph_zoom(ui, rect, &response);

        if self.live_physics || self.dragging.is_some() || self.scene.engine.has_unplaced() {
            self.scene.engine.step();
        }

        self.update_screen_space(rect);
        self.handle_node_drag(ui, rect, &response);
        self.handle_graph_pan(&response);
        self.update_screen_space(rect);

        let viewport = self.scene.viewport;
        draw_background(&painter, rect, viewport.pan, viewport.zoom);

        if self.scene.snapshot.is_empty() {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "No memories yet",
                FontId::proportional(16.0),
                Color32::from_gray(160),
            );
            return;
        }

        if (self.live_physics && self.physics_active()) || self.scene.engine.has_unplaced() {
            ui.ctx().request_repaint();
        }

        let hovered = self.hovered_index(ui);
        if hovered.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }

        if response.clicked_by(egui::PointerButton::Primary) {
            match hovered {
                Some(index) => {
                    let id = self.scene.snapshot.nodes()[index].id.clone();
                    self.scene.select_by_user(Some(id));
                }
                None => self.scene.selected = None,
            }
        }

        self.draw_edges(&painter, rect);
        self.draw_nodes(&painter, rect, hovered);
        self.draw_labels(&painter, rect);

        if let Some(node) = hovered.and_then(|index| self.scene.snapshot.nodes().get(index)) {
            let mut panel_text = format!("{}  |  {}", node.label, node.kind);
            if let Some(category) = &node.category {
                panel_text.push_str(&format!("  |  {category}"));
            }
            if let Some(created_at) = &node.created_at {
                panel_text.push_str(&format!("  |  {created_at}"));
            }
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                panel_text,
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }
    }

    fn draw_edges(&self, painter: &egui::Painter, rect: Rect) {
        let scene = &self.scene;
        let positions = &self.view_scratch.screen_positions;
        let session_active = self.family_colors.is_active();
        let zoom_sqrt = scene.viewport.zoom.sqrt();

        for edge in scene.snapshot.edges() {
            let (Some(source), Some(target)) = (
                scene.snapshot.index_of(&edge.source),
                scene.snapshot.index_of(&edge.target),
            ) else {
                continue;
            };
            let (Some(start), Some(end)) = (positions[source], positions[target]) else {
                continue;
            };
            if !edge_visible(rect, start, end, 2.0) {
                continue;
            }

            let stroke = match self.family_colors.edge_color(&edge.source, &edge.target) {
                Some(record) => Stroke::new(
                    (2.0 * zoom_sqrt).clamp(1.0, 4.0),
                    with_alpha(record.fill, 0.85),
                ),
                None if session_active => {
                    Stroke::new(0.6, with_alpha(UNHIGHLIGHTED_COLOR, 0.25))
                }
                None => Stroke::new(
                    (edge_width(edge.weight) * zoom_sqrt).clamp(0.3, 4.0),
                    edge_color(edge.weight),
                ),
            };
            painter.line_segment([start, end], stroke);
        }
    }

    fn draw_nodes(&self, painter: &egui::Painter, rect: Rect, hovered: Option<usize>) {
        let scene = &self.scene;
        let scratch = &self.view_scratch;
        let session_active = self.family_colors.is_active();

        for (index, node) in scene.snapshot.nodes().iter().enumerate() {
            let Some(position) = scratch.screen_positions[index] else {
                continue;
            };
            let radius = scratch.screen_radii[index];
            if !circle_visible(rect, position, radius + 8.0) {
                continue;
            }

            let is_new = scene.new_node.as_deref() == Some(node.id.as_str());
            let is_selected = scene.selected.as_deref() == Some(node.id.as_str());

            let (mut fill, mut stroke) = match self.family_colors.color_of(&node.id) {
                Some(record) => {
                    let width = self
                        .family_colors
                        .emphasis(&node.id)
                        .map_or(1.0, |emphasis| emphasis.stroke_width());
                    (record.fill, Stroke::new(width, record.stroke))
                }
                None if session_active => (
                    with_alpha(UNHIGHLIGHTED_COLOR, 0.55),
                    Stroke::new(0.8, with_alpha(UNHIGHLIGHTED_COLOR, 0.7)),
                ),
                None => (
                    node.color,
                    Stroke::new(1.0, Color32::from_rgba_unmultiplied(15, 15, 15, 190)),
                ),
            };

            if hovered == Some(index) {
                fill = blend_color(fill, Color32::WHITE, 0.25);
            }
            if is_selected {
                stroke = Stroke::new(2.5, Color32::WHITE);
            }
            if is_new {
                painter.circle_filled(position, radius + 6.0, with_alpha(NEW_NODE_COLOR, 0.25));
                stroke = Stroke::new(3.0, NEW_NODE_COLOR);
            }

            painter.circle_filled(position, radius, fill);
            painter.circle_stroke(position, radius, stroke);
        }
    }

    fn draw_labels(&self, painter: &egui::Painter, rect: Rect) {
        let scene = &self.scene;
        let scratch = &self.view_scratch;
        let selected = scene.selected.as_deref();

        for index in labelled_nodes(scene, self.label_mode) {
            let node = &scene.snapshot.nodes()[index];
            let Some(position) = scratch.screen_positions[index] else {
                continue;
            };
            let radius = scratch.screen_radii[index];
            if !circle_visible(rect, position, radius + 120.0) {
                continue;
            }

            let is_new = scene.new_node.as_deref() == Some(node.id.as_str());
            let is_selected = selected == Some(node.id.as_str());
            let (size, color) = if is_new {
                (15.0, NEW_NODE_COLOR)
            } else if is_selected {
                (14.0, Color32::WHITE)
            } else {
                (11.5, Color32::from_gray(220))
            };
            painter.text(
                position + vec2(radius + 5.0, 0.0),
                Align2::LEFT_CENTER,
                label_text(&node.label, is_selected || is_new),
                FontId::proportional(size),
                color,
            );
        }
    }
}

/// Indices of the nodes whose label the current mode shows. The new node only
/// changes how its label looks, never whether it is drawn.
fn labelled_nodes(scene: &GraphScene, mode: LabelMode) -> Vec<usize> {
    let selected = scene.selected.as_deref();

    // Only edges touching the selection can make a node adjacent.
    let selected_edges: Vec<GraphEdge> = selected
        .map(|selected| {
            scene
                .snapshot
                .edges()
                .iter()
                .filter(|edge| edge.source == selected || edge.target == selected)
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    scene
        .snapshot
        .nodes()
        .iter()
        .enumerate()
        .filter(|(_, node)| label_visible(&node.id, mode, selected, &selected_edges))
        .map(|(index, _)| index)
        .collect()
}
