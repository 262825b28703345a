use eframe::egui::{self, Pos2, Rect, Ui};

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn handle_graph_zoom(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.scene.viewport.zoom_at(rect, pointer, zoom_factor);
    }

    /// Secondary or middle drag always pans; a primary drag pans only when it did not grab a node.
    pub(in crate::app) fn handle_graph_pan(&mut self, response: &egui::Response) {
        let primary_pan =
            self.dragging.is_none() && response.dragged_by(egui::PointerButton::Primary);
        if primary_pan
            || response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.scene.viewport.pan_by(response.drag_delta());
        }
    }

    pub(in crate::app) fn handle_node_drag(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        if response.drag_started_by(egui::PointerButton::Primary) {
            let origin = ui.input(|input| input.pointer.press_origin());
            let grabbed = origin
                .and_then(|origin| self.node_at(origin))
                .map(|index| self.scene.snapshot.nodes()[index].id.clone());
            if let Some(id) = grabbed
                && self.scene.engine.begin_drag(&id)
            {
                self.dragging = Some(id);
            }
        }

        if let Some(id) = &self.dragging {
            if response.dragged_by(egui::PointerButton::Primary)
                && let Some(pointer) = response.interact_pointer_pos()
            {
                let world = self.scene.viewport.screen_to_world(rect, pointer);
                self.scene.engine.drag_to(id, world);
            }

            if response.drag_stopped() {
                self.scene.engine.end_drag(id);
                self.dragging = None;
            }
        }
    }

    /// The node whose disc contains `screen`; the closest centre wins on overlap.
    pub(in crate::app) fn node_at(&self, screen: Pos2) -> Option<usize> {
        let scratch = &self.view_scratch;
        scratch
            .screen_positions
            .iter()
            .zip(&scratch.screen_radii)
            .enumerate()
            .filter_map(|(index, (position, radius))| {
                let distance = position.as_ref()?.distance(screen);
                (distance <= *radius).then_some((index, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }

    pub(in crate::app) fn hovered_index(&self, ui: &Ui) -> Option<usize> {
        ui.input(|input| input.pointer.hover_pos())
            .and_then(|pointer| self.node_at(pointer))
    }

    pub(in crate::app) fn physics_active(&self) -> bool {
        self.dragging.is_some() || !self.scene.engine.is_settled()
    }
}
