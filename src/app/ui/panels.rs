use eframe::egui::{self, Align, Context, Layout};

use crate::rag::{ExplorationState, LoadedGraph};

use super::super::graph::GraphScene;
use super::super::highlight::FamilyColors;
use super::super::insertion::{InsertionCoordinator, RetryPolicy};
use super::super::labels::LabelMode;
use super::super::physics::LayoutConfig;
use super::super::{ViewModel, ViewRequests, ViewScratch};

impl ViewModel {
    pub(in crate::app) fn new(
        loaded: LoadedGraph,
        config: LayoutConfig,
        generation: u64,
        exploration: &ExplorationState,
    ) -> Self {
        let mut family_colors = FamilyColors::create();
        family_colors.sync(exploration);

        Self {
            scene: GraphScene::new(loaded, config, generation),
            insertions: InsertionCoordinator::new(RetryPolicy::default()),
            family_colors,
            label_mode: LabelMode::default(),
            live_physics: true,
            search: String::new(),
            category_filter: None,
            dragging: None,
            view_scratch: ViewScratch::default(),
        }
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        source: &str,
        requests: &mut ViewRequests,
        is_reloading: bool,
    ) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("memory-graph");
                    ui.separator();
                    ui.label(format!("source: {source}"));
                    ui.label(format!("nodes: {}", self.scene.stats.node_count));
                    ui.label(format!("edges: {}", self.scene.stats.edge_count));
                    let refresh_button =
                        ui.add_enabled(!is_reloading, egui::Button::new("Refresh"));
                    if refresh_button.clicked() {
                        requests.reload = true;
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if is_reloading {
                            ui.spinner();
                            ui.label("reloading");
                        }
                        if !self.insertions.is_idle() {
                            ui.label("placing new memory...");
                        }
                        if self.family_colors.is_active() {
                            ui.label(format!("highlighted: {}", self.family_colors.len()));
                        }
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| self.draw_controls(ui, requests));

        egui::SidePanel::right("node_list")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| self.draw_node_list(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_graph(ui));
    }
}
