use std::ops::RangeInclusive;

use eframe::egui::{self, RichText, Ui};

use crate::graph::{MEMORY_COLOR, NOTE_COLOR, TAG_COLOR};

use super::super::highlight::FAMILY_PALETTE;
use super::super::labels::LabelMode;
use super::super::physics::LayoutConfig;
use super::super::{ViewModel, ViewRequests};

fn tuning_slider(
    ui: &mut Ui,
    value: &mut f32,
    range: RangeInclusive<f32>,
    text: &str,
    hover: &str,
) -> bool {
    ui.add(
        egui::Slider::new(value, range)
            .text(text)
            .clamping(egui::SliderClamping::Always),
    )
    .on_hover_text(hover)
    .changed()
}

fn swatch(ui: &mut Ui, color: egui::Color32, text: &str) {
    ui.horizontal(|ui| {
        ui.label(RichText::new("●").color(color));
        ui.label(text);
    });
}

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui, requests: &mut ViewRequests) {
        ui.heading("Graph Controls");
        ui.separator();
        ui.add_space(4.0);

        ui.horizontal(|ui| {
            if ui.button("+").on_hover_text("Zoom in").clicked() {
                self.scene.viewport.zoom_in();
            }
            if ui.button("-").on_hover_text("Zoom out").clicked() {
                self.scene.viewport.zoom_out();
            }
            if ui
                .button("Reset view")
                .on_hover_text("Reset to 100% zoom, centred on the origin.")
                .clicked()
            {
                self.scene.viewport.reset();
            }
            ui.label(format!("{:.0}%", self.scene.viewport.zoom * 100.0));
        });

        ui.separator();

        ui.label("Labels");
        ui.horizontal_wrapped(|ui| {
            for mode in LabelMode::ALL {
                ui.selectable_value(&mut self.label_mode, mode, mode.label());
            }
        });

        ui.separator();

        ui.checkbox(&mut self.live_physics, "Live physics simulation")
            .on_hover_text("Keep simulating layout forces while the graph is on screen.");
        if ui
            .button("Reheat layout")
            .on_hover_text("Restart the simulation from full energy.")
            .clicked()
        {
            self.scene.engine.restart(1.0);
        }
        ui.label(format!("alpha: {:.3}", self.scene.engine.alpha()));

        ui.collapsing("Physics tuning", |ui| {
            let mut config = self.scene.engine.config();
            let mut changed = false;

            changed |= tuning_slider(
                ui,
                &mut config.charge_strength,
                -400.0..=0.0,
                "Charge",
                "How strongly nodes push away from each other.",
            );
            changed |= tuning_slider(
                ui,
                &mut config.link_strength,
                0.0..=2.0,
                "Link strength",
                "How strongly linked nodes pull toward their target distance.",
            );
            changed |= tuning_slider(
                ui,
                &mut config.link_distance_min,
                10.0..=300.0,
                "Link distance (strong)",
                "Target distance for the strongest links.",
            );
            changed |= tuning_slider(
                ui,
                &mut config.link_distance_max,
                10.0..=400.0,
                "Link distance (weak)",
                "Target distance for the weakest links.",
            );
            changed |= tuning_slider(
                ui,
                &mut config.center_strength,
                0.0..=1.0,
                "Centering",
                "Pull of the whole layout toward the origin.",
            );
            changed |= tuning_slider(
                ui,
                &mut config.collision_radius,
                0.0..=60.0,
                "Collision radius",
                "Minimum spacing kept between node centres.",
            );
            changed |= tuning_slider(
                ui,
                &mut config.collision_strength,
                0.0..=1.0,
                "Collision strength",
                "How hard overlapping nodes are separated.",
            );
            changed |= tuning_slider(
                ui,
                &mut config.axis_strength,
                0.0..=0.3,
                "Axis pull",
                "Weak pull of every node toward the x and y axes.",
            );
            changed |= tuning_slider(
                ui,
                &mut config.velocity_decay,
                0.05..=0.95,
                "Velocity decay",
                "Fraction of velocity lost on every tick.",
            );
            config.link_distance_max = config.link_distance_max.max(config.link_distance_min);

            if ui.button("Defaults").clicked() {
                config = LayoutConfig::default();
                changed = true;
            }
            if changed {
                self.scene.engine.set_config(config);
            }
        });

        ui.separator();

        egui::CollapsingHeader::new("Highlights")
            .default_open(true)
            .show(ui, |ui| {
                if self.family_colors.is_active() {
                    ui.label(format!("{} nodes in the current exploration", self.family_colors.len()));
                    ui.horizontal_wrapped(|ui| {
                        for (fill, _) in FAMILY_PALETTE {
                            ui.label(RichText::new("●").color(fill));
                        }
                    });
                } else {
                    ui.label("No active exploration.");
                }
                let clear_button = ui.add_enabled(
                    self.family_colors.is_active(),
                    egui::Button::new("Clear highlights"),
                );
                if clear_button.clicked() {
                    requests.clear_highlights = true;
                }
            });

        ui.add_space(8.0);
        egui::CollapsingHeader::new("Legend")
            .default_open(true)
            .show(ui, |ui| {
                swatch(ui, MEMORY_COLOR, "memory");
                swatch(ui, NOTE_COLOR, "note");
                swatch(ui, TAG_COLOR, "tag");
                let categories: Vec<_> = self.scene.palette.entries().collect();
                if !categories.is_empty() {
                    ui.add_space(4.0);
                    ui.label("Categories");
                    for (category, color) in categories {
                        swatch(ui, color, category);
                    }
                }
            });
    }
}
