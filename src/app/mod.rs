use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use eframe::egui::{self, Context, Pos2};
use tracing::{info, warn};

use crate::events::GraphEvent;
use crate::rag::{ExplorationState, GraphSource, LoadedGraph, fetch_graph};

mod graph;
mod highlight;
mod insertion;
mod labels;
mod physics;
mod render_utils;
mod ui;
mod viewport;

use self::graph::GraphScene;
use self::highlight::FamilyColors;
use self::insertion::InsertionCoordinator;
use self::labels::LabelMode;
use self::physics::LayoutConfig;

type LoadResult = Result<LoadedGraph, String>;

pub struct MemoryGraphApp {
    source: GraphSource,
    state: AppState,
    reload_rx: Option<Receiver<LoadResult>>,
    events: Receiver<GraphEvent>,
    exploration: ExplorationState,
    layout_config: LayoutConfig,
    next_generation: u64,
}

enum AppState {
    Loading { rx: Receiver<LoadResult> },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    scene: GraphScene,
    insertions: InsertionCoordinator,
    family_colors: FamilyColors,
    label_mode: LabelMode,
    live_physics: bool,
    search: String,
    category_filter: Option<String>,
    dragging: Option<String>,
    view_scratch: ViewScratch,
}

#[derive(Default)]
struct ViewScratch {
    screen_positions: Vec<Option<Pos2>>,
    screen_radii: Vec<f32>,
}

/// Actions the panels ask the app shell to perform after the frame.
#[derive(Default)]
struct ViewRequests {
    reload: bool,
    clear_highlights: bool,
}

impl MemoryGraphApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        source: GraphSource,
        events: Receiver<GraphEvent>,
    ) -> Self {
        let state = Self::start_load(source.clone());
        Self {
            source,
            state,
            reload_rx: None,
            events,
            exploration: ExplorationState::default(),
            layout_config: LayoutConfig::default(),
            next_generation: 1,
        }
    }

    fn spawn_load(source: GraphSource) -> Receiver<LoadResult> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            info!(source = %source.describe(), "loading memory graph");
            let result = fetch_graph(&source).map_err(|error| {
                warn!("graph load failed: {error:#}");
                format!("{error:#}")
            });
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(source: GraphSource) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(source),
        }
    }

    /// Stops whatever the current view still has running before it is replaced.
    fn teardown_current(&mut self) {
        if let AppState::Ready(model) = &mut self.state {
            self.layout_config = model.scene.engine.config();
            model.teardown();
        }
    }

    fn finish_load(&mut self, result: LoadResult) -> AppState {
        self.teardown_current();
        match result {
            Ok(loaded) => {
                let generation = self.next_generation;
                self.next_generation += 1;
                AppState::Ready(Box::new(ViewModel::new(
                    loaded,
                    self.layout_config,
                    generation,
                    &self.exploration,
                )))
            }
            Err(error) => AppState::Error(error),
        }
    }
}

impl eframe::App for MemoryGraphApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let now = ctx.input(|input| input.time);
        let mut arrived = None;
        let mut restart = false;

        match &mut self.state {
            AppState::Loading { rx } => {
                if let Ok(result) = rx.try_recv() {
                    arrived = Some(result);
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading memory graph...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load the memory graph");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        restart = true;
                    }
                });
            }
            AppState::Ready(model) => {
                for event in self.events.try_iter() {
                    model.handle_event(event, &mut self.exploration, now);
                }
                model.tick(now, &self.exploration);

                let mut requests = ViewRequests::default();
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &self.source.describe(), &mut requests, is_reloading);

                if requests.clear_highlights {
                    self.exploration.clear();
                    ctx.request_repaint();
                }
                if requests.reload && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(self.source.clone()));
                }
                if let Some(deadline) = model.next_deadline() {
                    ctx.request_repaint_after(Duration::from_secs_f64((deadline - now).max(0.0)));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(result) => arrived = Some(result),
                        Err(TryRecvError::Empty) => self.reload_rx = Some(rx),
                        Err(TryRecvError::Disconnected) => {
                            arrived = Some(Err("Background load worker disconnected".to_owned()));
                        }
                    }
                }
            }
        }

        let next_state = if let Some(result) = arrived {
            Some(self.finish_load(result))
        } else if restart {
            Some(Self::start_load(self.source.clone()))
        } else {
            None
        };
        if let Some(next_state) = next_state {
            self.reload_rx = None;
            self.state = next_state;
            ctx.request_repaint();
        }
    }
}

impl ViewModel {
    fn handle_event(&mut self, event: GraphEvent, exploration: &mut ExplorationState, now: f64) {
        match event {
            GraphEvent::Insert(request) => {
                self.insertions.submit(&mut self.scene, request, now);
            }
            GraphEvent::Chat(event) => {
                exploration.apply(event);
            }
            GraphEvent::ClearHighlights => exploration.clear(),
        }
    }

    /// Time-driven work that must run every frame, before anything is drawn.
    fn tick(&mut self, now: f64, exploration: &ExplorationState) {
        self.scene.advance(now);
        self.insertions.poll(&mut self.scene, now);
        self.family_colors.sync(exploration);
    }

    fn next_deadline(&self) -> Option<f64> {
        match (self.insertions.next_deadline(), self.scene.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn teardown(&mut self) {
        self.insertions.cancel_all();
        self.scene.teardown();
        self.dragging = None;
        std::mem::take(&mut self.family_colors).dispose();
    }
}
