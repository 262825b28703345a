mod forces;
mod quadtree;

use std::collections::HashMap;

use eframe::egui::{Vec2, vec2};
use tracing::debug;

use crate::graph::GraphSnapshot;
use crate::util::stable_pair;
use forces::{
    CollisionParams, Link, accumulate_charge, accumulate_collision_pairs, apply_links,
};
use quadtree::Quad;

const BARNES_HUT_THETA: f32 = 0.9;
pub(in crate::app) const ALPHA_MIN: f32 = 0.001;
const INITIAL_RADIUS: f32 = 10.0;
const INSERT_JITTER: f32 = 30.0;

/// d3 cools alpha from 1 to `ALPHA_MIN` in roughly 300 ticks.
fn alpha_decay() -> f32 {
    1.0 - ALPHA_MIN.powf(1.0 / 300.0)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct LayoutConfig {
    pub(in crate::app) link_distance_min: f32,
    pub(in crate::app) link_distance_max: f32,
    pub(in crate::app) link_strength: f32,
    pub(in crate::app) charge_strength: f32,
    pub(in crate::app) center_strength: f32,
    pub(in crate::app) collision_radius: f32,
    pub(in crate::app) collision_strength: f32,
    pub(in crate::app) axis_strength: f32,
    pub(in crate::app) velocity_decay: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            link_distance_min: 80.0,
            link_distance_max: 120.0,
            link_strength: 1.0,
            charge_strength: -80.0,
            center_strength: 0.15,
            collision_radius: 20.0,
            collision_strength: 0.7,
            axis_strength: 0.05,
            velocity_decay: 0.4,
        }
    }
}

impl LayoutConfig {
    /// Rest length for a link; similar notes sit closer together.
    pub(in crate::app) fn link_distance(&self, weight: f32) -> f32 {
        let weight = weight.clamp(0.0, 1.0);
        self.link_distance_min + (1.0 - weight) * (self.link_distance_max - self.link_distance_min)
    }
}

struct Body {
    id: String,
    position: Option<Vec2>,
    velocity: Vec2,
    pin: Option<Vec2>,
}

impl Body {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_owned(),
            position: None,
            velocity: Vec2::ZERO,
            pin: None,
        }
    }
}

#[derive(Default)]
struct Scratch {
    positions: Vec<Vec2>,
    velocities: Vec<Vec2>,
    pushes: Vec<Vec2>,
}

/// Force-directed layout over the nodes of a [`GraphSnapshot`].
///
/// Bodies are index-aligned with the snapshot. A body has no position until the first
/// tick after it was added, so callers must treat `position_of` returning `None` as
/// "not placed yet".
pub(in crate::app) struct LayoutEngine {
    generation: u64,
    config: LayoutConfig,
    bodies: Vec<Body>,
    index_by_id: HashMap<String, usize>,
    links: Vec<Link>,
    alpha: f32,
    alpha_target: f32,
    running: bool,
    scratch: Scratch,
}

impl LayoutEngine {
    pub(in crate::app) fn new(snapshot: &GraphSnapshot, config: LayoutConfig, generation: u64) -> Self {
        let mut engine = Self {
            generation,
            config,
            bodies: Vec::new(),
            index_by_id: HashMap::new(),
            links: Vec::new(),
            alpha: 1.0,
            alpha_target: 0.0,
            running: true,
            scratch: Scratch::default(),
        };
        engine.sync(snapshot);
        engine
    }

    pub(in crate::app) fn generation(&self) -> u64 {
        self.generation
    }

    pub(in crate::app) fn config(&self) -> LayoutConfig {
        self.config
    }

    pub(in crate::app) fn set_config(&mut self, config: LayoutConfig) {
        if config == self.config {
            return;
        }
        let distances_changed = config.link_distance_min != self.config.link_distance_min
            || config.link_distance_max != self.config.link_distance_max;
        self.config = config;
        if distances_changed {
            for link in &mut self.links {
                link.distance = config.link_distance(link.weight);
            }
        }
        self.restart(self.alpha.max(0.3));
    }

    /// Reconciles bodies with `snapshot`: new ids get an unplaced body, existing ids keep
    /// their position and velocity, vanished ids are dropped. Links are rebuilt.
    ///
    /// Returns how many bodies entered. Any change reheats the layout to full energy.
    pub(in crate::app) fn sync(&mut self, snapshot: &GraphSnapshot) -> usize {
        let mut previous = std::mem::take(&mut self.bodies)
            .into_iter()
            .map(|body| (body.id.clone(), body))
            .collect::<HashMap<_, _>>();
        let exited = previous
            .keys()
            .filter(|id| !snapshot.contains(id))
            .count();

        let mut entered = 0;
        self.index_by_id.clear();
        for node in snapshot.nodes() {
            let body = previous.remove(&node.id).unwrap_or_else(|| {
                entered += 1;
                Body::new(&node.id)
            });
            self.index_by_id.insert(node.id.clone(), self.bodies.len());
            self.bodies.push(body);
        }

        let mut degree = vec![0usize; self.bodies.len()];
        let mut endpoints = Vec::with_capacity(snapshot.edge_count());
        for edge in snapshot.edges() {
            let (Some(&source), Some(&target)) = (
                self.index_by_id.get(&edge.source),
                self.index_by_id.get(&edge.target),
            ) else {
                continue;
            };
            if source == target {
                continue;
            }
            degree[source] += 1;
            degree[target] += 1;
            endpoints.push((source, target, edge.weight));
        }
        let links_changed = endpoints.len() != self.links.len();
        self.links = endpoints
            .into_iter()
            .map(|(source, target, weight)| Link {
                source,
                target,
                distance: self.config.link_distance(weight),
                weight,
                bias: degree[source] as f32 / (degree[source] + degree[target]) as f32,
            })
            .collect();

        if entered > 0 || exited > 0 || links_changed {
            debug!(
                generation = self.generation,
                entered,
                exited,
                links = self.links.len(),
                "layout reheated"
            );
            self.restart(1.0);
        }
        entered
    }

    /// Position of `id` if it has been placed and is finite.
    pub(in crate::app) fn position_of(&self, id: &str) -> Option<Vec2> {
        let index = *self.index_by_id.get(id)?;
        self.position_at(index)
    }

    pub(in crate::app) fn position_at(&self, index: usize) -> Option<Vec2> {
        self.bodies
            .get(index)?
            .position
            .filter(|position| position.x.is_finite() && position.y.is_finite())
    }

    /// True while some body still waits for its first tick.
    pub(in crate::app) fn has_unplaced(&self) -> bool {
        self.bodies.iter().any(|body| body.position.is_none())
    }

    pub(in crate::app) fn alpha(&self) -> f32 {
        self.alpha
    }

    pub(in crate::app) fn is_settled(&self) -> bool {
        !self.running
    }

    pub(in crate::app) fn stop(&mut self) {
        self.running = false;
    }

    pub(in crate::app) fn restart(&mut self, alpha: f32) {
        self.alpha = alpha.clamp(0.0, 1.0);
        self.running = true;
    }

    pub(in crate::app) fn set_alpha_target(&mut self, target: f32) {
        self.alpha_target = target.clamp(0.0, 1.0);
        if self.alpha_target > 0.0 {
            self.running = true;
        }
    }

    pub(in crate::app) fn pin(&mut self, id: &str, position: Vec2) -> bool {
        let Some(body) = self.index_by_id.get(id).map(|&index| &mut self.bodies[index]) else {
            return false;
        };
        body.pin = Some(position);
        body.position = Some(position);
        body.velocity = Vec2::ZERO;
        true
    }

    pub(in crate::app) fn unpin(&mut self, id: &str) {
        if let Some(&index) = self.index_by_id.get(id) {
            self.bodies[index].pin = None;
        }
    }

    pub(in crate::app) fn begin_drag(&mut self, id: &str) -> bool {
        let Some(position) = self.position_of(id) else {
            return false;
        };
        self.set_alpha_target(0.3);
        self.pin(id, position)
    }

    pub(in crate::app) fn drag_to(&mut self, id: &str, position: Vec2) {
        self.pin(id, position);
    }

    pub(in crate::app) fn end_drag(&mut self, id: &str) {
        self.set_alpha_target(0.0);
        self.unpin(id);
    }

    /// Advances one tick if running. Returns true when positions moved.
    pub(in crate::app) fn step(&mut self) -> bool {
        if !self.running {
            return false;
        }

        self.tick();
        if self.alpha < ALPHA_MIN && self.alpha_target <= 0.0 {
            self.running = false;
            debug!(generation = self.generation, "layout settled");
        }
        true
    }

    fn tick(&mut self) {
        self.place_unplaced();
        self.alpha += (self.alpha_target - self.alpha) * alpha_decay();

        let config = self.config;
        let alpha = self.alpha;
        let count = self.bodies.len();
        let Scratch {
            positions,
            velocities,
            pushes,
        } = &mut self.scratch;
        positions.clear();
        velocities.clear();
        for body in &self.bodies {
            positions.push(body.position.unwrap_or(Vec2::ZERO));
            velocities.push(body.velocity);
        }

        apply_links(&self.links, config.link_strength, alpha, positions, velocities);

        if count > 1
            && let Some(quad) = Quad::build(positions)
        {
            for (index, velocity) in velocities.iter_mut().enumerate() {
                accumulate_charge(
                    &quad,
                    index,
                    positions,
                    config.charge_strength,
                    BARNES_HUT_THETA,
                    alpha,
                    velocity,
                );
            }
        }

        if count > 0 {
            let mean = positions
                .iter()
                .fold(Vec2::ZERO, |sum, position| sum + *position)
                / count as f32;
            let shift = mean * config.center_strength;
            for position in positions.iter_mut() {
                *position -= shift;
            }
        }

        if count > 1 {
            let predicted = positions
                .iter()
                .zip(velocities.iter())
                .map(|(position, velocity)| *position + *velocity)
                .collect::<Vec<_>>();
            if let Some(quad) = Quad::build(&predicted) {
                pushes.clear();
                pushes.resize(count, Vec2::ZERO);
                accumulate_collision_pairs(
                    &quad,
                    &quad,
                    true,
                    &predicted,
                    CollisionParams {
                        radius: config.collision_radius,
                        strength: config.collision_strength,
                    },
                    pushes,
                );
                for (velocity, push) in velocities.iter_mut().zip(pushes.iter()) {
                    *velocity += *push;
                }
            }
        }

        for (position, velocity) in positions.iter().zip(velocities.iter_mut()) {
            *velocity -= *position * (config.axis_strength * alpha);
        }

        let retain = 1.0 - config.velocity_decay;
        for (index, body) in self.bodies.iter_mut().enumerate() {
            if let Some(pin) = body.pin {
                body.position = Some(pin);
                body.velocity = Vec2::ZERO;
                continue;
            }
            let velocity = velocities[index] * retain;
            let position = positions[index] + velocity;
            if position.x.is_finite() && position.y.is_finite() {
                body.position = Some(position);
                body.velocity = velocity;
            } else {
                body.position = None;
                body.velocity = Vec2::ZERO;
            }
        }
    }

    /// Seeds bodies without a position. Only positions that existed before this pass
    /// are used as anchors, so a cold start lays everything out on the spiral.
    fn place_unplaced(&mut self) {
        let unplaced = self
            .bodies
            .iter()
            .enumerate()
            .filter(|(_, body)| body.position.is_none())
            .map(|(index, _)| index)
            .collect::<Vec<_>>();
        if unplaced.is_empty() {
            return;
        }

        let seeds = unplaced
            .iter()
            .map(|&index| {
                let body = &self.bodies[index];
                let seed = body
                    .pin
                    .or_else(|| self.near_placed_neighbours(index))
                    .unwrap_or_else(|| phyllotaxis(index));
                (index, seed)
            })
            .collect::<Vec<_>>();

        for (index, seed) in seeds {
            let body = &mut self.bodies[index];
            body.position = Some(seed);
            body.velocity = Vec2::ZERO;
        }
    }

    fn near_placed_neighbours(&self, index: usize) -> Option<Vec2> {
        let (sum, count) = self
            .links
            .iter()
            .filter_map(|link| {
                if link.source == index {
                    Some(link.target)
                } else if link.target == index {
                    Some(link.source)
                } else {
                    None
                }
            })
            .filter_map(|neighbour| self.position_at(neighbour))
            .fold((Vec2::ZERO, 0usize), |(sum, count), position| (sum + position, count + 1));
        if count == 0 {
            return None;
        }

        let (jitter_x, jitter_y) = stable_pair(&self.bodies[index].id);
        Some(sum / count as f32 + vec2(jitter_x, jitter_y) * INSERT_JITTER)
    }
}

fn phyllotaxis(index: usize) -> Vec2 {
    let radius = INITIAL_RADIUS * (0.5 + index as f32).sqrt();
    let angle = index as f32 * std::f32::consts::PI * (3.0 - 5.0_f32.sqrt());
    vec2(radius * angle.cos(), radius * angle.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::{edge, node};

    fn settle(engine: &mut LayoutEngine, ticks: usize) {
        for _ in 0..ticks {
            engine.step();
        }
    }

    #[test]
    fn positions_are_undefined_until_the_first_tick() {
        let snapshot = GraphSnapshot::new(vec![node("A"), node("B")], vec![edge("A", "B", 0.5)]);
        let mut engine = LayoutEngine::new(&snapshot, LayoutConfig::default(), 1);

        assert_eq!(engine.position_of("A"), None);
        assert!(engine.step());
        assert!(engine.position_of("A").is_some());
        assert!(engine.position_of("B").is_some());
        assert_eq!(engine.position_of("missing"), None);
    }

    #[test]
    fn link_distance_shrinks_with_similarity() {
        let config = LayoutConfig::default();
        assert_eq!(config.link_distance(1.0), 80.0);
        assert_eq!(config.link_distance(0.0), 120.0);
        assert_eq!(config.link_distance(0.5), 100.0);
    }

    #[test]
    fn similar_pairs_end_up_closer_than_dissimilar_ones() {
        let snapshot = GraphSnapshot::new(
            vec![node("A"), node("B"), node("C"), node("D")],
            vec![edge("A", "B", 1.0), edge("C", "D", 0.0)],
        );
        let mut engine = LayoutEngine::new(&snapshot, LayoutConfig::default(), 1);
        settle(&mut engine, 400);

        let distance = |a: &str, b: &str| {
            (engine.position_of(a).unwrap() - engine.position_of(b).unwrap()).length()
        };
        assert!(distance("A", "B") < distance("C", "D"));
    }

    #[test]
    fn cools_down_and_reports_settled() {
        let snapshot = GraphSnapshot::new(vec![node("A"), node("B"), node("C")], Vec::new());
        let mut engine = LayoutEngine::new(&snapshot, LayoutConfig::default(), 1);
        settle(&mut engine, 400);

        assert!(engine.is_settled());
        assert!(!engine.step());
    }

    #[test]
    fn appending_reheats_without_moving_existing_bodies() {
        let mut snapshot = GraphSnapshot::new(vec![node("A"), node("B")], vec![edge("A", "B", 0.8)]);
        let mut engine = LayoutEngine::new(&snapshot, LayoutConfig::default(), 1);
        settle(&mut engine, 400);
        let before = engine.position_of("A");

        snapshot.add_node(node("N1"), vec![edge("N1", "A", 0.9)]);
        assert_eq!(engine.sync(&snapshot), 1);

        assert_eq!(engine.position_of("A"), before);
        assert_eq!(engine.position_of("N1"), None);
        assert!(engine.has_unplaced());
        assert!(!engine.is_settled());
        assert_eq!(engine.alpha(), 1.0);

        engine.step();
        let placed = engine.position_of("N1").unwrap();
        assert!((placed - before.unwrap()).length() < 200.0);
    }

    #[test]
    fn pinned_bodies_hold_their_position() {
        let snapshot = GraphSnapshot::new(vec![node("A"), node("B")], vec![edge("A", "B", 0.2)]);
        let mut engine = LayoutEngine::new(&snapshot, LayoutConfig::default(), 1);
        engine.step();

        assert!(engine.pin("A", vec2(250.0, -40.0)));
        settle(&mut engine, 50);
        assert_eq!(engine.position_of("A"), Some(vec2(250.0, -40.0)));

        engine.unpin("A");
        engine.restart(0.5);
        engine.step();
        assert_ne!(engine.position_of("A"), Some(vec2(250.0, -40.0)));
        assert!(!engine.pin("missing", Vec2::ZERO));
    }

    #[test]
    fn drag_keeps_the_layout_warm_until_release() {
        let snapshot = GraphSnapshot::new(vec![node("A"), node("B")], Vec::new());
        let mut engine = LayoutEngine::new(&snapshot, LayoutConfig::default(), 1);
        settle(&mut engine, 400);
        assert!(engine.is_settled());

        assert!(engine.begin_drag("A"));
        engine.drag_to("A", vec2(10.0, 10.0));
        settle(&mut engine, 400);
        assert!(!engine.is_settled());
        assert_eq!(engine.position_of("A"), Some(vec2(10.0, 10.0)));

        engine.end_drag("A");
        settle(&mut engine, 2000);
        assert!(engine.is_settled());
    }
}
