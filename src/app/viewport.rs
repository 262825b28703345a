use eframe::egui::{Pos2, Rect, Vec2};

use super::render_utils::{screen_to_world, world_to_screen};

pub(in crate::app) const MIN_ZOOM: f32 = 0.1;
pub(in crate::app) const MAX_ZOOM: f32 = 8.0;
const ZOOM_IN_FACTOR: f32 = 1.3;
const ZOOM_OUT_FACTOR: f32 = 0.7;
const FOCUS_ZOOM: f32 = 2.0;

/// Starting zoom for a freshly loaded graph; larger graphs start further out.
pub(in crate::app) fn initial_scale(node_count: usize) -> f32 {
    match node_count {
        count if count > 100 => 0.3,
        count if count > 50 => 0.5,
        count if count > 30 => 0.7,
        count if count > 10 => 0.85,
        _ => 1.0,
    }
}

/// Pan/zoom transform: `screen = rect.center() + pan + world * zoom`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct Viewport {
    pub(in crate::app) pan: Vec2,
    pub(in crate::app) zoom: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    pub(in crate::app) fn fitted(node_count: usize) -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: initial_scale(node_count),
        }
    }

    pub(in crate::app) fn zoom_in(&mut self) {
        self.zoom_about_center(ZOOM_IN_FACTOR);
    }

    pub(in crate::app) fn zoom_out(&mut self) {
        self.zoom_about_center(ZOOM_OUT_FACTOR);
    }

    pub(in crate::app) fn reset(&mut self) {
        *self = Self::default();
    }

    fn zoom_about_center(&mut self, factor: f32) {
        let zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.pan *= zoom / self.zoom;
        self.zoom = zoom;
    }

    /// Wheel zoom that keeps the world point under `pointer` fixed.
    pub(in crate::app) fn zoom_at(&mut self, rect: Rect, pointer: Pos2, factor: f32) {
        let world_before = self.screen_to_world(rect, pointer);
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.pan = pointer - rect.center() - (world_before * self.zoom);
    }

    pub(in crate::app) fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// Centres the viewport on `position` at the focus zoom.
    ///
    /// Returns false and leaves the transform alone when the position is unknown or
    /// not finite, which is normal for a node the layout has not placed yet.
    pub(in crate::app) fn focus_on(&mut self, position: Option<Vec2>) -> bool {
        let Some(position) = position.filter(|p| p.x.is_finite() && p.y.is_finite()) else {
            return false;
        };
        self.zoom = FOCUS_ZOOM;
        self.pan = -position * FOCUS_ZOOM;
        true
    }

    pub(in crate::app) fn world_to_screen(&self, rect: Rect, world: Vec2) -> Pos2 {
        world_to_screen(rect, self.pan, self.zoom, world)
    }

    pub(in crate::app) fn screen_to_world(&self, rect: Rect, screen: Pos2) -> Vec2 {
        screen_to_world(rect, self.pan, self.zoom, screen)
    }
}
