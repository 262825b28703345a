use eframe::egui::{Color32, Painter, Pos2, Rect, Vec2, pos2};

pub(super) const CANVAS_COLOR: Color32 = Color32::from_rgb(17, 16, 27);
pub(super) const UNHIGHLIGHTED_COLOR: Color32 = Color32::from_rgb(0x4B, 0x55, 0x63);

pub(super) fn world_to_screen(rect: Rect, pan: Vec2, zoom: f32, world: Vec2) -> Pos2 {
    rect.center() + pan + world * zoom
}

pub(super) fn screen_to_world(rect: Rect, pan: Vec2, zoom: f32, screen: Pos2) -> Vec2 {
    (screen - rect.center() - pan) / zoom
}

pub(super) fn with_alpha(color: Color32, alpha: f32) -> Color32 {
    let alpha = (alpha.clamp(0.0, 1.0) * 255.0) as u8;
    Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), alpha)
}

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| ((a as f32) * (1.0 - amount) + (b as f32) * amount) as u8;
    Color32::from_rgb(
        mix(base.r(), overlay.r()),
        mix(base.g(), overlay.g()),
        mix(base.b(), overlay.b()),
    )
}

/// Dotted grid that moves with the pan and spreads with the zoom.
pub(super) fn draw_background(painter: &Painter, rect: Rect, pan: Vec2, zoom: f32) {
    painter.rect_filled(rect, 0.0, CANVAS_COLOR);

    let step = (48.0 * zoom.clamp(0.5, 2.0)).max(18.0);
    let origin = rect.center() + pan;
    let dot = Color32::from_rgba_unmultiplied(120, 110, 160, 40);

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
        while y < rect.bottom() {
            painter.circle_filled(pos2(x, y), 1.0, dot);
            y += step;
        }
        x += step;
    }
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    rect.expand(radius).contains(position)
}

/// Conservative test: the segment's bounding box overlaps the padded rect.
pub(super) fn edge_visible(rect: Rect, start: Pos2, end: Pos2, padding: f32) -> bool {
    Rect::from_two_pos(start, end).intersects(rect.expand(padding))
}
