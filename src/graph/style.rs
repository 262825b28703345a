use std::collections::HashMap;

use eframe::egui::Color32;

pub const MEMORY_COLOR: Color32 = Color32::from_rgb(0x8B, 0x5C, 0xF6);
pub const NOTE_COLOR: Color32 = Color32::from_rgb(0x3B, 0x82, 0xF6);
pub const TAG_COLOR: Color32 = Color32::from_rgb(0x10, 0xB9, 0x81);
pub const EDGE_STRONG_COLOR: Color32 = Color32::from_rgb(0xA8, 0x55, 0xF7);
pub const EDGE_WEAK_COLOR: Color32 = Color32::from_rgb(0x93, 0x33, 0xEA);
pub const NEW_NODE_COLOR: Color32 = Color32::from_rgb(0xFF, 0xD7, 0x00);

const CATEGORY_COLORS: [Color32; 12] = [
    Color32::from_rgb(0x8B, 0x5C, 0xF6),
    Color32::from_rgb(0x3B, 0x82, 0xF6),
    Color32::from_rgb(0x10, 0xB9, 0x81),
    Color32::from_rgb(0xF5, 0x9E, 0x0B),
    Color32::from_rgb(0xEF, 0x44, 0x44),
    Color32::from_rgb(0xEC, 0x48, 0x99),
    Color32::from_rgb(0x8B, 0x5C, 0xF6),
    Color32::from_rgb(0x06, 0xB6, 0xD4),
    Color32::from_rgb(0x84, 0xCC, 0x16),
    Color32::from_rgb(0xF9, 0x73, 0x16),
    Color32::from_rgb(0x63, 0x66, 0xF1),
    Color32::from_rgb(0x14, 0xB8, 0xA6),
];

pub fn node_size(kind: &str) -> f32 {
    match kind {
        "note" => 10.0,
        "tag" => 6.0,
        _ => 8.0,
    }
}

fn kind_color(kind: &str) -> Color32 {
    match kind {
        "note" => NOTE_COLOR,
        "tag" => TAG_COLOR,
        _ => MEMORY_COLOR,
    }
}

pub fn edge_color(weight: f32) -> Color32 {
    let base = if weight > 0.5 {
        EDGE_STRONG_COLOR
    } else {
        EDGE_WEAK_COLOR
    };
    base.gamma_multiply(0.4 + (weight * 0.3))
}

pub fn edge_width(weight: f32) -> f32 {
    0.5 + (weight * 1.5)
}

/// Category to colour assignments in first-seen order.
#[derive(Clone, Debug, Default)]
pub struct CategoryPalette {
    colors: HashMap<String, Color32>,
    order: Vec<String>,
}

impl CategoryPalette {
    pub fn from_categories<'a>(categories: impl IntoIterator<Item = &'a str>) -> Self {
        let mut palette = Self::default();
        for category in categories {
            palette.register(category);
        }
        palette
    }

    pub fn register(&mut self, category: &str) -> Color32 {
        if let Some(color) = self.colors.get(category) {
            return *color;
        }

        let color = CATEGORY_COLORS[self.order.len() % CATEGORY_COLORS.len()];
        self.colors.insert(category.to_owned(), color);
        self.order.push(category.to_owned());
        color
    }

    pub fn node_color(&self, kind: &str, category: Option<&str>) -> Color32 {
        category
            .and_then(|category| self.colors.get(category).copied())
            .unwrap_or_else(|| kind_color(kind))
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, Color32)> {
        self.order
            .iter()
            .filter_map(|name| self.colors.get(name).map(|color| (name.as_str(), *color)))
    }
}
