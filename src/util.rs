use std::borrow::Cow;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub const LABEL_CHAR_BUDGET: usize = 15;

pub fn stable_pair(id: &str) -> (f32, f32) {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    let hash = hasher.finish();

    let x = ((hash & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    let y = (((hash >> 32) & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    ((x * 2.0) - 1.0, (y * 2.0) - 1.0)
}

/// Cuts `label` to the label character budget, appending `...` when anything was dropped.
pub fn truncate_label(label: &str) -> Cow<'_, str> {
    match label.char_indices().nth(LABEL_CHAR_BUDGET) {
        Some((cut, _)) => Cow::Owned(format!("{}...", &label[..cut])),
        None => Cow::Borrowed(label),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_labels_are_borrowed_untouched() {
        assert_eq!(truncate_label("groceries"), "groceries");
        assert!(matches!(truncate_label("exactly fifteen"), Cow::Borrowed(_)));
    }

    #[test]
    fn long_labels_are_cut_on_char_boundaries() {
        assert_eq!(truncate_label("a memory about the trip"), "a memory about ...");
        let accented = "ñ".repeat(17);
        assert_eq!(truncate_label(&accented), format!("{}...", "ñ".repeat(15)));
    }

    #[test]
    fn stable_pair_is_deterministic_and_bounded() {
        let (x, y) = stable_pair("42");
        assert_eq!((x, y), stable_pair("42"));
        assert!((-1.0..=1.0).contains(&x));
        assert!((-1.0..=1.0).contains(&y));
    }
}
