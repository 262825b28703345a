use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use eframe::egui::Color32;
use tracing::{debug, warn};

use crate::rag::{ExplorationState, NodeFamily};

mod chain;

use self::chain::resolve_parent_color;

/// Fill and stroke pairs handed out to search roots, in order.
pub(in crate::app) const FAMILY_PALETTE: [(Color32, Color32); 8] = [
    (Color32::from_rgb(0x10, 0xB9, 0x81), Color32::from_rgb(0x34, 0xD3, 0x99)),
    (Color32::from_rgb(0x3B, 0x82, 0xF6), Color32::from_rgb(0x60, 0xA5, 0xFA)),
    (Color32::from_rgb(0xF5, 0x9E, 0x0B), Color32::from_rgb(0xFB, 0xBF, 0x24)),
    (Color32::from_rgb(0xEF, 0x44, 0x44), Color32::from_rgb(0xF8, 0x71, 0x71)),
    (Color32::from_rgb(0x8B, 0x5C, 0xF6), Color32::from_rgb(0xA7, 0x8B, 0xFA)),
    (Color32::from_rgb(0xEC, 0x48, 0x99), Color32::from_rgb(0xF4, 0x72, 0xB6)),
    (Color32::from_rgb(0x14, 0xB8, 0xA6), Color32::from_rgb(0x2D, 0xD4, 0xBF)),
    (Color32::from_rgb(0xF9, 0x73, 0x16), Color32::from_rgb(0xFB, 0x92, 0x3C)),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub(in crate::app) struct ColorRecord {
    pub(in crate::app) fill: Color32,
    pub(in crate::app) stroke: Color32,
    pub(in crate::app) palette_index: usize,
}

pub(in crate::app) fn palette_record(index: usize) -> ColorRecord {
    let palette_index = index % FAMILY_PALETTE.len();
    let (fill, stroke) = FAMILY_PALETTE[palette_index];
    ColorRecord {
        fill,
        stroke,
        palette_index,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum Emphasis {
    Root,
    Parent,
    Leaf,
}

impl Emphasis {
    pub(in crate::app) fn radius_scale(self) -> f32 {
        match self {
            Self::Root => 1.8,
            Self::Parent => 1.45,
            Self::Leaf => 1.2,
        }
    }

    pub(in crate::app) fn stroke_width(self) -> f32 {
        match self {
            Self::Root => 3.0,
            Self::Parent => 2.0,
            Self::Leaf => 1.2,
        }
    }
}

/// Colour cache for one highlight session of a chat-driven exploration.
///
/// Roots take palette colours by position; every neighbour shares the record of the
/// parent it was expanded from, so a whole chain of expansions reads as one colour.
/// Once assigned, a node keeps its record until the session ends.
#[derive(Default)]
pub(in crate::app) struct FamilyColors {
    color_of: HashMap<String, Rc<ColorRecord>>,
    roots: HashSet<String>,
    parents: HashSet<String>,
    applied_revision: Option<u64>,
}

impl FamilyColors {
    pub(in crate::app) fn create() -> Self {
        Self::default()
    }

    /// Re-runs the assignment when `state` changed since the last call.
    pub(in crate::app) fn sync(&mut self, state: &ExplorationState) -> bool {
        if self.applied_revision == Some(state.revision()) {
            return false;
        }
        self.applied_revision = Some(state.revision());
        self.update(&state.root_ids, &state.families, &state.highlighted_ids);
        true
    }

    pub(in crate::app) fn update(
        &mut self,
        root_ids: &[String],
        families: &[NodeFamily],
        highlighted_ids: &[String],
    ) {
        if highlighted_ids.is_empty() {
            self.clear();
            return;
        }

        for (index, root) in root_ids.iter().enumerate() {
            self.color_of
                .entry(root.clone())
                .or_insert_with(|| Rc::new(palette_record(index)));
        }

        for family in families {
            let color = match resolve_parent_color(
                &family.parent_id,
                families,
                &mut self.color_of,
                &mut HashSet::new(),
            ) {
                Some(color) => color,
                None => {
                    let color = Rc::new(palette_record(self.first_unused_slot()));
                    warn!(
                        parent = %family.parent_id,
                        palette_index = color.palette_index,
                        "expansion parent has no coloured ancestor, using a fallback colour"
                    );
                    self.color_of
                        .insert(family.parent_id.clone(), Rc::clone(&color));
                    color
                }
            };

            for neighbor in &family.neighbor_ids {
                self.color_of
                    .entry(neighbor.clone())
                    .or_insert_with(|| Rc::clone(&color));
            }
        }

        self.roots = root_ids.iter().cloned().collect();
        self.parents = families
            .iter()
            .map(|family| family.parent_id.clone())
            .filter(|id| !self.roots.contains(id))
            .collect();
        debug!(
            coloured = self.color_of.len(),
            roots = self.roots.len(),
            families = families.len(),
            "family colours updated"
        );
    }

    pub(in crate::app) fn clear(&mut self) {
        self.color_of.clear();
        self.roots.clear();
        self.parents.clear();
    }

    /// Ends the session for good; the cache is dropped with it.
    pub(in crate::app) fn dispose(mut self) {
        self.clear();
    }

    pub(in crate::app) fn is_active(&self) -> bool {
        !self.color_of.is_empty()
    }

    pub(in crate::app) fn len(&self) -> usize {
        self.color_of.len()
    }

    pub(in crate::app) fn color_of(&self, id: &str) -> Option<&ColorRecord> {
        self.color_of.get(id).map(Rc::as_ref)
    }

    pub(in crate::app) fn emphasis(&self, id: &str) -> Option<Emphasis> {
        if !self.color_of.contains_key(id) {
            return None;
        }
        Some(if self.roots.contains(id) {
            Emphasis::Root
        } else if self.parents.contains(id) {
            Emphasis::Parent
        } else {
            Emphasis::Leaf
        })
    }

    /// Colour for an edge whose two ends belong to the same family chain.
    pub(in crate::app) fn edge_color(&self, a: &str, b: &str) -> Option<&ColorRecord> {
        let first = self.color_of(a)?;
        let second = self.color_of(b)?;
        (first.fill == second.fill).then_some(first)
    }

    fn first_unused_slot(&self) -> usize {
        let used = self
            .color_of
            .values()
            .map(|record| record.palette_index)
            .collect::<HashSet<_>>();
        (0..FAMILY_PALETTE.len())
            .find(|slot| !used.contains(slot))
            .unwrap_or(self.color_of.len() % FAMILY_PALETTE.len())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|id| (*id).to_owned()).collect()
    }

    fn family(parent: &str, neighbors: &[&str]) -> NodeFamily {
        NodeFamily {
            parent_id: parent.to_owned(),
            neighbor_ids: ids(neighbors),
        }
    }

    impl FamilyColors {
        fn shares_record(&self, a: &str, b: &str) -> bool {
            match (self.color_of.get(a), self.color_of.get(b)) {
                (Some(a), Some(b)) => Rc::ptr_eq(a, b),
                _ => false,
            }
        }
    }

    fn highlighted(roots: &[String], families: &[NodeFamily]) -> Vec<String> {
        roots
            .iter()
            .chain(families.iter().flat_map(|family| family.neighbor_ids.iter()))
            .cloned()
            .collect()
    }

    #[test]
    fn roots_take_palette_colours_in_order() {
        let roots = ids(&["10", "20", "30"]);
        let mut colors = FamilyColors::create();
        colors.update(&roots, &[], &roots);

        for (index, id) in roots.iter().enumerate() {
            assert_eq!(colors.color_of(id), Some(&palette_record(index)));
            assert_eq!(colors.emphasis(id), Some(Emphasis::Root));
        }
    }

    #[test]
    fn neighbours_share_the_parent_record_through_chains() {
        let roots = ids(&["10", "20", "30"]);
        let mut families = vec![family("10", &["11", "12"])];
        let mut colors = FamilyColors::create();
        colors.update(&roots, &families, &highlighted(&roots, &families));

        assert!(colors.shares_record("10", "11"));
        assert!(colors.shares_record("10", "12"));

        families.push(family("11", &["13"]));
        colors.update(&roots, &families, &highlighted(&roots, &families));

        assert!(colors.shares_record("13", "10"));
        assert_eq!(colors.emphasis("11"), Some(Emphasis::Parent));
        assert_eq!(colors.emphasis("13"), Some(Emphasis::Leaf));
        assert_eq!(colors.emphasis("99"), None);
    }

    #[test]
    fn edges_are_coloured_only_within_one_family() {
        let roots = ids(&["10", "20"]);
        let families = vec![family("10", &["11"]), family("20", &["21"])];
        let mut colors = FamilyColors::create();
        colors.update(&roots, &families, &highlighted(&roots, &families));

        assert_eq!(colors.edge_color("10", "11"), Some(&palette_record(0)));
        assert_eq!(colors.edge_color("11", "21"), None);
        assert_eq!(colors.edge_color("10", "unrelated"), None);
    }

    #[test]
    fn orphan_parents_get_the_first_free_slot() {
        let roots = ids(&["10", "20", "30"]);
        let families = vec![family("77", &["78"])];
        let mut colors = FamilyColors::create();
        colors.update(&roots, &families, &highlighted(&roots, &families));

        assert_eq!(colors.color_of("77").map(|c| c.palette_index), Some(3));
        assert!(colors.shares_record("77", "78"));
    }

    #[test]
    fn looping_families_terminate_with_a_fallback() {
        let families = vec![family("x", &["y"]), family("y", &["x"])];
        let mut colors = FamilyColors::create();
        colors.update(&[], &families, &ids(&["x", "y"]));

        assert!(colors.shares_record("x", "y"));
        assert_eq!(colors.len(), 2);
    }

    #[test]
    fn empty_highlight_set_ends_the_session() {
        let roots = ids(&["1", "2"]);
        let mut colors = FamilyColors::create();
        colors.update(&roots, &[family("1", &["3"])], &ids(&["1", "2", "3"]));
        assert!(colors.is_active());

        colors.update(&roots, &[], &[]);

        assert_eq!(colors.len(), 0);
        assert!(!colors.is_active());
        assert_eq!(colors.emphasis("1"), None);
        colors.dispose();
    }

    #[test]
    fn sync_follows_exploration_revisions() {
        let mut state = ExplorationState::default();
        let mut colors = FamilyColors::create();
        assert!(colors.sync(&state));
        assert!(!colors.sync(&state));

        state.apply(crate::rag::ChatEvent::Metadata {
            memory_ids: ids(&["5", "6"]),
        });
        assert!(colors.sync(&state));
        assert_eq!(colors.color_of("6"), Some(&palette_record(1)));

        state.clear();
        assert!(colors.sync(&state));
        assert!(!colors.is_active());
    }

    /// Roots plus families whose parents are already known and whose neighbours are fresh.
    fn exploration() -> impl Strategy<Value = (Vec<String>, Vec<NodeFamily>)> {
        (
            1usize..6,
            prop::collection::vec((any::<prop::sample::Index>(), 1usize..4), 0..8),
        )
            .prop_map(|(root_count, steps)| {
                let roots = (0..root_count).map(|index| format!("r{index}")).collect::<Vec<_>>();
                let mut known = roots.clone();
                let mut fresh = 0;
                let families = steps
                    .into_iter()
                    .map(|(pick, count)| {
                        let parent_id = known[pick.index(known.len())].clone();
                        let neighbor_ids = (0..count)
                            .map(|_| {
                                fresh += 1;
                                format!("n{fresh}")
                            })
                            .collect::<Vec<_>>();
                        known.extend(neighbor_ids.iter().cloned());
                        NodeFamily {
                            parent_id,
                            neighbor_ids,
                        }
                    })
                    .collect();
                (roots, families)
            })
    }

    proptest! {
        #[test]
        fn assigned_colours_never_change((roots, families) in exploration()) {
            let mut colors = FamilyColors::create();
            let mut seen: HashMap<String, ColorRecord> = HashMap::new();

            for step in 0..=families.len() {
                let families = &families[..step];
                colors.update(&roots, families, &highlighted(&roots, families));
                for (id, record) in &seen {
                    prop_assert_eq!(colors.color_of(id), Some(record));
                }
                for id in highlighted(&roots, families) {
                    if let Some(record) = colors.color_of(&id) {
                        seen.entry(id).or_insert_with(|| record.clone());
                    }
                }
            }
        }

        #[test]
        fn families_share_their_parent_record((roots, families) in exploration()) {
            let mut colors = FamilyColors::create();
            colors.update(&roots, &families, &highlighted(&roots, &families));

            for family in &families {
                for neighbor in &family.neighbor_ids {
                    prop_assert!(colors.shares_record(&family.parent_id, neighbor));
                }
            }
        }
    }
}
