use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::rag::NodeFamily;

use super::ColorRecord;

/// Finds the colour a family parent inherits, walking up through the families that
/// list it as a neighbour (grandparent, great-grandparent, ...). Every parent resolved
/// on the way is cached in `color_of`.
///
/// Returns `None` when no ancestor is coloured or the chain loops back on itself.
pub(super) fn resolve_parent_color(
    parent_id: &str,
    families: &[NodeFamily],
    color_of: &mut HashMap<String, Rc<ColorRecord>>,
    visiting: &mut HashSet<String>,
) -> Option<Rc<ColorRecord>> {
    if let Some(color) = color_of.get(parent_id) {
        return Some(Rc::clone(color));
    }
    if !visiting.insert(parent_id.to_owned()) {
        return None;
    }

    for family in families {
        if family.parent_id == parent_id
            || !family.neighbor_ids.iter().any(|id| id == parent_id)
        {
            continue;
        }
        if let Some(color) = resolve_parent_color(&family.parent_id, families, color_of, visiting) {
            color_of.insert(parent_id.to_owned(), Rc::clone(&color));
            return Some(color);
        }
    }
    None
}
