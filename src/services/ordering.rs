//! Ordering Engine for Kizuna.
//!
//! Total order over bookmarks: unranked bookmarks first (newest first), then
//! ranked bookmarks by rank ascending with newest-first ties. The id is the
//! last tiebreak so every replica renders identical sequences.

use std::cmp::Ordering;

use crate::types::bookmark::Bookmark;

/// Compares two bookmarks for display.
pub fn compare(a: &Bookmark, b: &Bookmark) -> Ordering {
    let by_rank = match (a.sort_order, b.sort_order) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.cmp(&y),
    };
    by_rank
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Sorts in place using [`compare`].
pub fn sort_bookmarks(items: &mut [Bookmark]) {
    items.sort_by(compare);
}

/// Returns a sorted copy.
pub fn sorted(items: &[Bookmark]) -> Vec<Bookmark> {
    let mut copy = items.to_vec();
    sort_bookmarks(&mut copy);
    copy
}

/// Swaps the positions of `dragged` and `target` in `ordered` and returns the
/// new 1-based rank of every bookmark, in the new order.
///
/// Returns `None` when the ids are equal or either one is missing.
pub fn swap_and_renumber(
    ordered: &[Bookmark],
    dragged: &str,
    target: &str,
) -> Option<Vec<(String, i64)>> {
    if dragged == target {
        return None;
    }
    let from = ordered.iter().position(|b| b.id == dragged)?;
    let to = ordered.iter().position(|b| b.id == target)?;

    let mut ids: Vec<&str> = ordered.iter().map(|b| b.id.as_str()).collect();
    ids.swap(from, to);

    Some(
        ids.into_iter()
            .enumerate()
            .map(|(index, id)| (id.to_string(), index as i64 + 1))
            .collect(),
    )
}
