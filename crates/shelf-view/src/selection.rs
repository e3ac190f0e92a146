//! Multi-selection over record ids.

use std::collections::HashSet;

use shelf_core::RecordId;

/// Set of selected record ids.
///
/// The tracker itself accepts any id; keeping it within the visible
/// universe is done by calling [`SelectionTracker::retain_within`] after
/// every filter or data change.
#[derive(Debug, Clone, Default)]
pub struct SelectionTracker {
    selected: HashSet<RecordId>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle a single id. Returns whether it is now selected.
    pub fn toggle(&mut self, id: &RecordId) -> bool {
        if self.selected.remove(id) {
            false
        } else {
            self.selected.insert(id.clone());
            true
        }
    }

    /// Per-page toggle: deselect the page if it is fully selected,
    /// otherwise select all of it.
    pub fn select_all_visible(&mut self, visible: &[RecordId]) {
        if self.is_all_selected(visible) {
            for id in visible {
                self.selected.remove(id);
            }
        } else {
            self.selected.extend(visible.iter().cloned());
        }
    }

    /// Select every id of the filtered result, across all pages.
    pub fn select_all_matching(&mut self, matching: &[RecordId]) {
        self.selected.extend(matching.iter().cloned());
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// True iff `universe` is non-empty and fully selected.
    pub fn is_all_selected(&self, universe: &[RecordId]) -> bool {
        !universe.is_empty() && universe.iter().all(|id| self.selected.contains(id))
    }

    /// Drop every id not in `universe`. Returns how many were dropped.
    pub fn retain_within(&mut self, universe: &HashSet<&RecordId>) -> usize {
        let before = self.selected.len();
        self.selected.retain(|id| universe.contains(id));
        before - self.selected.len()
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.selected.contains(id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selected ids in the order they appear in `order`.
    pub fn ordered_by<'a>(&self, order: impl IntoIterator<Item = &'a RecordId>) -> Vec<RecordId> {
        order
            .into_iter()
            .filter(|id| self.selected.contains(*id))
            .cloned()
            .collect()
    }
}
