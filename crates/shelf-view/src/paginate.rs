//! Page-count and page-slice derivation.

use shelf_core::PaginationState;

/// Derive pagination for `total` filtered records.
///
/// `limit` below 1 is treated as 1. `page` is clamped into `[1, pages]`,
/// so a shrinking result set moves the user to the new last page instead
/// of rendering an empty one.
pub fn derive(total: usize, page: usize, limit: usize) -> PaginationState {
    let limit = limit.max(1);
    let pages = total.div_ceil(limit).max(1);
    PaginationState {
        page: page.clamp(1, pages),
        limit,
        total,
        pages,
    }
}

/// The records on the current page.
pub fn slice<'a, T>(items: &'a [T], state: &PaginationState) -> &'a [T] {
    let start = state.offset().min(items.len());
    let end = start.saturating_add(state.limit).min(items.len());
    &items[start..end]
}
