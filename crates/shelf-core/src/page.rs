//! Pagination state.

use serde::{Deserialize, Serialize};

/// Derived pagination for the current filtered set.
///
/// After every recompute `pages == max(1, ceil(total / limit))` and
/// `1 <= page <= pages`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationState {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub pages: usize,
}

impl PaginationState {
    /// Zero-based index of the first record on the current page.
    ///
    /// A hand-built page 0 is treated as page 1.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.pages
    }
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            total: 0,
            pages: 1,
        }
    }
}
