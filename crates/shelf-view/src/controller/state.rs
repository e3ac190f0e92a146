//! View state and its transitions.
//!
//! `ViewState` owns the raw records, the filter/sort/page inputs and every
//! value derived from them. It is mutated only through [`ViewState::apply`]
//! with a [`ViewAction`], and every transition leaves the derived state
//! consistent:
//!
//! ```text
//! raw ──► filter ──► sort ──► paginate ──► visible page
//!            │
//!            └──► prune selection
//! ```
//!
//! These types have no async or locking concerns, so they are tested
//! headlessly.

use std::collections::HashSet;

use shelf_core::{
    Banner, BulkActionResult, FieldMatcher, FilterSpec, PaginationState, Record, RecordId,
    SortSpec, ViewConfig,
};

use crate::filter::FilterEngine;
use crate::paginate;
use crate::selection::SelectionTracker;
use crate::sort;

// =============================================================================
// Actions
// =============================================================================

/// Every transition the view state accepts.
#[derive(Debug, Clone)]
pub enum ViewAction {
    /// Raw search input changed. Only echoed; nothing is recomputed.
    SearchInput(String),

    /// Debounced search settled on `text`.
    ApplySearch(String),

    /// Set (`Some`) or remove (`None`) a field filter.
    SetFieldFilter {
        field: String,
        matcher: Option<FieldMatcher>,
    },

    /// Drop the search text and all field filters.
    ClearFilters,

    /// Sort by a key; the same key flips direction.
    SetSort(String),

    /// Go back to input order.
    ClearSort,

    SetPage(usize),

    /// Change page size. Resets to page 1.
    SetLimit(usize),

    ToggleSelect(RecordId),
    SelectAllVisible,
    SelectAllMatching,
    ClearSelection,

    /// A fetch started.
    FetchStarted,

    /// Fresh records arrived. Rebuilds everything and clears the selection.
    Refreshed(Vec<Record>),

    /// A fetch failed. The previous records are kept.
    FetchFailed(String),

    /// A fetch was abandoned before it settled.
    FetchCancelled,

    /// A bulk action settled. `fetch_error` carries the refetch failure, if any.
    BulkSettled {
        label: String,
        result: BulkActionResult,
        fetch_error: Option<String>,
    },

    /// A single-row action failed.
    RowActionFailed { id: RecordId, reason: String },

    DismissBanner,
}

// =============================================================================
// Snapshot
// =============================================================================

/// Read-only derived view handed to renderers.
#[derive(Debug, Clone)]
pub struct ViewSnapshot {
    /// Records on the current page.
    pub visible: Vec<Record>,

    pub pagination: PaginationState,

    /// Selected ids, in filtered order.
    pub selected: Vec<RecordId>,

    /// Every record on the current page is selected.
    pub is_all_visible_selected: bool,

    /// Every record of the filtered result is selected.
    pub is_all_matching_selected: bool,

    /// What the user typed, possibly not applied yet.
    pub search_input: String,

    /// Applied filter.
    pub filter: FilterSpec,

    pub sort: SortSpec,

    /// Number of raw records before filtering.
    pub raw_count: usize,

    /// A fetch is in flight.
    pub loading: bool,

    pub banner: Option<Banner>,

    /// Incremented on every filter recompute.
    pub generation: u64,
}

impl ViewSnapshot {
    pub fn visible_ids(&self) -> Vec<&RecordId> {
        self.visible.iter().map(|r| &r.id).collect()
    }

    pub fn is_selected(&self, id: &RecordId) -> bool {
        self.selected.contains(id)
    }
}

// =============================================================================
// View State
// =============================================================================

/// Single source of truth for one collection view.
#[derive(Debug)]
pub struct ViewState {
    engine: FilterEngine,

    // -------------------------------------------------------------------------
    // Inputs
    // -------------------------------------------------------------------------
    raw: Vec<Record>,
    filter: FilterSpec,
    search_input: String,
    sort: SortSpec,
    page: usize,
    limit: usize,

    // -------------------------------------------------------------------------
    // Derived
    // -------------------------------------------------------------------------
    /// Indices into `raw`, filtered then sorted.
    filtered: Vec<usize>,
    pagination: PaginationState,
    selection: SelectionTracker,

    // -------------------------------------------------------------------------
    // Feedback
    // -------------------------------------------------------------------------
    loading: bool,
    banner: Option<Banner>,
    generation: u64,
}

impl ViewState {
    pub fn new(config: &ViewConfig) -> Self {
        let limit = config.page_size.max(1);
        Self {
            engine: FilterEngine::new(config.searchable_fields.clone()),
            raw: Vec::new(),
            filter: FilterSpec::default(),
            search_input: String::new(),
            sort: SortSpec::default(),
            page: 1,
            limit,
            filtered: Vec::new(),
            pagination: paginate::derive(0, 1, limit),
            selection: SelectionTracker::new(),
            loading: false,
            banner: None,
            generation: 0,
        }
    }

    /// Apply one transition.
    pub fn apply(&mut self, action: ViewAction) {
        match action {
            ViewAction::SearchInput(text) => {
                self.search_input = text;
            }
            ViewAction::ApplySearch(text) => {
                self.search_input = text.clone();
                self.filter.search_text = text;
                self.refilter();
            }
            ViewAction::SetFieldFilter { field, matcher } => {
                match matcher {
                    Some(matcher) => {
                        if !matcher.is_well_formed() {
                            tracing::warn!(
                                "Ignoring malformed filter on '{}': {:?}",
                                field,
                                matcher
                            );
                        }
                        self.filter.field_filters.insert(field, matcher);
                    }
                    None => {
                        self.filter.field_filters.remove(&field);
                    }
                }
                self.refilter();
            }
            ViewAction::ClearFilters => {
                self.filter = FilterSpec::default();
                self.search_input.clear();
                self.refilter();
            }
            ViewAction::SetSort(key) => {
                self.sort.toggle(&key);
                self.refilter();
            }
            ViewAction::ClearSort => {
                self.sort = SortSpec::default();
                self.refilter();
            }
            ViewAction::SetPage(page) => {
                self.page = page;
                self.repaginate();
            }
            ViewAction::SetLimit(limit) => {
                self.limit = limit.max(1);
                self.page = 1;
                self.repaginate();
            }
            ViewAction::ToggleSelect(id) => {
                if self.filtered_ids().any(|f| f == &id) {
                    self.selection.toggle(&id);
                } else {
                    tracing::debug!("Ignoring toggle of {} outside the filtered set", id);
                }
            }
            ViewAction::SelectAllVisible => {
                let visible: Vec<RecordId> = self.visible_ids().cloned().collect();
                self.selection.select_all_visible(&visible);
            }
            ViewAction::SelectAllMatching => {
                let matching: Vec<RecordId> = self.filtered_ids().cloned().collect();
                self.selection.select_all_matching(&matching);
            }
            ViewAction::ClearSelection => {
                self.selection.clear();
            }
            ViewAction::FetchStarted => {
                self.loading = true;
            }
            ViewAction::Refreshed(records) => {
                self.loading = false;
                self.raw = records;
                self.selection.clear();
                if self.banner.as_ref().is_some_and(Banner::is_error) {
                    self.banner = None;
                }
                self.refilter();
            }
            ViewAction::FetchFailed(reason) => {
                self.loading = false;
                self.banner = Some(Banner::FetchFailed { reason });
            }
            ViewAction::FetchCancelled => {
                self.loading = false;
            }
            ViewAction::BulkSettled {
                label,
                result,
                fetch_error,
            } => {
                self.banner = Some(Banner::BulkCompleted {
                    action: label,
                    succeeded: result.succeeded.len(),
                    failed: result.failed.len(),
                    fetch_error,
                });
            }
            ViewAction::RowActionFailed { id, reason } => {
                self.banner = Some(Banner::RowActionFailed { id, reason });
            }
            ViewAction::DismissBanner => {
                self.banner = None;
            }
        }
    }

    /// Recompute the filtered set, then everything downstream of it.
    fn refilter(&mut self) {
        self.filtered = self.engine.matching_indices(&self.raw, &self.filter);
        sort::sort_indices(&self.raw, &mut self.filtered, &self.sort);
        self.generation += 1;

        let universe: HashSet<&RecordId> = self.filtered.iter().map(|&i| &self.raw[i].id).collect();
        let dropped = self.selection.retain_within(&universe);
        if dropped > 0 {
            tracing::debug!("Dropped {} selected record(s) no longer visible", dropped);
        }

        self.repaginate();
    }

    fn repaginate(&mut self) {
        self.pagination = paginate::derive(self.filtered.len(), self.page, self.limit);
        self.page = self.pagination.page;
    }

    fn filtered_ids(&self) -> impl Iterator<Item = &RecordId> {
        self.filtered.iter().map(|&i| &self.raw[i].id)
    }

    fn visible_ids(&self) -> impl Iterator<Item = &RecordId> {
        paginate::slice(&self.filtered, &self.pagination)
            .iter()
            .map(|&i| &self.raw[i].id)
    }

    // =========================================================================
    // Read access
    // =========================================================================

    pub fn pagination(&self) -> PaginationState {
        self.pagination
    }

    pub fn filter(&self) -> &FilterSpec {
        &self.filter
    }

    pub fn search_input(&self) -> &str {
        &self.search_input
    }

    pub fn sort(&self) -> &SortSpec {
        &self.sort
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn raw_len(&self) -> usize {
        self.raw.len()
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    pub fn selection_len(&self) -> usize {
        self.selection.len()
    }

    /// Selected ids in filtered order.
    pub fn selected_ids(&self) -> Vec<RecordId> {
        self.selection.ordered_by(self.filtered_ids())
    }

    /// Filtered, sorted records across all pages.
    pub fn filtered_records(&self) -> Vec<Record> {
        self.filtered.iter().map(|&i| self.raw[i].clone()).collect()
    }

    /// Build the read-only view for renderers.
    pub fn snapshot(&self) -> ViewSnapshot {
        let visible: Vec<Record> = paginate::slice(&self.filtered, &self.pagination)
            .iter()
            .map(|&i| self.raw[i].clone())
            .collect();
        let visible_ids: Vec<RecordId> = visible.iter().map(|r| r.id.clone()).collect();
        let matching_ids: Vec<RecordId> = self.filtered_ids().cloned().collect();

        ViewSnapshot {
            is_all_visible_selected: self.selection.is_all_selected(&visible_ids),
            is_all_matching_selected: self.selection.is_all_selected(&matching_ids),
            visible,
            pagination: self.pagination,
            selected: self.selected_ids(),
            search_input: self.search_input.clone(),
            filter: self.filter.clone(),
            sort: self.sort.clone(),
            raw_count: self.raw.len(),
            loading: self.loading,
            banner: self.banner.clone(),
            generation: self.generation,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use shelf_core::{BulkFailure, SortDirection};

    fn config(page_size: usize) -> ViewConfig {
        ViewConfig {
            searchable_fields: vec!["name".to_string()],
            page_size,
            ..ViewConfig::default()
        }
    }

    fn records(n: usize) -> Vec<Record> {
        (1..=n)
            .map(|i| {
                Record::new(i.to_string())
                    .with("name", format!("Shop {:02}", i))
                    .with("status", if i % 2 == 0 { "open" } else { "closed" })
                    .with("rating", (i % 5) as f64)
            })
            .collect()
    }

    fn loaded(n: usize, page_size: usize) -> ViewState {
        let mut state = ViewState::new(&config(page_size));
        state.apply(ViewAction::Refreshed(records(n)));
        state
    }

    fn ids(snapshot: &ViewSnapshot) -> Vec<&str> {
        snapshot.visible.iter().map(|r| r.id.as_ref()).collect()
    }

    fn assert_selection_within_filter(state: &ViewState) {
        let filtered: HashSet<RecordId> = state
            .filtered_records()
            .into_iter()
            .map(|r| r.id)
            .collect();
        for id in state.selected_ids() {
            assert!(filtered.contains(&id), "{} selected but not visible", id);
        }
        assert_eq!(state.selected_ids().len(), state.selection_len());
    }

    #[test]
    fn test_initial_state() {
        let state = ViewState::new(&config(10));
        assert_eq!(
            state.pagination(),
            PaginationState {
                page: 1,
                limit: 10,
                total: 0,
                pages: 1
            }
        );
        assert!(state.snapshot().visible.is_empty());
    }

    #[test]
    fn test_delete_on_last_page_clamps() {
        let mut state = loaded(25, 10);
        assert_eq!(state.pagination().pages, 3);

        state.apply(ViewAction::SetPage(3));
        assert_eq!(state.snapshot().visible.len(), 5);

        // 6 records deleted server-side
        let mut remaining = records(25);
        remaining.truncate(19);
        state.apply(ViewAction::Refreshed(remaining));

        let pagination = state.pagination();
        assert_eq!(pagination.total, 19);
        assert_eq!(pagination.pages, 2);
        assert_eq!(pagination.page, 2);
        assert_eq!(state.snapshot().visible.len(), 9);
    }

    #[test]
    fn test_search_without_match() {
        let mut state = loaded(12, 5);
        state.apply(ViewAction::SetPage(2));
        state.apply(ViewAction::ApplySearch("abc".to_string()));

        assert_eq!(state.filtered_len(), 0);
        assert_eq!(
            state.pagination(),
            PaginationState {
                page: 1,
                limit: 5,
                total: 0,
                pages: 1
            }
        );
    }

    #[test]
    fn test_search_input_is_echo_only() {
        let mut state = loaded(12, 5);
        let generation = state.snapshot().generation;

        state.apply(ViewAction::SearchInput("Shop 1".to_string()));
        let snapshot = state.snapshot();
        assert_eq!(snapshot.search_input, "Shop 1");
        assert_eq!(snapshot.filter.search_text, "");
        assert_eq!(snapshot.generation, generation);
        assert_eq!(snapshot.pagination.total, 12);
    }

    #[test]
    fn test_filter_prunes_selection() {
        let mut state = loaded(10, 10);
        state.apply(ViewAction::SelectAllMatching);
        assert_eq!(state.selection_len(), 10);

        state.apply(ViewAction::SetFieldFilter {
            field: "status".to_string(),
            matcher: Some(FieldMatcher::equals("OPEN")),
        });
        assert_eq!(state.filtered_len(), 5);
        assert_eq!(state.selection_len(), 5);
        assert_selection_within_filter(&state);

        // Removing the filter does not resurrect dropped selections
        state.apply(ViewAction::SetFieldFilter {
            field: "status".to_string(),
            matcher: None,
        });
        assert_eq!(state.filtered_len(), 10);
        assert_eq!(state.selection_len(), 5);
    }

    #[test]
    fn test_malformed_range_has_no_effect() {
        let mut state = loaded(10, 10);
        state.apply(ViewAction::SetFieldFilter {
            field: "rating".to_string(),
            matcher: Some(FieldMatcher::range(Some(4.0), Some(1.0))),
        });
        assert_eq!(state.filtered_len(), 10);
    }

    #[test]
    fn test_sort_keeps_page_and_total() {
        let mut state = loaded(25, 10);
        state.apply(ViewAction::SetPage(2));
        let before = state.snapshot();

        state.apply(ViewAction::SetSort("name".to_string()));
        state.apply(ViewAction::SetSort("name".to_string()));
        let after = state.snapshot();

        assert_eq!(after.sort, SortSpec::by("name", SortDirection::Desc));
        assert_eq!(after.pagination, before.pagination);
        assert_eq!(ids(&after).first(), Some(&"15"));
        assert_ne!(ids(&after), ids(&before));
    }

    #[test]
    fn test_sort_toggle_twice_returns_to_ascending() {
        let mut state = loaded(7, 10);
        state.apply(ViewAction::SetSort("rating".to_string()));
        let ascending: Vec<String> = ids(&state.snapshot()).iter().map(|s| s.to_string()).collect();

        state.apply(ViewAction::SetSort("rating".to_string()));
        state.apply(ViewAction::SetSort("rating".to_string()));
        let again: Vec<String> = ids(&state.snapshot()).iter().map(|s| s.to_string()).collect();
        assert_eq!(again, ascending);
        // rating = i % 5, stable within ties
        assert_eq!(ascending, vec!["5", "1", "6", "2", "7", "3", "4"]);

        state.apply(ViewAction::ClearSort);
        assert_eq!(ids(&state.snapshot()), vec!["1", "2", "3", "4", "5", "6", "7"]);
    }

    #[test]
    fn test_limit_change_resets_page() {
        let mut state = loaded(25, 10);
        state.apply(ViewAction::SetPage(3));
        state.apply(ViewAction::SetLimit(5));

        let pagination = state.pagination();
        assert_eq!(pagination.page, 1);
        assert_eq!(pagination.pages, 5);

        state.apply(ViewAction::SetLimit(0));
        assert_eq!(state.pagination().limit, 1);
    }

    #[test]
    fn test_set_page_clamps() {
        let mut state = loaded(25, 10);
        state.apply(ViewAction::SetPage(99));
        assert_eq!(state.pagination().page, 3);
        state.apply(ViewAction::SetPage(0));
        assert_eq!(state.pagination().page, 1);
    }

    #[test]
    fn test_select_all_visible_toggles_current_page() {
        let mut state = loaded(25, 10);
        state.apply(ViewAction::SetPage(2));
        state.apply(ViewAction::SelectAllVisible);

        let snapshot = state.snapshot();
        assert!(snapshot.is_all_visible_selected);
        assert!(!snapshot.is_all_matching_selected);
        assert_eq!(snapshot.selected.len(), 10);
        assert_eq!(snapshot.selected.first(), Some(&RecordId::from("11")));

        state.apply(ViewAction::SelectAllVisible);
        assert_eq!(state.selection_len(), 0);
    }

    #[test]
    fn test_select_all_matching_spans_pages() {
        let mut state = loaded(25, 10);
        state.apply(ViewAction::SetFieldFilter {
            field: "status".to_string(),
            matcher: Some(FieldMatcher::equals("closed")),
        });
        state.apply(ViewAction::SelectAllMatching);

        let snapshot = state.snapshot();
        assert_eq!(snapshot.pagination.total, 13);
        assert_eq!(snapshot.selected.len(), 13);
        assert!(snapshot.is_all_matching_selected);
        assert!(snapshot.is_all_visible_selected);
    }

    #[test]
    fn test_toggle_outside_filter_is_ignored() {
        let mut state = loaded(10, 10);
        state.apply(ViewAction::ApplySearch("Shop 01".to_string()));
        state.apply(ViewAction::ToggleSelect("2".into()));
        assert_eq!(state.selection_len(), 0);

        state.apply(ViewAction::ToggleSelect("1".into()));
        assert_eq!(state.selected_ids(), vec![RecordId::from("1")]);
        assert_selection_within_filter(&state);
    }

    #[test]
    fn test_refresh_clears_selection() {
        let mut state = loaded(10, 10);
        state.apply(ViewAction::SelectAllMatching);
        state.apply(ViewAction::Refreshed(records(10)));
        assert_eq!(state.selection_len(), 0);
    }

    #[test]
    fn test_cancelled_fetch_clears_loading() {
        let mut state = loaded(4, 10);
        state.apply(ViewAction::FetchStarted);
        state.apply(ViewAction::FetchCancelled);
        assert!(!state.is_loading());
        assert_eq!(state.raw_len(), 4);
        assert!(state.banner().is_none());
    }

    #[test]
    fn test_fetch_failure_retains_records() {
        let mut state = loaded(10, 10);
        state.apply(ViewAction::FetchStarted);
        assert!(state.is_loading());

        state.apply(ViewAction::FetchFailed("timeout".to_string()));
        assert!(!state.is_loading());
        assert_eq!(state.raw_len(), 10);
        assert_eq!(state.snapshot().visible.len(), 10);
        assert!(matches!(state.banner(), Some(Banner::FetchFailed { .. })));

        // Next successful fetch clears the banner
        state.apply(ViewAction::Refreshed(records(3)));
        assert!(state.banner().is_none());
    }

    #[test]
    fn test_bulk_banner() {
        let mut state = loaded(3, 10);
        state.apply(ViewAction::BulkSettled {
            label: "Delete".to_string(),
            result: BulkActionResult {
                succeeded: vec!["1".into(), "2".into()],
                failed: vec![BulkFailure {
                    id: "3".into(),
                    reason: "locked".to_string(),
                }],
            },
            fetch_error: None,
        });
        assert_eq!(
            state.banner(),
            Some(&Banner::BulkCompleted {
                action: "Delete".to_string(),
                succeeded: 2,
                failed: 1,
                fetch_error: None,
            })
        );

        state.apply(ViewAction::DismissBanner);
        assert!(state.banner().is_none());
    }

    #[test]
    fn test_clear_filters() {
        let mut state = loaded(10, 10);
        state.apply(ViewAction::ApplySearch("Shop 0".to_string()));
        state.apply(ViewAction::SetFieldFilter {
            field: "status".to_string(),
            matcher: Some(FieldMatcher::equals("open")),
        });
        assert_eq!(state.filtered_len(), 4);

        state.apply(ViewAction::ClearFilters);
        assert!(state.filter().is_empty());
        assert_eq!(state.search_input(), "");
        assert_eq!(state.filtered_len(), 10);
    }
}
