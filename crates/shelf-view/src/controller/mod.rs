//! Collection View Controller
//!
//! `CollectionView` composes the filter, sort, pagination, selection,
//! debounce and bulk-action pieces into one unit a renderer can drive.
//!
//! ## Flow
//!
//! ```text
//! refresh() ──► DataFetcher::list ──► Refreshed(records)
//!                                          │
//!          set_search ──(debounce)──┐      ▼
//!          set_field_filter ────────┼──► ViewState::apply ──► watch broadcast
//!          set_sort / set_page ─────┘      ▲
//!                                          │
//! run_bulk_action ──► Mutator × selection ──► join all ──► refresh()
//! ```
//!
//! All recomputation is synchronous. The only suspension points are the
//! debounce timer, the fetch and the per-id mutations. Results arriving
//! after [`CollectionView::dispose`] are discarded.

mod observable;
mod state;

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use shelf_core::{
    BulkActionDef, BulkActionResult, FieldMatcher, MutationError, RecordId, ViewConfig, ViewError,
};

use crate::bulk::{self, ActionRegistry};
use crate::debounce::Debouncer;
use crate::source::{DataFetcher, ListQuery, Mutator};
use observable::ObservableState;

pub use state::{ViewAction, ViewSnapshot, ViewState};

// =============================================================================
// Collection View
// =============================================================================

/// Filtered, sorted, paginated, multi-selectable view over fetched records.
///
/// The state is owned here; callers read snapshots and invoke the
/// transition methods below. Every transition broadcasts a fresh
/// [`ViewSnapshot`] to subscribers.
pub struct CollectionView {
    shared: Arc<ObservableState>,
    fetcher: Arc<dyn DataFetcher>,
    mutator: Arc<dyn Mutator>,
    actions: ActionRegistry,
    base_query: ListQuery,
    page_sizes: Vec<usize>,

    /// Quiet period before search input is applied.
    search_delay: Duration,
    search_debounce: Mutex<Debouncer>,

    /// Fetch generation for discarding stale responses.
    fetch_generation: AtomicU64,
}

impl CollectionView {
    /// Create a view. No records are loaded until [`refresh`](Self::refresh).
    pub fn new(
        config: &ViewConfig,
        fetcher: Arc<dyn DataFetcher>,
        mutator: Arc<dyn Mutator>,
    ) -> Self {
        Self {
            shared: Arc::new(ObservableState::new(ViewState::new(config))),
            fetcher,
            mutator,
            actions: ActionRegistry::new(config.actions.clone()),
            base_query: ListQuery::default(),
            page_sizes: config.page_sizes.clone(),
            search_delay: config.search_debounce(),
            search_debounce: Mutex::new(Debouncer::new()),
            fetch_generation: AtomicU64::new(0),
        }
    }

    /// Set the base query sent with every fetch.
    pub fn with_query(mut self, query: ListQuery) -> Self {
        self.base_query = query;
        self
    }

    // =========================================================================
    // Read access
    // =========================================================================

    /// Subscribe to snapshot changes. Clone the receiver for each subscriber.
    pub fn subscribe(&self) -> watch::Receiver<ViewSnapshot> {
        self.shared.subscribe()
    }

    /// Current derived view.
    pub fn snapshot(&self) -> ViewSnapshot {
        self.shared.snapshot()
    }

    /// Bulk actions offered on the selection.
    pub fn actions(&self) -> &[BulkActionDef] {
        self.actions.list()
    }

    /// Page sizes offered to the user.
    pub fn page_sizes(&self) -> &[usize] {
        &self.page_sizes
    }

    pub fn is_disposed(&self) -> bool {
        !self.shared.is_alive()
    }

    // =========================================================================
    // Filtering
    // =========================================================================

    /// Update the search input. The filter is applied once the input has
    /// been quiet for the configured debounce period.
    pub fn set_search(&self, text: impl Into<String>) {
        let text = text.into();
        if !self.shared.dispatch(ViewAction::SearchInput(text.clone())) {
            return;
        }

        let weak = Arc::downgrade(&self.shared);
        self.search_debounce
            .lock()
            .schedule(text, self.search_delay, move |text| {
                if let Some(shared) = weak.upgrade() {
                    shared.dispatch(ViewAction::ApplySearch(text));
                }
            });
    }

    /// Apply the pending search input now instead of waiting for the timer.
    pub fn flush_search(&self) {
        self.search_debounce.lock().cancel();
        let (input, applied) = self
            .shared
            .read(|s| (s.search_input().to_string(), s.filter().search_text.clone()));
        if input != applied {
            self.shared.dispatch(ViewAction::ApplySearch(input));
        }
    }

    /// Set a field filter. Applied immediately.
    pub fn set_field_filter(&self, field: impl Into<String>, matcher: FieldMatcher) {
        self.shared.dispatch(ViewAction::SetFieldFilter {
            field: field.into(),
            matcher: Some(matcher),
        });
    }

    /// Remove a field filter. Applied immediately.
    pub fn clear_field_filter(&self, field: impl Into<String>) {
        self.shared.dispatch(ViewAction::SetFieldFilter {
            field: field.into(),
            matcher: None,
        });
    }

    /// Drop the search text (including pending input) and all field filters.
    pub fn clear_filters(&self) {
        self.search_debounce.lock().cancel();
        self.shared.dispatch(ViewAction::ClearFilters);
    }

    // =========================================================================
    // Ordering and paging
    // =========================================================================

    /// Sort by `key`. Requesting the current key flips the direction.
    pub fn set_sort(&self, key: impl Into<String>) {
        self.shared.dispatch(ViewAction::SetSort(key.into()));
    }

    /// Restore input order.
    pub fn clear_sort(&self) {
        self.shared.dispatch(ViewAction::ClearSort);
    }

    /// Go to `page`, clamped into the valid range.
    pub fn set_page(&self, page: usize) {
        self.shared.dispatch(ViewAction::SetPage(page));
    }

    /// Change the page size and return to page 1.
    pub fn set_limit(&self, limit: usize) {
        self.shared.dispatch(ViewAction::SetLimit(limit));
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Toggle one record. Ids outside the filtered set are ignored.
    pub fn toggle_select(&self, id: &RecordId) {
        self.shared.dispatch(ViewAction::ToggleSelect(id.clone()));
    }

    /// Toggle selection of the current page.
    pub fn select_all_visible(&self) {
        self.shared.dispatch(ViewAction::SelectAllVisible);
    }

    /// Select every record of the filtered result, across pages.
    pub fn select_all_matching(&self) {
        self.shared.dispatch(ViewAction::SelectAllMatching);
    }

    pub fn clear_selection(&self) {
        self.shared.dispatch(ViewAction::ClearSelection);
    }

    pub fn dismiss_banner(&self) {
        self.shared.dispatch(ViewAction::DismissBanner);
    }

    // =========================================================================
    // Fetching
    // =========================================================================

    /// Refetch the raw records and rebuild the view.
    ///
    /// On failure the previous records stay on screen, a banner reports
    /// the error, and the error is also returned. A response overtaken by
    /// a newer refresh is discarded and reported as
    /// [`ViewError::Superseded`]; the newer refresh owns the view.
    ///
    /// Dropping the returned future before it settles clears the loading
    /// flag.
    pub async fn refresh(&self) -> Result<usize, ViewError> {
        let generation = self.fetch_generation.fetch_add(1, Ordering::AcqRel) + 1;
        if !self.shared.dispatch(ViewAction::FetchStarted) {
            return Err(ViewError::Disposed);
        }
        let mut pending = PendingFetch {
            view: self,
            generation,
            settled: false,
        };

        let query = self.current_query();
        tracing::debug!("Fetching records with {:?}", query);
        let result = self.fetcher.list(&query).await;
        pending.settled = true;

        if self.is_disposed() {
            return Err(ViewError::Disposed);
        }
        if !self.is_current_fetch(generation) {
            tracing::debug!("Discarding stale fetch generation {}", generation);
            return Err(ViewError::Superseded);
        }

        match result {
            Ok(records) => {
                let count = records.len();
                if !self.shared.dispatch(ViewAction::Refreshed(records)) {
                    return Err(ViewError::Disposed);
                }
                tracing::info!("Fetched {} record(s)", count);
                Ok(count)
            }
            Err(e) => {
                tracing::warn!("Fetch failed, keeping previous records: {}", e);
                if !self.shared.dispatch(ViewAction::FetchFailed(e.0.clone())) {
                    return Err(ViewError::Disposed);
                }
                Err(e.into())
            }
        }
    }

    fn is_current_fetch(&self, generation: u64) -> bool {
        self.fetch_generation.load(Ordering::Acquire) == generation
    }

    fn current_query(&self) -> ListQuery {
        let search = self.shared.read(|s| s.filter().normalized_search().to_string());
        ListQuery {
            search: (!search.is_empty()).then_some(search),
            ..self.base_query.clone()
        }
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Run a bulk action over the current selection.
    ///
    /// Destructive actions are refused with
    /// [`ViewError::ConfirmationRequired`]; confirm with the user and call
    /// [`run_confirmed_bulk_action`](Self::run_confirmed_bulk_action).
    pub async fn run_bulk_action(&self, action_id: &str) -> Result<BulkActionResult, ViewError> {
        let action = self.lookup_action(action_id)?;
        let count = self.shared.read(|s| s.selection_len());
        if count == 0 {
            return Err(ViewError::EmptySelection);
        }
        if action.destructive {
            return Err(ViewError::ConfirmationRequired {
                action: action.id,
                count,
            });
        }
        self.execute_bulk(action).await
    }

    /// Run a bulk action the user has already confirmed.
    pub async fn run_confirmed_bulk_action(
        &self,
        action_id: &str,
    ) -> Result<BulkActionResult, ViewError> {
        let action = self.lookup_action(action_id)?;
        self.execute_bulk(action).await
    }

    /// Fan the action out over the selection, wait for every request, then
    /// clear the selection and refetch.
    async fn execute_bulk(&self, action: BulkActionDef) -> Result<BulkActionResult, ViewError> {
        if self.is_disposed() {
            return Err(ViewError::Disposed);
        }
        let ids = self.shared.read(|s| s.selected_ids());
        if ids.is_empty() {
            return Err(ViewError::EmptySelection);
        }

        tracing::info!("Running '{}' on {} record(s)", action.id, ids.len());
        let mutator = self.mutator.clone();
        let result = bulk::run(ids, |id| mutator.mutate(&id, &action.id)).await;

        if self.is_disposed() {
            return Err(ViewError::Disposed);
        }
        if result.failed.is_empty() {
            tracing::info!("'{}' succeeded on {} record(s)", action.id, result.succeeded.len());
        } else {
            tracing::warn!(
                "'{}' partially failed: {} succeeded, {} failed",
                action.id,
                result.succeeded.len(),
                result.failed.len()
            );
        }

        self.shared.dispatch(ViewAction::ClearSelection);
        let fetch_error = match self.refresh().await {
            Ok(_) | Err(ViewError::Superseded) => None,
            Err(ViewError::Disposed) => return Err(ViewError::Disposed),
            Err(ViewError::Fetch(reason)) => Some(reason),
            Err(e) => Some(e.to_string()),
        };
        self.shared.dispatch(ViewAction::BulkSettled {
            label: action.label,
            result: result.clone(),
            fetch_error,
        });
        Ok(result)
    }

    /// Run one action on one record, then refetch.
    ///
    /// Any action id the mutator understands is accepted; confirming
    /// destructive row actions is up to the caller.
    pub async fn run_row_action(&self, id: &RecordId, action_id: &str) -> Result<(), ViewError> {
        if self.is_disposed() {
            return Err(ViewError::Disposed);
        }

        tracing::info!("Running '{}' on {}", action_id, id);
        let outcome = self.mutator.mutate(id, action_id).await;
        if self.is_disposed() {
            return Err(ViewError::Disposed);
        }

        let refreshed = self.refresh().await;
        if let Err(ViewError::Disposed) = refreshed {
            return Err(ViewError::Disposed);
        }

        match outcome {
            Ok(()) => Ok(()),
            Err(MutationError(reason)) => {
                tracing::warn!("'{}' on {} failed: {}", action_id, id, reason);
                if matches!(refreshed, Ok(_) | Err(ViewError::Superseded)) {
                    self.shared.dispatch(ViewAction::RowActionFailed {
                        id: id.clone(),
                        reason: reason.clone(),
                    });
                }
                Err(ViewError::Mutation {
                    id: id.clone(),
                    reason,
                })
            }
        }
    }

    fn lookup_action(&self, action_id: &str) -> Result<BulkActionDef, ViewError> {
        self.actions
            .get(action_id)
            .cloned()
            .ok_or_else(|| ViewError::UnknownAction(action_id.to_string()))
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Tear the view down.
    ///
    /// Cancels the pending search timer and discards every result that
    /// arrives afterwards. Idempotent.
    pub fn dispose(&self) {
        if self.shared.kill() {
            self.search_debounce.lock().dispose();
            tracing::debug!("Collection view disposed");
        }
    }
}

impl Drop for CollectionView {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Clears the loading flag when a refresh is dropped mid-flight.
struct PendingFetch<'a> {
    view: &'a CollectionView,
    generation: u64,
    settled: bool,
}

impl Drop for PendingFetch<'_> {
    fn drop(&mut self) {
        if !self.settled && self.view.is_current_fetch(self.generation) {
            tracing::debug!("Fetch generation {} dropped before settling", self.generation);
            self.view.shared.dispatch(ViewAction::FetchCancelled);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MemoryStore, MockDataFetcher, MockMutator};
    use shelf_core::{Banner, FetchError, Record};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn config(debounce_ms: u64) -> ViewConfig {
        ViewConfig {
            searchable_fields: vec!["name".to_string()],
            search_debounce_ms: debounce_ms,
            page_size: 10,
            ..ViewConfig::default()
        }
    }

    fn shops(n: usize) -> Vec<Record> {
        (1..=n)
            .map(|i| Record::new(i.to_string()).with("name", format!("Shop {:02}", i)))
            .collect()
    }

    fn memory_view(store: &MemoryStore, debounce_ms: u64) -> CollectionView {
        CollectionView::new(
            &config(debounce_ms),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
        )
    }

    #[tokio::test]
    async fn test_refresh_loads_records() {
        let mut fetcher = MockDataFetcher::new();
        fetcher
            .expect_list()
            .times(1)
            .returning(|_| Box::pin(async { Ok(shops(3)) }));
        let view = CollectionView::new(&config(0), Arc::new(fetcher), Arc::new(MockMutator::new()));

        assert_eq!(view.refresh().await.unwrap(), 3);
        let snapshot = view.snapshot();
        assert_eq!(snapshot.visible.len(), 3);
        assert!(!snapshot.loading);
    }

    #[tokio::test]
    async fn test_refresh_forwards_applied_search() {
        let mut fetcher = MockDataFetcher::new();
        fetcher
            .expect_list()
            .withf(|q| q.search.as_deref() == Some("shop") && q.params.get("status").is_some())
            .times(1)
            .returning(|_| Box::pin(async { Ok(Vec::new()) }));
        let view = CollectionView::new(&config(0), Arc::new(fetcher), Arc::new(MockMutator::new()))
            .with_query(ListQuery::default().with_param("status", "published"));

        view.set_search("  shop ");
        view.refresh().await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_previous_records() {
        let store = MemoryStore::new(shops(5));
        let view = memory_view(&store, 0);
        view.refresh().await.unwrap();

        store.set_fetch_failure(Some("connection reset".to_string()));
        let err = view.refresh().await.unwrap_err();
        assert!(matches!(err, ViewError::Fetch(_)));

        let snapshot = view.snapshot();
        assert_eq!(snapshot.visible.len(), 5);
        assert_eq!(
            snapshot.banner,
            Some(Banner::FetchFailed {
                reason: "connection reset".to_string()
            })
        );

        store.set_fetch_failure(None);
        view.refresh().await.unwrap();
        assert!(view.snapshot().banner.is_none());
    }

    #[tokio::test]
    async fn test_fetch_failure_from_mock() {
        let mut fetcher = MockDataFetcher::new();
        fetcher
            .expect_list()
            .returning(|_| Box::pin(async { Err(FetchError("500".to_string())) }));
        let view = CollectionView::new(&config(0), Arc::new(fetcher), Arc::new(MockMutator::new()));

        assert!(view.refresh().await.is_err());
        assert_eq!(view.snapshot().raw_count, 0);
        assert!(!view.snapshot().loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_is_debounced() {
        let store = MemoryStore::new(shops(12));
        let view = memory_view(&store, 300);
        view.refresh().await.unwrap();
        let generation = view.snapshot().generation;

        for text in ["S", "Shop 1", "Shop 11"] {
            view.set_search(text);
            tokio::time::advance(ms(100)).await;
        }
        let pending = view.snapshot();
        assert_eq!(pending.search_input, "Shop 11");
        assert_eq!(pending.filter.search_text, "");
        assert_eq!(pending.pagination.total, 12);

        tokio::time::sleep(ms(300)).await;
        let applied = view.snapshot();
        assert_eq!(applied.filter.search_text, "Shop 11");
        assert_eq!(applied.pagination.total, 1);
        // Exactly one recompute for three inputs
        assert_eq!(applied.generation, generation + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_search_applies_immediately() {
        let store = MemoryStore::new(shops(12));
        let view = memory_view(&store, 300);
        view.refresh().await.unwrap();

        view.set_search("Shop 0");
        view.flush_search();
        assert_eq!(view.snapshot().pagination.total, 9);

        // The cancelled timer does not apply again
        let generation = view.snapshot().generation;
        tokio::time::sleep(ms(500)).await;
        assert_eq!(view.snapshot().generation, generation);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_cancels_pending_search() {
        let store = MemoryStore::new(shops(12));
        let view = memory_view(&store, 300);
        view.refresh().await.unwrap();

        view.set_search("Shop 11");
        view.dispose();
        tokio::time::sleep(ms(1000)).await;

        assert!(view.is_disposed());
        assert_eq!(view.snapshot().filter.search_text, "");
        assert_eq!(view.snapshot().pagination.total, 12);
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_after_dispose_are_ignored() {
        let store = MemoryStore::new(shops(4)).with_delay(ms(100));
        let view = Arc::new(memory_view(&store, 0));

        let task = {
            let view = view.clone();
            tokio::spawn(async move { view.refresh().await })
        };
        tokio::time::sleep(ms(50)).await;
        view.dispose();

        let result = task.await.unwrap();
        assert!(matches!(result, Err(ViewError::Disposed)));
        assert_eq!(view.snapshot().raw_count, 0);
    }

    #[tokio::test]
    async fn test_destructive_action_needs_confirmation() {
        let mut fetcher = MockDataFetcher::new();
        fetcher
            .expect_list()
            .times(1)
            .returning(|_| Box::pin(async { Ok(shops(3)) }));
        let mut mutator = MockMutator::new();
        mutator.expect_mutate().never();

        let view = CollectionView::new(&config(0), Arc::new(fetcher), Arc::new(mutator));
        view.refresh().await.unwrap();

        let err = view.run_bulk_action("delete").await.unwrap_err();
        assert!(matches!(err, ViewError::EmptySelection));

        view.select_all_matching();
        let err = view.run_bulk_action("delete").await.unwrap_err();
        assert!(matches!(
            err,
            ViewError::ConfirmationRequired { ref action, count: 3 } if action == "delete"
        ));

        let err = view.run_bulk_action("archive").await.unwrap_err();
        assert!(matches!(err, ViewError::UnknownAction(_)));
        assert_eq!(view.snapshot().selected.len(), 3);
    }

    #[tokio::test]
    async fn test_non_destructive_bulk_action_runs_without_confirmation() {
        let store = MemoryStore::new(shops(3));
        let mut config = config(0);
        config.actions = vec![BulkActionDef::new("set:published=true", "Publish")];
        let view = CollectionView::new(&config, Arc::new(store.clone()), Arc::new(store.clone()));
        view.refresh().await.unwrap();

        view.toggle_select(&"2".into());
        let result = view.run_bulk_action("set:published=true").await.unwrap();
        assert_eq!(result.succeeded, vec![RecordId::from("2")]);

        let published: Vec<bool> = store
            .records()
            .iter()
            .map(|r| r.get("published").is_some())
            .collect();
        assert_eq!(published, vec![false, true, false]);
        assert_eq!(
            view.snapshot().banner,
            Some(Banner::BulkCompleted {
                action: "Publish".to_string(),
                succeeded: 1,
                failed: 0,
                fetch_error: None,
            })
        );
    }

    #[tokio::test]
    async fn test_bulk_calls_mutator_per_selected_id() {
        let mut fetcher = MockDataFetcher::new();
        fetcher
            .expect_list()
            .times(2)
            .returning(|_| Box::pin(async { Ok(shops(4)) }));
        let mut mutator = MockMutator::new();
        mutator
            .expect_mutate()
            .withf(|_, action| action == "delete")
            .times(2)
            .returning(|id, _| {
                let fail = id.0 == "3";
                Box::pin(async move {
                    if fail {
                        Err(MutationError("in use".to_string()))
                    } else {
                        Ok(())
                    }
                })
            });

        let view = CollectionView::new(&config(0), Arc::new(fetcher), Arc::new(mutator));
        view.refresh().await.unwrap();
        view.toggle_select(&"1".into());
        view.toggle_select(&"3".into());

        let result = view.run_confirmed_bulk_action("delete").await.unwrap();
        assert_eq!(result.succeeded, vec![RecordId::from("1")]);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].reason, "in use");
        assert!(view.snapshot().selected.is_empty());
    }

    #[tokio::test]
    async fn test_row_action() {
        let store = MemoryStore::new(shops(3)).with_failure("3", "has open orders");
        let view = memory_view(&store, 0);
        view.refresh().await.unwrap();

        view.run_row_action(&"1".into(), "delete").await.unwrap();
        assert_eq!(view.snapshot().raw_count, 2);

        let err = view.run_row_action(&"3".into(), "delete").await.unwrap_err();
        assert!(matches!(err, ViewError::Mutation { .. }));
        assert_eq!(view.snapshot().raw_count, 2);
        assert!(matches!(
            view.snapshot().banner,
            Some(Banner::RowActionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_subscribers_see_every_transition() {
        let store = MemoryStore::new(shops(25));
        let view = memory_view(&store, 0);
        let mut rx = view.subscribe();

        view.refresh().await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().pagination.pages, 3);

        view.set_page(3);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().visible.len(), 5);
    }

    #[test]
    fn test_page_sizes_and_actions_from_config() {
        let store = MemoryStore::default();
        let view = memory_view(&store, 0);
        assert_eq!(view.page_sizes(), &[10, 25, 50]);
        assert_eq!(view.actions().len(), 1);
        assert!(view.actions()[0].destructive);
    }

    #[tokio::test]
    async fn test_bulk_banner_keeps_counts_when_refetch_fails() {
        let store = MemoryStore::new(shops(3)).with_failure("2", "has open orders");
        let view = memory_view(&store, 0);
        view.refresh().await.unwrap();
        view.select_all_matching();

        store.set_fetch_failure(Some("offline".to_string()));
        let result = view.run_confirmed_bulk_action("delete").await.unwrap();
        assert_eq!(result.succeeded.len(), 2);
        assert_eq!(result.failed.len(), 1);

        let snapshot = view.snapshot();
        assert_eq!(
            snapshot.banner,
            Some(Banner::BulkCompleted {
                action: "Delete".to_string(),
                succeeded: 2,
                failed: 1,
                fetch_error: Some("offline".to_string()),
            })
        );
        // The list is stale until the next successful fetch
        assert_eq!(snapshot.raw_count, 3);
        assert!(snapshot.selected.is_empty());
        assert!(!snapshot.loading);

        store.set_fetch_failure(None);
        view.refresh().await.unwrap();
        assert_eq!(view.snapshot().raw_count, 1);
        assert!(view.snapshot().banner.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bulk_results_after_dispose_are_ignored() {
        let store = MemoryStore::new(shops(3)).with_delay(ms(100));
        let view = Arc::new(memory_view(&store, 0));
        view.refresh().await.unwrap();
        view.select_all_matching();

        let task = {
            let view = view.clone();
            tokio::spawn(async move { view.run_confirmed_bulk_action("delete").await })
        };
        tokio::time::sleep(ms(50)).await;
        view.dispose();

        let result = task.await.unwrap();
        assert!(matches!(result, Err(ViewError::Disposed)));
        // The requests settled but the view never applied them
        assert_eq!(store.len(), 0);
        let snapshot = view.snapshot();
        assert_eq!(snapshot.raw_count, 3);
        assert_eq!(snapshot.selected.len(), 3);
        assert!(snapshot.banner.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overtaken_refresh_reports_superseded() {
        let store = MemoryStore::new(shops(3)).with_delay(ms(100));
        let view = memory_view(&store, 0);

        let (first, second) = tokio::join!(view.refresh(), async {
            tokio::time::sleep(ms(10)).await;
            view.refresh().await
        });

        assert!(matches!(first, Err(ViewError::Superseded)));
        assert_eq!(second.unwrap(), 3);
        assert_eq!(view.snapshot().raw_count, 3);
        assert!(!view.snapshot().loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_refresh_clears_loading() {
        let store = MemoryStore::new(shops(3)).with_delay(ms(100));
        let view = memory_view(&store, 0);
        let mut rx = view.subscribe();

        let outcome = tokio::time::timeout(ms(50), view.refresh()).await;
        assert!(outcome.is_err());

        let snapshot = view.snapshot();
        assert!(!snapshot.loading);
        assert_eq!(snapshot.raw_count, 0);
        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().loading);
    }
}
