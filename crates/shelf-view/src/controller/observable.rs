//! Observable view state with automatic change notifications.
//!
//! Mutation = notification. Every dispatched action also broadcasts the new
//! snapshot, so callers cannot change the state without notifying
//! subscribers.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

use super::state::{ViewAction, ViewSnapshot, ViewState};

/// View state behind a lock, broadcasting a snapshot after every action.
///
/// Uses `parking_lot::Mutex` for the state (never poisons) and
/// `tokio::sync::watch` for broadcasts. The liveness flag is checked before
/// every dispatch; once the owner disposes the view, late results from
/// timers or in-flight requests are discarded.
pub(crate) struct ObservableState {
    inner: Mutex<ViewState>,
    alive: AtomicBool,
    tx: watch::Sender<ViewSnapshot>,
    /// Kept alive to keep the watch channel open.
    _rx: watch::Receiver<ViewSnapshot>,
}

impl ObservableState {
    pub(crate) fn new(state: ViewState) -> Self {
        let (tx, rx) = watch::channel(state.snapshot());
        Self {
            inner: Mutex::new(state),
            alive: AtomicBool::new(true),
            tx,
            _rx: rx,
        }
    }

    /// Apply an action and broadcast. Returns `false` if disposed.
    pub(crate) fn dispatch(&self, action: ViewAction) -> bool {
        if !self.is_alive() {
            tracing::debug!("View disposed, discarding {}", action_name(&action));
            return false;
        }
        let snapshot = {
            let mut inner = self.inner.lock();
            inner.apply(action);
            inner.snapshot()
        };
        let _ = self.tx.send(snapshot);
        true
    }

    /// Read the state without mutating it.
    pub(crate) fn read<R>(&self, f: impl FnOnce(&ViewState) -> R) -> R {
        let inner = self.inner.lock();
        f(&*inner)
    }

    pub(crate) fn snapshot(&self) -> ViewSnapshot {
        self.inner.lock().snapshot()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ViewSnapshot> {
        self.tx.subscribe()
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Flip the liveness flag. Returns `true` the first time.
    pub(crate) fn kill(&self) -> bool {
        self.alive.swap(false, Ordering::AcqRel)
    }
}

/// Variant name for logging without dumping record payloads.
fn action_name(action: &ViewAction) -> &'static str {
    match action {
        ViewAction::SearchInput(_) => "SearchInput",
        ViewAction::ApplySearch(_) => "ApplySearch",
        ViewAction::SetFieldFilter { .. } => "SetFieldFilter",
        ViewAction::ClearFilters => "ClearFilters",
        ViewAction::SetSort(_) => "SetSort",
        ViewAction::ClearSort => "ClearSort",
        ViewAction::SetPage(_) => "SetPage",
        ViewAction::SetLimit(_) => "SetLimit",
        ViewAction::ToggleSelect(_) => "ToggleSelect",
        ViewAction::SelectAllVisible => "SelectAllVisible",
        ViewAction::SelectAllMatching => "SelectAllMatching",
        ViewAction::ClearSelection => "ClearSelection",
        ViewAction::FetchStarted => "FetchStarted",
        ViewAction::Refreshed(_) => "Refreshed",
        ViewAction::FetchFailed(_) => "FetchFailed",
        ViewAction::FetchCancelled => "FetchCancelled",
        ViewAction::BulkSettled { .. } => "BulkSettled",
        ViewAction::RowActionFailed { .. } => "RowActionFailed",
        ViewAction::DismissBanner => "DismissBanner",
    }
}
