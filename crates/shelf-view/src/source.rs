//! Collaborators that supply and mutate records.
//!
//! The controller never talks to a transport directly. It asks a
//! [`DataFetcher`] for the raw record set and a [`Mutator`] to perform one
//! unit of work per id. Both return boxed futures so callers can spawn them
//! however they like and tests can substitute mocks.

use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use shelf_core::{FetchError, FieldValue, MutationError, Record, RecordId};

/// Caller-defined list query forwarded to the fetcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Applied search text, if any.
    pub search: Option<String>,

    /// Free-form parameters (status, category, ...).
    pub params: BTreeMap<String, String>,
}

impl ListQuery {
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// Supplies the raw record set.
#[cfg_attr(test, mockall::automock)]
pub trait DataFetcher: Send + Sync {
    fn list(&self, query: &ListQuery) -> BoxFuture<'static, Result<Vec<Record>, FetchError>>;
}

/// Performs one unit of work on one record.
///
/// Failures carry a human-readable reason.
#[cfg_attr(test, mockall::automock)]
pub trait Mutator: Send + Sync {
    fn mutate(&self, id: &RecordId, action: &str) -> BoxFuture<'static, Result<(), MutationError>>;
}

// =============================================================================
// Memory Store
// =============================================================================

/// In-memory record store implementing both collaborators.
///
/// Supported actions:
/// - `delete` removes the record
/// - `set:<field>=<value>` sets a field, parsing the value loosely
///
/// Failures can be injected per id or for the next fetches.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<Vec<Record>>>,
    failures: Arc<Mutex<HashMap<RecordId, String>>>,
    fetch_failure: Arc<Mutex<Option<String>>>,
    delay: Duration,
}

impl MemoryStore {
    /// Create a store holding `records`.
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
            ..Self::default()
        }
    }

    /// Parse a JSON array of records.
    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        let records: Vec<Record> = serde_json::from_str(source)?;
        Ok(Self::new(records))
    }

    /// Make every mutation of `id` fail with `reason`.
    pub fn with_failure(self, id: impl Into<RecordId>, reason: impl Into<String>) -> Self {
        self.failures.lock().insert(id.into(), reason.into());
        self
    }

    /// Delay every fetch and mutation.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Make fetches fail with `reason` until cleared with `None`.
    pub fn set_fetch_failure(&self, reason: Option<String>) {
        *self.fetch_failure.lock() = reason;
    }

    /// Snapshot of the stored records.
    pub fn records(&self) -> Vec<Record> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    fn apply(&self, id: &RecordId, action: &str) -> Result<(), MutationError> {
        if let Some(reason) = self.failures.lock().get(id) {
            return Err(MutationError(reason.clone()));
        }

        let mut records = self.records.lock();
        let Some(pos) = records.iter().position(|r| &r.id == id) else {
            return Err(MutationError(format!("record '{}' not found", id)));
        };

        if action == "delete" {
            records.remove(pos);
            return Ok(());
        }

        if let Some(assignment) = action.strip_prefix("set:") {
            let (field, value) = assignment
                .split_once('=')
                .ok_or_else(|| MutationError(format!("malformed action '{}'", action)))?;
            records[pos].set(field.trim(), FieldValue::parse(value));
            return Ok(());
        }

        Err(MutationError(format!("unsupported action '{}'", action)))
    }
}

impl DataFetcher for MemoryStore {
    fn list(&self, _query: &ListQuery) -> BoxFuture<'static, Result<Vec<Record>, FetchError>> {
        let store = self.clone();
        Box::pin(async move {
            if !store.delay.is_zero() {
                tokio::time::sleep(store.delay).await;
            }
            if let Some(reason) = store.fetch_failure.lock().clone() {
                return Err(FetchError(reason));
            }
            Ok(store.records())
        })
    }
}

impl Mutator for MemoryStore {
    fn mutate(&self, id: &RecordId, action: &str) -> BoxFuture<'static, Result<(), MutationError>> {
        let store = self.clone();
        let id = id.clone();
        let action = action.to_string();
        Box::pin(async move {
            if !store.delay.is_zero() {
                tokio::time::sleep(store.delay).await;
            }
            store.apply(&id, &action)
        })
    }
}
