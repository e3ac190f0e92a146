//! Bulk action fan-out and the action registry.
//!
//! A bulk action issues one independent request per selected id. All
//! requests start together and the executor waits for every one of them to
//! settle; a failure never aborts or rolls back the others.

use std::future::Future;

use futures::future::join_all;
use shelf_core::{BulkActionDef, BulkActionResult, BulkFailure, MutationError, RecordId};

/// Run `action` for every id concurrently and partition the outcomes.
///
/// `succeeded` and `failed` keep the order of `ids`.
pub async fn run<F, Fut>(ids: Vec<RecordId>, mut action: F) -> BulkActionResult
where
    F: FnMut(RecordId) -> Fut,
    Fut: Future<Output = Result<(), MutationError>>,
{
    let requests: Vec<Fut> = ids.iter().cloned().map(&mut action).collect();
    let outcomes = join_all(requests).await;

    let mut result = BulkActionResult::default();
    for (id, outcome) in ids.into_iter().zip(outcomes) {
        match outcome {
            Ok(()) => result.succeeded.push(id),
            Err(MutationError(reason)) => {
                tracing::debug!("Bulk item {} failed: {}", id, reason);
                result.failed.push(BulkFailure { id, reason });
            }
        }
    }
    result
}

/// Registry of the bulk actions a view offers.
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    actions: Vec<BulkActionDef>,
}

impl ActionRegistry {
    pub fn new(actions: Vec<BulkActionDef>) -> Self {
        Self { actions }
    }

    /// Look up an action by id.
    pub fn get(&self, id: &str) -> Option<&BulkActionDef> {
        self.actions.iter().find(|a| a.id == id)
    }

    /// All registered actions, in declaration order.
    pub fn list(&self) -> &[BulkActionDef] {
        &self.actions
    }

    pub fn exists(&self, id: &str) -> bool {
        self.get(id).is_some()
    }
}
