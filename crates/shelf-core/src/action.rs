//! Bulk action types and user-facing feedback.

use serde::{Deserialize, Serialize};

use crate::record::RecordId;

/// A declared bulk action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkActionDef {
    /// Identifier passed to the mutation function.
    pub id: String,

    /// Display text.
    pub label: String,

    /// Destructive actions need explicit confirmation before they run.
    #[serde(default)]
    pub destructive: bool,
}

impl BulkActionDef {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            destructive: false,
        }
    }

    pub fn destructive(mut self) -> Self {
        self.destructive = true;
        self
    }
}

/// One failed id of a bulk action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkFailure {
    pub id: RecordId,
    pub reason: String,
}

/// Per-item outcome of a bulk action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkActionResult {
    pub succeeded: Vec<RecordId>,
    pub failed: Vec<BulkFailure>,
}

impl BulkActionResult {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Some but not all items failed.
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty() && !self.succeeded.is_empty()
    }
}

/// Transient banner shown above the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Banner {
    /// Fetch failed; the previous records are still shown.
    FetchFailed { reason: String },

    /// A bulk action settled.
    ///
    /// `fetch_error` is set when the refetch after the action failed, in
    /// which case the list still shows the records from before the action.
    BulkCompleted {
        action: String,
        succeeded: usize,
        failed: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fetch_error: Option<String>,
    },

    /// A single-row action failed.
    RowActionFailed { id: RecordId, reason: String },
}

impl Banner {
    pub fn is_error(&self) -> bool {
        match self {
            Banner::FetchFailed { .. } | Banner::RowActionFailed { .. } => true,
            Banner::BulkCompleted {
                failed,
                fetch_error,
                ..
            } => *failed > 0 || fetch_error.is_some(),
        }
    }

    /// One-line human readable message.
    pub fn message(&self) -> String {
        match self {
            Banner::FetchFailed { reason } => {
                format!("Could not refresh the list: {}", reason)
            }
            Banner::BulkCompleted {
                action,
                succeeded,
                failed,
                fetch_error,
            } => {
                let mut message = if *failed == 0 {
                    format!("{}: {} succeeded", action, succeeded)
                } else {
                    format!("{}: {} succeeded, {} failed", action, succeeded, failed)
                };
                if let Some(reason) = fetch_error {
                    message.push_str(&format!("; could not refresh the list: {}", reason));
                }
                message
            }
            Banner::RowActionFailed { id, reason } => {
                format!("Action on {} failed: {}", id, reason)
            }
        }
    }
}
