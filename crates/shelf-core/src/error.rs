//! Error types for the Shelf collection view.

use thiserror::Error;

use crate::record::RecordId;

/// Controller errors - surfaced to the caller.
#[derive(Debug, Error)]
pub enum ViewError {
    /// Raw-data retrieval failed. Previous records are retained.
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// A single-row mutation failed.
    #[error("Action on '{id}' failed: {reason}")]
    Mutation { id: RecordId, reason: String },

    /// No bulk action registered under this id.
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// Destructive action invoked without confirmation.
    #[error("Action '{action}' on {count} record(s) requires confirmation")]
    ConfirmationRequired { action: String, count: usize },

    /// Bulk action invoked with nothing selected.
    #[error("Nothing selected")]
    EmptySelection,

    /// A newer refresh started while this one was in flight; its records
    /// were discarded.
    #[error("Fetch superseded by a newer refresh")]
    Superseded,

    /// The controller was disposed while the operation was in flight.
    #[error("View disposed")]
    Disposed,
}

impl From<FetchError> for ViewError {
    fn from(e: FetchError) -> Self {
        ViewError::Fetch(e.0)
    }
}

/// Failure reported by a data fetcher.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct FetchError(pub String);

/// Failure reported by a mutation function.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct MutationError(pub String);

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(String),

    /// Parse error.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Semantically invalid configuration.
    #[error("Invalid config: {0}")]
    Invalid(String),
}
