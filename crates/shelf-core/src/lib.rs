//! Core types for the Shelf collection view.
//!
//! This crate contains shared data structures that are used across all Shelf crates:
//! - Records, identifiers and field values
//! - Filter and sort descriptions
//! - Pagination state
//! - Bulk action results and banners
//! - Configuration types
//! - Error types

mod action;
mod config;
mod error;
mod page;
mod query;
mod record;

pub use action::{Banner, BulkActionDef, BulkActionResult, BulkFailure};
pub use config::{config_dir, default_config_path, ViewConfig};
pub use error::{ConfigError, FetchError, MutationError, ViewError};
pub use page::PaginationState;
pub use query::{FieldMatcher, FieldPredicate, FilterSpec, SortDirection, SortSpec};
pub use record::{FieldValue, Record, RecordId};
