//! Collection view controller for Shelf.
//!
//! This crate turns a raw, fetched record set into the view a list screen
//! renders:
//! - Free-text search and per-field filters
//! - Stable sorting with nulls last
//! - Clamped pagination
//! - Selection that survives paging and prunes on refilter
//! - Debounced search input
//! - Concurrent bulk actions with partial-failure reporting
//!
//! [`CollectionView`] owns the state and composes the pieces. The pieces
//! are also usable on their own.

pub mod bulk;
pub mod controller;
pub mod debounce;
pub mod filter;
pub mod paginate;
pub mod selection;
pub mod sort;
pub mod source;

pub use bulk::ActionRegistry;
pub use controller::{CollectionView, ViewAction, ViewSnapshot, ViewState};
pub use debounce::Debouncer;
pub use filter::FilterEngine;
pub use selection::SelectionTracker;
pub use source::{DataFetcher, ListQuery, MemoryStore, Mutator};
