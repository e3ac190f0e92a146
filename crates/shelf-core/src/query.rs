//! Declarative filter and sort state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::record::FieldValue;

/// Shared predicate over a single field value.
pub type FieldPredicate = Arc<dyn Fn(&FieldValue) -> bool + Send + Sync>;

/// How a single field is matched.
#[derive(Clone)]
pub enum FieldMatcher {
    /// Value equality. Strings compare case-insensitively.
    Equals(FieldValue),

    /// Inclusive numeric range. A missing bound is open.
    Range { min: Option<f64>, max: Option<f64> },

    /// Arbitrary caller predicate.
    Predicate(FieldPredicate),
}

impl FieldMatcher {
    pub fn equals(value: impl Into<FieldValue>) -> Self {
        FieldMatcher::Equals(value.into())
    }

    pub fn range(min: Option<f64>, max: Option<f64>) -> Self {
        FieldMatcher::Range { min, max }
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&FieldValue) -> bool + Send + Sync + 'static,
    {
        FieldMatcher::Predicate(Arc::new(f))
    }

    /// Whether this matcher can exclude anything.
    ///
    /// An equality against `Null`, a range with no bounds, or a range whose
    /// bounds are NaN or inverted is unset.
    pub fn is_active(&self) -> bool {
        match self {
            FieldMatcher::Equals(value) => !value.is_null(),
            FieldMatcher::Range { min, max } => {
                if min.is_none() && max.is_none() {
                    return false;
                }
                self.is_well_formed()
            }
            FieldMatcher::Predicate(_) => true,
        }
    }

    /// False only for ranges with NaN or inverted bounds.
    pub fn is_well_formed(&self) -> bool {
        match self {
            FieldMatcher::Range { min, max } => {
                if min.is_some_and(f64::is_nan) || max.is_some_and(f64::is_nan) {
                    return false;
                }
                match (min, max) {
                    (Some(lo), Some(hi)) => lo <= hi,
                    _ => true,
                }
            }
            _ => true,
        }
    }
}

impl fmt::Debug for FieldMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldMatcher::Equals(v) => f.debug_tuple("Equals").field(v).finish(),
            FieldMatcher::Range { min, max } => f
                .debug_struct("Range")
                .field("min", min)
                .field("max", max)
                .finish(),
            FieldMatcher::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Active search and per-field filters.
///
/// An empty `FilterSpec` matches every record.
#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
    pub search_text: String,
    pub field_filters: BTreeMap<String, FieldMatcher>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, text: impl Into<String>) -> Self {
        self.search_text = text.into();
        self
    }

    pub fn with_filter(mut self, field: impl Into<String>, matcher: FieldMatcher) -> Self {
        self.field_filters.insert(field.into(), matcher);
        self
    }

    /// Search text with surrounding whitespace removed.
    pub fn normalized_search(&self) -> &str {
        self.search_text.trim()
    }

    /// True when nothing can be excluded.
    pub fn is_empty(&self) -> bool {
        self.normalized_search().is_empty() && !self.field_filters.values().any(|m| m.is_active())
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Active ordering. `key = None` preserves input order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SortSpec {
    pub key: Option<String>,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn by(key: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            key: Some(key.into()),
            direction,
        }
    }

    /// Request a sort on `key`.
    ///
    /// The same key flips the direction; a new key starts ascending.
    pub fn toggle(&mut self, key: &str) {
        if self.key.as_deref() == Some(key) {
            self.direction = self.direction.flipped();
        } else {
            self.key = Some(key.to_string());
            self.direction = SortDirection::Asc;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_spec() {
        assert!(FilterSpec::new().is_empty());
        assert!(FilterSpec::new().with_search("   ").is_empty());
        assert!(!FilterSpec::new().with_search("abc").is_empty());
    }

    #[test]
    fn test_unset_matchers_are_inactive() {
        assert!(!FieldMatcher::Equals(FieldValue::Null).is_active());
        assert!(!FieldMatcher::range(None, None).is_active());
        assert!(!FieldMatcher::range(Some(5.0), Some(1.0)).is_active());
        assert!(!FieldMatcher::range(Some(f64::NAN), None).is_active());
        assert!(FieldMatcher::range(Some(1.0), None).is_active());
        assert!(FieldMatcher::equals("active").is_active());

        let spec = FilterSpec::new().with_filter("price", FieldMatcher::range(None, None));
        assert!(spec.is_empty());
    }

    #[test]
    fn test_sort_toggle() {
        let mut sort = SortSpec::default();
        assert_eq!(sort.key, None);

        sort.toggle("name");
        assert_eq!(sort, SortSpec::by("name", SortDirection::Asc));

        sort.toggle("name");
        assert_eq!(sort.direction, SortDirection::Desc);

        // New key resets to ascending
        sort.toggle("price");
        assert_eq!(sort, SortSpec::by("price", SortDirection::Asc));
    }
}
