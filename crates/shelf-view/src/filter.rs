//! Predicate composition over records.
//!
//! A record passes when it matches the search text (if any) AND every
//! active field filter. Unset or malformed matchers exclude nothing.

use shelf_core::{FieldMatcher, FieldValue, FilterSpec, Record};

/// Filters records against a [`FilterSpec`].
///
/// The engine only knows which fields the search text applies to; the rest
/// of the state lives in the spec passed to each call.
#[derive(Debug, Clone, Default)]
pub struct FilterEngine {
    searchable_fields: Vec<String>,
}

impl FilterEngine {
    pub fn new(searchable_fields: Vec<String>) -> Self {
        Self { searchable_fields }
    }

    pub fn searchable_fields(&self) -> &[String] {
        &self.searchable_fields
    }

    /// Records that pass `spec`, in input order.
    pub fn apply(&self, records: &[Record], spec: &FilterSpec) -> Vec<Record> {
        self.matching_indices(records, spec)
            .into_iter()
            .map(|i| records[i].clone())
            .collect()
    }

    /// Indices into `records` that pass `spec`, ascending.
    pub fn matching_indices(&self, records: &[Record], spec: &FilterSpec) -> Vec<usize> {
        let needle = spec.normalized_search().to_lowercase();
        let active: Vec<(&str, &FieldMatcher)> = spec
            .field_filters
            .iter()
            .filter(|(_, m)| m.is_active())
            .map(|(f, m)| (f.as_str(), m))
            .collect();

        records
            .iter()
            .enumerate()
            .filter(|(_, record)| self.matches_search(record, &needle))
            .filter(|(_, record)| {
                active
                    .iter()
                    .all(|(field, matcher)| matches_field(record.get(field), matcher))
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// Whether a single record passes `spec`.
    pub fn matches(&self, record: &Record, spec: &FilterSpec) -> bool {
        let needle = spec.normalized_search().to_lowercase();
        self.matches_search(record, &needle)
            && spec
                .field_filters
                .iter()
                .filter(|(_, m)| m.is_active())
                .all(|(field, matcher)| matches_field(record.get(field), matcher))
    }

    /// `needle` must already be trimmed and lowercased.
    fn matches_search(&self, record: &Record, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        self.searchable_fields.iter().any(|field| {
            record
                .get(field)
                .filter(|v| !v.is_null())
                .is_some_and(|v| v.to_string().to_lowercase().contains(needle))
        })
    }
}

fn matches_field(value: Option<&FieldValue>, matcher: &FieldMatcher) -> bool {
    match matcher {
        FieldMatcher::Equals(expected) => value.is_some_and(|v| values_equal(v, expected)),
        FieldMatcher::Range { min, max } => {
            let Some(n) = value.and_then(FieldValue::as_number) else {
                return false;
            };
            min.map_or(true, |lo| n >= lo) && max.map_or(true, |hi| n <= hi)
        }
        FieldMatcher::Predicate(predicate) => predicate(value.unwrap_or(&FieldValue::Null)),
    }
}

/// Value equality with case-insensitive strings.
///
/// Values of different kinds fall back to comparing their display forms, so
/// a text `"1"` equals the number `1`.
fn values_equal(a: &FieldValue, b: &FieldValue) -> bool {
    match (a, b) {
        (FieldValue::Text(x), FieldValue::Text(y)) => x.to_lowercase() == y.to_lowercase(),
        (FieldValue::Number(x), FieldValue::Number(y)) => x == y,
        (FieldValue::Bool(x), FieldValue::Bool(y)) => x == y,
        (FieldValue::Date(x), FieldValue::Date(y)) => x == y,
        (FieldValue::Null, _) | (_, FieldValue::Null) => false,
        _ => a.to_string().to_lowercase() == b.to_string().to_lowercase(),
    }
}
