//! Stable, type-aware ordering of records.

use std::cmp::Ordering;

use shelf_core::{FieldValue, Record, SortDirection, SortSpec};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Records ordered by `spec`. Equal keys keep their input order.
pub fn apply(records: &[Record], spec: &SortSpec) -> Vec<Record> {
    let mut indices: Vec<usize> = (0..records.len()).collect();
    sort_indices(records, &mut indices, spec);
    indices.into_iter().map(|i| records[i].clone()).collect()
}

/// Reorder `indices` (positions in `records`) by `spec`.
///
/// `slice::sort_by` is stable, so equal-key indices keep their relative
/// order. A `None` key leaves `indices` untouched.
pub fn sort_indices(records: &[Record], indices: &mut [usize], spec: &SortSpec) {
    let Some(key) = spec.key.as_deref() else {
        return;
    };
    indices.sort_by(|&a, &b| {
        compare_values(records[a].get(key), records[b].get(key), spec.direction)
    });
}

/// Compare two field values for a sort.
///
/// Missing and null values always sort last, in either direction.
pub fn compare_values(
    a: Option<&FieldValue>,
    b: Option<&FieldValue>,
    direction: SortDirection,
) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());

    let (a, b) = match (a, b) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Greater,
        (Some(_), None) => return Ordering::Less,
        (Some(a), Some(b)) => (a, b),
    };

    let base = match (a, b) {
        (FieldValue::Text(x), FieldValue::Text(y)) => collate(x, y),
        (FieldValue::Number(x), FieldValue::Number(y)) => {
            x.partial_cmp(y).unwrap_or(Ordering::Equal)
        }
        (FieldValue::Date(x), FieldValue::Date(y)) => x.cmp(y),
        (FieldValue::Bool(x), FieldValue::Bool(y)) => u8::from(*x).cmp(&u8::from(*y)),
        // Mixed kinds: order by kind for a deterministic total order
        (x, y) => kind_rank(x).cmp(&kind_rank(y)),
    };

    match direction {
        SortDirection::Asc => base,
        SortDirection::Desc => base.reverse(),
    }
}

/// Three-level collation: base letters ignoring accents and case, then
/// accents, then code points so the ordering stays total.
fn collate(a: &str, b: &str) -> Ordering {
    base_letters(a)
        .cmp(base_letters(b))
        .then_with(|| case_folded(a).cmp(case_folded(b)))
        .then_with(|| a.cmp(b))
}

/// Canonical decomposition with combining marks dropped, lowercased.
fn base_letters(s: &str) -> impl Iterator<Item = char> + '_ {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
}

fn case_folded(s: &str) -> impl Iterator<Item = char> + '_ {
    s.nfd().flat_map(char::to_lowercase)
}

fn kind_rank(value: &FieldValue) -> u8 {
    match value {
        FieldValue::Bool(_) => 0,
        FieldValue::Number(_) => 1,
        FieldValue::Date(_) => 2,
        FieldValue::Text(_) => 3,
        FieldValue::Null => 4,
    }
}
