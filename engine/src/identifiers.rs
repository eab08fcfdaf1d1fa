//! Row identifiers and the predicates that match them against rows and
//! queued operations.
//!
//! An identifier set addresses exactly one row: usually its primary key
//! columns, or `{__tempId}` for a row that only exists locally. The empty
//! set is a distinguished invalid state and never matches anything, so a
//! missing primary key can't turn into a mass edit or mass delete.

use crate::{Operation, TableId, TEMP_ID_KEY};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Column name to scalar value, sorted by column name.
///
/// A numeric `__tempId` is stored as its decimal string, the same way
/// [`crate::Row`] reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Value>", into = "BTreeMap<String, Value>")]
pub struct RowIdentifiers(BTreeMap<String, Value>);

impl From<BTreeMap<String, Value>> for RowIdentifiers {
    fn from(map: BTreeMap<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

impl From<RowIdentifiers> for BTreeMap<String, Value> {
    fn from(ids: RowIdentifiers) -> Self {
        ids.0
    }
}

fn normalize(column: &str, value: Value) -> Value {
    match value {
        Value::Number(n) if column == TEMP_ID_KEY => Value::String(n.to_string()),
        other => other,
    }
}

impl RowIdentifiers {
    /// Create an empty (and therefore non-matching) identifier set.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// The identifier set addressing a pending row.
    pub fn for_temp_id(temp_id: impl Into<String>) -> Self {
        let mut ids = Self::new();
        ids.insert(TEMP_ID_KEY, Value::String(temp_id.into()));
        ids
    }

    pub fn insert(&mut self, column: impl Into<String>, value: Value) -> Option<Value> {
        let column = column.into();
        let value = normalize(&column, value);
        self.0.insert(column, value)
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Entries in ordinal column-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// The `__tempId` this set addresses, if it is a string.
    pub fn temp_id(&self) -> Option<&str> {
        self.0.get(TEMP_ID_KEY).and_then(Value::as_str)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for RowIdentifiers {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut ids = Self::new();
        for (column, value) in iter {
            ids.insert(column, value);
        }
        ids
    }
}

/// Anything with named fields an identifier set can be checked against.
pub trait FieldSource {
    /// Look up a field. `None` means absent, which never satisfies an
    /// identifier, not even one whose declared value is `null`.
    fn field(&self, name: &str) -> Option<Cow<'_, Value>>;
}

impl FieldSource for RowIdentifiers {
    fn field(&self, name: &str) -> Option<Cow<'_, Value>> {
        self.0.get(name).map(Cow::Borrowed)
    }
}

impl FieldSource for serde_json::Map<String, Value> {
    fn field(&self, name: &str) -> Option<Cow<'_, Value>> {
        self.get(name).map(Cow::Borrowed)
    }
}

/// Strict equality on identifier values.
///
/// Numbers compare numerically so `1` and `1.0` are equal; everything else
/// compares structurally. Two integers compare exactly, never through `f64`.
pub fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) if x.is_f64() || y.is_f64() => {
            matches!((x.as_f64(), y.as_f64()), (Some(p), Some(q)) if p == q)
        }
        _ => a == b,
    }
}

/// Whether `source` carries every identifier with a strictly equal value.
///
/// Extra fields on `source` are ignored. An empty identifier set matches
/// nothing.
pub fn matches<S: FieldSource + ?Sized>(source: &S, identifiers: &RowIdentifiers) -> bool {
    if identifiers.is_empty() {
        return false;
    }
    identifiers.iter().all(|(key, expected)| {
        source
            .field(key)
            .is_some_and(|actual| strict_eq(&actual, expected))
    })
}

/// Whether a queued operation addresses the row identified by
/// `identifiers` in `table_id`.
///
/// Row additions never match: they have no server identifier yet.
pub fn operation_targets_row(
    op: &Operation,
    table_id: TableId,
    identifiers: &RowIdentifiers,
) -> bool {
    if op.table_id() != table_id {
        return false;
    }
    match op {
        Operation::AddRow(_) => false,
        Operation::EditCellContent(edit) => matches(&edit.payload.row_identifiers, identifiers),
        Operation::DeleteRow(delete) => matches(&delete.payload.row_identifiers, identifiers),
    }
}
