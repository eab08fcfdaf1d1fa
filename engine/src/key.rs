//! Canonical operation keys.
//!
//! A key is the deterministic identity of a queued operation and doubles as
//! its dedup key: two operations with the same key are the same logical
//! change and occupy a single queue slot.
//!
//! Formats:
//! - `add_row:{tableId}:{tempId}`
//! - `delete_row:{tableId}:{ids}`
//! - `edit_cell_content:{tableId}:{columnName}:{ids}`
//!
//! where `{ids}` is the identifier set as `column:value` pairs in ordinal
//! column order joined by `|`. The format is stable within a session but is
//! not a persisted wire format.

use crate::{OperationId, OperationKind, RowIdentifiers, TableId};
use serde_json::Value;

/// Compute the canonical key from the identity-relevant fields.
///
/// Fields irrelevant to `kind` are ignored; missing relevant fields render
/// as empty strings.
pub fn canonical_key(
    kind: OperationKind,
    table_id: TableId,
    column_name: Option<&str>,
    row_identifiers: Option<&RowIdentifiers>,
    temp_id: Option<&str>,
) -> OperationId {
    match kind {
        OperationKind::AddRow => format!("{kind}:{table_id}:{}", temp_id.unwrap_or_default()),
        OperationKind::DeleteRow => {
            format!("{kind}:{table_id}:{}", sorted_identifiers(row_identifiers))
        }
        OperationKind::EditCellContent => format!(
            "{kind}:{table_id}:{}:{}",
            column_name.unwrap_or_default(),
            sorted_identifiers(row_identifiers)
        ),
    }
}

/// Render an identifier set as `k:v|k:v` in ordinal key order.
pub fn sorted_identifiers(row_identifiers: Option<&RowIdentifiers>) -> String {
    let Some(ids) = row_identifiers else {
        return String::new();
    };
    ids.iter()
        .map(|(column, value)| format!("{column}:{}", render_scalar(value)))
        .collect::<Vec<_>>()
        .join("|")
}

/// Render a value the way it appears inside a key.
///
/// Strings are unquoted and integral floats drop their fraction, so `1`
/// and `1.0` produce the same key.
pub fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                return n.to_string();
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{f:.0}"),
                Some(f) => f.to_string(),
                None => n.to_string(),
            }
        }
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
