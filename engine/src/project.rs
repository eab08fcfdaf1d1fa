//! Optimistic projection of queued operations onto a row snapshot.
//!
//! [`replay`] rebuilds the locally visible table whenever fresh rows arrive
//! from the server. The single-step helpers give immediate feedback for one
//! UI action without a full replay. All of them take a row slice and return
//! a new vector; the input is never touched.

use crate::identifiers::matches;
use crate::{Cells, Operation, QueueConfig, Row, RowIdentifiers};
use serde_json::Value;

/// Fold `operations` over `base`, strictly in the given order.
///
/// Order matters: an edit replayed before its row's add would find nothing
/// to edit, and a delete replayed early could be undone by a later add.
pub fn replay<'a>(
    base: &[Row],
    operations: impl IntoIterator<Item = &'a Operation>,
    config: &QueueConfig,
) -> Vec<Row> {
    let mut rows = base.to_vec();
    let mut applied = 0usize;
    for op in operations {
        apply_in_place(&mut rows, op, config);
        applied += 1;
    }
    tracing::trace!(applied, rows = rows.len(), "replayed queue onto snapshot");
    rows
}

fn apply_in_place(rows: &mut Vec<Row>, op: &Operation, config: &QueueConfig) {
    match op {
        Operation::AddRow(add) => upsert_pending_in_place(
            rows,
            &add.payload.temp_id,
            &add.payload.row_data,
            config.pending_row_idx,
        ),
        Operation::EditCellContent(edit) => edit_in_place(
            rows,
            &edit.payload.row_identifiers,
            &edit.payload.column_name,
            &edit.payload.new_value,
        ),
        Operation::DeleteRow(delete) => delete_in_place(rows, &delete.payload.row_identifiers),
    }
}

/// Set `column` to `value` on every row matching `identifiers`.
pub fn apply_cell_edit(
    rows: &[Row],
    identifiers: &RowIdentifiers,
    column: &str,
    value: &Value,
) -> Vec<Row> {
    let mut rows = rows.to_vec();
    edit_in_place(&mut rows, identifiers, column, value);
    rows
}

/// Insert pending row `temp_id` at the front, or merge `row_data` into it if
/// it is already present.
pub fn upsert_pending_row(
    rows: &[Row],
    temp_id: &str,
    row_data: &Cells,
    pending_row_idx: i64,
) -> Vec<Row> {
    let mut rows = rows.to_vec();
    upsert_pending_in_place(&mut rows, temp_id, row_data, pending_row_idx);
    rows
}

/// Mark persisted rows matching `identifiers` deleted. Matching pending
/// rows are removed instead, since a pending row is never marked.
pub fn mark_rows_deleted(rows: &[Row], identifiers: &RowIdentifiers) -> Vec<Row> {
    let mut rows = rows.to_vec();
    delete_in_place(&mut rows, identifiers);
    rows
}

/// Drop pending row `temp_id` (undo of an add).
pub fn remove_pending_row(rows: &[Row], temp_id: &str) -> Vec<Row> {
    rows.iter()
        .filter(|row| row.temp_id() != Some(temp_id))
        .cloned()
        .collect()
}

/// Clear the deleted marker on rows matching `identifiers` (undo of a
/// delete).
pub fn restore_deleted_rows(rows: &[Row], identifiers: &RowIdentifiers) -> Vec<Row> {
    rows.iter()
        .map(|row| {
            let mut row = row.clone();
            if row.is_deleted() && matches(&row, identifiers) {
                row.restore();
            }
            row
        })
        .collect()
}

fn edit_in_place(rows: &mut [Row], identifiers: &RowIdentifiers, column: &str, value: &Value) {
    for row in rows.iter_mut().filter(|row| matches(&**row, identifiers)) {
        row.set_cell(column, value.clone());
    }
}

fn upsert_pending_in_place(
    rows: &mut Vec<Row>,
    temp_id: &str,
    row_data: &Cells,
    pending_row_idx: i64,
) {
    match rows.iter_mut().find(|row| row.temp_id() == Some(temp_id)) {
        Some(existing) => existing.merge_cells(row_data),
        None => rows.insert(0, Row::from_row_data(temp_id, row_data, pending_row_idx)),
    }
}

fn delete_in_place(rows: &mut Vec<Row>, identifiers: &RowIdentifiers) {
    rows.retain(|row| !(row.is_pending() && matches(row, identifiers)));
    for row in rows.iter_mut().filter(|row| matches(&**row, identifiers)) {
        row.mark_deleted();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NewOperation, RowState, TableRef};
    use serde_json::json;

    fn table() -> TableRef {
        TableRef::new(1, "public", "users").with_primary_keys(["id"])
    }

    fn row(value: Value) -> Row {
        Row::from_value(value).unwrap()
    }

    fn cells(value: Value) -> Cells {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn id(n: i64) -> RowIdentifiers {
        [("id", json!(n))].into_iter().collect()
    }

    fn base_rows() -> Vec<Row> {
        vec![
            row(json!({"idx": 0, "id": 1, "name": "Alice"})),
            row(json!({"idx": 1, "id": 2, "name": "Bob"})),
        ]
    }

    #[test]
    fn replay_empty_queue_is_identity() {
        let rows = base_rows();
        let queue: Vec<Operation> = Vec::new();
        assert_eq!(replay(&rows, &queue, &QueueConfig::default()), rows);
    }

    #[test]
    fn replay_add_inserts_at_front() {
        let ops = vec![
            NewOperation::add_row(table(), "-7", cells(json!({"name": "Carol"}))).stamp(1000),
        ];
        let rows = replay(&base_rows(), &ops, &QueueConfig::default());

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].temp_id(), Some("-7"));
        assert_eq!(rows[0].idx, -1);
        assert_eq!(rows[0].get("name"), Some(&json!("Carol")));
    }

    #[test]
    fn replay_add_merges_into_existing_pending_row() {
        let mut rows = base_rows();
        rows.insert(0, row(json!({"idx": -7, "__tempId": "-7", "name": "old", "age": 3})));
        let ops = vec![
            NewOperation::add_row(table(), "-7", cells(json!({"name": "Carol"}))).stamp(1000),
        ];

        let rows = replay(&rows, &ops, &QueueConfig::default());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].idx, -7);
        assert_eq!(rows[0].get("name"), Some(&json!("Carol")));
        assert_eq!(rows[0].get("age"), Some(&json!(3)));
    }

    #[test]
    fn replay_edit_and_delete() {
        let ops = vec![
            NewOperation::edit_cell(table(), id(1), "name", json!("Alice"), json!("Alicia"))
                .stamp(1000),
            NewOperation::delete_row(table(), base_rows()[1].clone()).stamp(1001),
        ];
        let base = base_rows();
        let rows = replay(&base, &ops, &QueueConfig::default());

        assert_eq!(rows[0].get("name"), Some(&json!("Alicia")));
        assert_eq!(rows[0].state, RowState::Persisted);
        assert!(rows[1].is_deleted());
        // base untouched
        assert_eq!(base, base_rows());
    }

    #[test]
    fn replay_respects_order() {
        let add = NewOperation::add_row(table(), "-1", cells(json!({"name": "new"}))).stamp(1000);
        let edit = NewOperation::edit_cell(
            table(),
            RowIdentifiers::for_temp_id("-1"),
            "name",
            json!("new"),
            json!("edited"),
        )
        .stamp(1001);

        let in_order = replay(&[], [&add, &edit], &QueueConfig::default());
        assert_eq!(in_order[0].get("name"), Some(&json!("edited")));

        let reversed = replay(&[], [&edit, &add], &QueueConfig::default());
        assert_eq!(reversed[0].get("name"), Some(&json!("new")));
    }

    #[test]
    fn edit_with_empty_identifiers_touches_nothing() {
        let rows = apply_cell_edit(&base_rows(), &RowIdentifiers::new(), "name", &json!("X"));
        assert_eq!(rows, base_rows());
    }

    #[test]
    fn delete_removes_pending_rows() {
        let rows = upsert_pending_row(&base_rows(), "-3", &cells(json!({"name": "tmp"})), -1);
        assert_eq!(rows.len(), 3);

        let rows = mark_rows_deleted(&rows, &RowIdentifiers::for_temp_id("-3"));
        assert_eq!(rows, base_rows());
    }

    #[test]
    fn undo_helpers() {
        let rows = upsert_pending_row(&base_rows(), "-3", &cells(json!({"name": "tmp"})), -1);
        assert_eq!(remove_pending_row(&rows, "-3"), base_rows());

        let deleted = mark_rows_deleted(&base_rows(), &id(2));
        assert!(deleted[1].is_deleted());
        let restored = restore_deleted_rows(&deleted, &id(2));
        assert_eq!(restored, base_rows());
    }

    #[test]
    fn single_step_helpers_do_not_mutate_input() {
        let rows = base_rows();
        let _ = apply_cell_edit(&rows, &id(1), "name", &json!("Z"));
        let _ = mark_rows_deleted(&rows, &id(1));
        assert_eq!(rows, base_rows());
    }
}
