//! Conflict resolution for incoming operations.
//!
//! Before a delete or an edit is queued it is checked against what is
//! already pending. Row additions never conflict and go straight to
//! [`crate::upsert`].
//!
//! # Deletes
//!
//! 1. Deleting a pending row (one that carries a temp id) resolves to
//!    [`DeleteResolution::Skip`]: the row never reached the server, so its
//!    add and every edit addressed to its temp id are dropped and the delete
//!    itself is never queued.
//! 2. Deleting a persisted row resolves to [`DeleteResolution::Add`] with
//!    every queued operation targeting that row removed. Edits to a row
//!    about to be deleted are moot.
//!
//! # Edits
//!
//! 1. An edit on a row with a queued delete is rejected.
//! 2. An edit on a pending row is folded into the row's add.
//! 3. Anything else is queued as its own operation.

use crate::identifiers::{matches, operation_targets_row};
use crate::key::canonical_key;
use crate::operation::{DeleteRowPayload, EditCellPayload, NewOp};
use crate::{Operation, OperationKind, TableId, Timestamp};
use serde::{Deserialize, Serialize};

/// Reason attached to an edit rejected because its row is pending deletion.
pub const PENDING_DELETION_REASON: &str =
    "cannot edit a row pending deletion; remove the delete operation first";

/// Verdict for an incoming delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum DeleteResolution {
    /// The row was never persisted. `filtered` is the queue without its add
    /// and edits; the delete must not be queued.
    Skip { filtered: Vec<Operation> },
    /// The delete should be queued on top of `filtered`, which no longer
    /// holds operations targeting the row.
    Add { filtered: Vec<Operation> },
}

impl DeleteResolution {
    pub fn filtered(&self) -> &[Operation] {
        match self {
            DeleteResolution::Skip { filtered } | DeleteResolution::Add { filtered } => filtered,
        }
    }

    pub fn into_filtered(self) -> Vec<Operation> {
        match self {
            DeleteResolution::Skip { filtered } | DeleteResolution::Add { filtered } => filtered,
        }
    }
}

/// Verdict for an incoming cell edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum EditResolution {
    /// The edit contradicts the queue. The caller surfaces `reason` and
    /// leaves the queue unchanged.
    Reject { reason: String },
    /// The edit was folded into a pending row's add. `updated` replaces the
    /// queue.
    Merge { updated: Vec<Operation> },
    /// The edit should be upserted as its own operation.
    Add,
}

/// Resolve an incoming delete against the queue.
pub fn resolve_delete(queue: &[Operation], delete: &NewOp<DeleteRowPayload>) -> DeleteResolution {
    let table_id = delete.table_id;

    if let Some(temp_id) = delete.payload.original_row.temp_id() {
        let filtered = without_pending_row(queue, table_id, temp_id);

        tracing::debug!(
            table_id,
            temp_id,
            dropped = queue.len() - filtered.len(),
            "delete of pending row cancels its add"
        );
        return DeleteResolution::Skip { filtered };
    }

    let identifiers = &delete.payload.row_identifiers;
    let filtered: Vec<Operation> = queue
        .iter()
        .filter(|op| !operation_targets_row(op, table_id, identifiers))
        .cloned()
        .collect();

    tracing::debug!(
        table_id,
        dropped = queue.len() - filtered.len(),
        "delete of persisted row supersedes queued operations on it"
    );
    DeleteResolution::Add { filtered }
}

/// The queue without the add of pending row `temp_id` and without any edit
/// addressed to that temp id.
pub fn without_pending_row(queue: &[Operation], table_id: TableId, temp_id: &str) -> Vec<Operation> {
    let add_id = canonical_key(OperationKind::AddRow, table_id, None, None, Some(temp_id));
    queue
        .iter()
        .filter(|op| match op {
            Operation::AddRow(add) => add.id != add_id,
            Operation::EditCellContent(edit) => {
                edit.payload.row_identifiers.temp_id() != Some(temp_id)
            }
            Operation::DeleteRow(_) => true,
        })
        .cloned()
        .collect()
}

/// Resolve an incoming cell edit against the queue.
///
/// `timestamp` refreshes the add operation when the edit is merged into it.
pub fn resolve_edit(
    queue: &[Operation],
    edit: &NewOp<EditCellPayload>,
    timestamp: Timestamp,
) -> EditResolution {
    let table_id = edit.table_id;
    let identifiers = &edit.payload.row_identifiers;

    let pending_deletion = queue.iter().any(|op| match op {
        Operation::DeleteRow(delete) => {
            delete.table_id == table_id && matches(identifiers, &delete.payload.row_identifiers)
        }
        Operation::AddRow(_) | Operation::EditCellContent(_) => false,
    });
    if pending_deletion {
        tracing::debug!(table_id, column = %edit.payload.column_name, "edit rejected");
        return EditResolution::Reject {
            reason: PENDING_DELETION_REASON.to_string(),
        };
    }

    let Some(temp_id) = identifiers.temp_id() else {
        return EditResolution::Add;
    };

    let add_position = queue.iter().position(|op| match op {
        Operation::AddRow(add) => add.table_id == table_id && add.payload.temp_id == temp_id,
        Operation::EditCellContent(_) | Operation::DeleteRow(_) => false,
    });

    match add_position {
        Some(position) => {
            let mut updated = queue.to_vec();
            if let Operation::AddRow(add) = &mut updated[position] {
                add.payload.row_data.insert(
                    edit.payload.column_name.clone(),
                    edit.payload.new_value.clone(),
                );
                add.timestamp = timestamp;
            }
            tracing::debug!(table_id, temp_id, "edit merged into pending add");
            EditResolution::Merge { updated }
        }
        None => {
            // The add is gone (committed or cancelled); the edit is queued
            // under a temp id nothing else will ever match.
            tracing::warn!(table_id, temp_id, "edit addresses unknown pending row");
            EditResolution::Add
        }
    }
}
