//! Queue - the owning container for pending operations.
//!
//! [`upsert`] is the one place an operation enters a queue. The
//! [`OperationQueue`] wraps it together with the resolver so callers cannot
//! reach the underlying vector and break its invariants: one entry per
//! canonical id, the original `old_value` of a re-edited cell, no edits on a
//! row queued for deletion, and no stand-alone edits on pending rows.

use crate::key::canonical_key;
use crate::operation::{DeleteRowPayload, EditCellPayload, NewOp};
use crate::project::replay;
use crate::resolve::{
    resolve_delete, resolve_edit, without_pending_row, DeleteResolution, EditResolution,
};
use crate::snapshot::{RowCache, TableSnapshot};
use crate::{
    error::Result, Error, NewOperation, Operation, OperationId, OperationKind, QueueConfig, Row,
    RowIdentifiers, TableId, Timestamp,
};
use serde::{Deserialize, Serialize};

/// Insert `new_op` into a copy of `queue`, or replace the entry with the same
/// canonical id at its current position.
///
/// When an edit replaces an edit, the existing `old_value` is kept so the
/// queued entry always remembers the value from before any local change.
pub fn upsert(queue: &[Operation], new_op: NewOperation, timestamp: Timestamp) -> Vec<Operation> {
    let mut stamped = new_op.stamp(timestamp);
    let mut updated = queue.to_vec();

    match updated.iter().position(|op| op.id() == stamped.id()) {
        Some(position) => {
            if let (Operation::EditCellContent(existing), Operation::EditCellContent(incoming)) =
                (&updated[position], &mut stamped)
            {
                incoming.payload.old_value = existing.payload.old_value.clone();
            }
            tracing::debug!(op_id = %stamped.id(), position, "replaced queued operation");
            updated[position] = stamped;
        }
        None => {
            tracing::debug!(op_id = %stamped.id(), "appended operation");
            updated.push(stamped);
        }
    }

    updated
}

/// Outcome of [`OperationQueue::enqueue`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Enqueued {
    /// Stored under `id`, either appended or replacing an earlier entry.
    Queued { id: OperationId },
    /// Folded into the pending add with id `id`.
    Merged { id: OperationId },
    /// Delete of a row that never reached the server. Nothing was queued;
    /// `cancelled` operations (its add and edits) were dropped instead.
    Skipped { cancelled: usize },
    /// Refused; the queue is unchanged.
    Rejected { reason: String },
}

/// An ordered queue of pending operations.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationQueue {
    config: QueueConfig,
    operations: Vec<Operation>,
}

impl OperationQueue {
    /// Create an empty queue.
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            operations: Vec::new(),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Resolve and store one UI request.
    pub fn enqueue(&mut self, new_op: NewOperation, now: Timestamp) -> Enqueued {
        match new_op {
            NewOperation::AddRow(add) => Enqueued::Queued {
                id: self.upsert(add.into(), now),
            },
            NewOperation::DeleteRow(delete) => match self.resolve_delete(&delete) {
                DeleteResolution::Skip { filtered } => {
                    let cancelled = self.operations.len() - filtered.len();
                    self.operations = filtered;
                    Enqueued::Skipped { cancelled }
                }
                DeleteResolution::Add { filtered } => {
                    let id = delete.key();
                    self.operations = upsert(&filtered, delete.into(), now);
                    Enqueued::Queued { id }
                }
            },
            NewOperation::EditCellContent(edit) => match self.resolve_edit(&edit, now) {
                EditResolution::Reject { reason } => Enqueued::Rejected { reason },
                EditResolution::Merge { updated } => {
                    let id = pending_add_key(&edit);
                    self.operations = updated;
                    Enqueued::Merged { id }
                }
                EditResolution::Add => Enqueued::Queued {
                    id: self.upsert(edit.into(), now),
                },
            },
        }
    }

    /// Upsert without conflict resolution. Returns the canonical id.
    pub fn upsert(&mut self, new_op: NewOperation, now: Timestamp) -> OperationId {
        let id = new_op.key();
        self.operations = upsert(&self.operations, new_op, now);
        id
    }

    /// Verdict for a delete against the current queue. Does not modify it.
    pub fn resolve_delete(&self, delete: &NewOp<DeleteRowPayload>) -> DeleteResolution {
        resolve_delete(&self.operations, delete)
    }

    /// Verdict for an edit against the current queue. Does not modify it.
    pub fn resolve_edit(&self, edit: &NewOp<EditCellPayload>, now: Timestamp) -> EditResolution {
        resolve_edit(&self.operations, edit, now)
    }

    /// Replay this table's operations onto `base`.
    pub fn replay(&self, table_id: TableId, base: &[Row]) -> Vec<Row> {
        replay(base, self.for_table(table_id), &self.config)
    }

    /// Replace a cached table snapshot with its optimistic projection.
    pub fn refresh<C: RowCache + ?Sized>(&self, cache: &mut C, table_id: TableId) -> Result<()> {
        let snapshot = cache
            .snapshot(table_id)
            .ok_or(Error::TableNotCached(table_id))?;

        let rows = self.replay(table_id, &snapshot.rows);
        cache.replace(TableSnapshot::new(table_id, rows));
        Ok(())
    }

    /// Remove an operation by id.
    pub fn cancel(&mut self, id: &str) -> Option<Operation> {
        let position = self.operations.iter().position(|op| op.id() == id)?;
        Some(self.operations.remove(position))
    }

    /// Undo a row addition: drop the pending add and every edit addressed to
    /// its temp id. Returns the number of operations removed.
    pub fn undo_add(&mut self, table_id: TableId, temp_id: &str) -> usize {
        let filtered = without_pending_row(&self.operations, table_id, temp_id);
        let removed = self.operations.len() - filtered.len();
        self.operations = filtered;
        removed
    }

    /// Undo a row deletion.
    pub fn undo_delete(
        &mut self,
        table_id: TableId,
        identifiers: &RowIdentifiers,
    ) -> Option<Operation> {
        let id = canonical_key(OperationKind::DeleteRow, table_id, None, Some(identifiers), None);
        self.cancel(&id)
    }

    /// Drop operations the server has committed.
    pub fn acknowledge(&mut self, ids: &[OperationId]) {
        self.operations.retain(|op| !ids.contains(op.id()));
    }

    pub fn clear(&mut self) {
        self.operations.clear();
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// All operations, in enqueue order.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn get(&self, id: &str) -> Option<&Operation> {
        self.operations.iter().find(|op| op.id() == id)
    }

    /// Operations on one table, in enqueue order.
    pub fn for_table(&self, table_id: TableId) -> impl Iterator<Item = &Operation> {
        self.operations
            .iter()
            .filter(move |op| op.table_id() == table_id)
    }

    /// Tables with pending work, in order of first appearance.
    pub fn table_ids(&self) -> Vec<TableId> {
        let mut ids = Vec::new();
        for op in &self.operations {
            if !ids.contains(&op.table_id()) {
                ids.push(op.table_id());
            }
        }
        ids
    }
}

fn pending_add_key(edit: &NewOp<EditCellPayload>) -> OperationId {
    match edit.payload.row_identifiers.temp_id() {
        Some(temp_id) => canonical_key(
            OperationKind::AddRow,
            edit.table_id,
            None,
            None,
            Some(temp_id),
        ),
        None => edit.key(),
    }
}
