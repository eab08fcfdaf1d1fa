//! Table snapshots and the row cache they live in.
//!
//! The row cache is owned by the host. The engine only reads a table's
//! snapshot, computes a new one, and hands it back to replace the old one
//! as a whole.

use crate::identifiers::matches;
use crate::{Row, RowIdentifiers, TableId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The rows of one table at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSnapshot {
    pub table_id: TableId,
    pub rows: Vec<Row>,
}

impl TableSnapshot {
    pub fn new(table_id: TableId, rows: Vec<Row>) -> Self {
        Self { table_id, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Count rows created locally and not yet committed.
    pub fn pending_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_pending()).count()
    }

    /// Count rows queued for removal.
    pub fn deleted_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_deleted()).count()
    }

    /// First row matching `identifiers`.
    pub fn find(&self, identifiers: &RowIdentifiers) -> Option<&Row> {
        self.rows.iter().find(|row| matches(*row, identifiers))
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> crate::error::Result<String> {
        serde_json::to_string(self).map_err(|e| crate::Error::InvalidRow(e.to_string()))
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        serde_json::from_str(json).map_err(|e| crate::Error::InvalidRow(e.to_string()))
    }
}

/// Host-side storage of table snapshots.
pub trait RowCache {
    /// Current snapshot of a table, if cached.
    fn snapshot(&self, table_id: TableId) -> Option<TableSnapshot>;

    /// Replace a table's snapshot wholesale.
    fn replace(&mut self, snapshot: TableSnapshot);
}

/// In-memory [`RowCache`].
#[derive(Debug, Clone, Default)]
pub struct MemoryRowCache {
    tables: HashMap<TableId, TableSnapshot>,
}

impl MemoryRowCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, table_id: TableId) -> Option<&TableSnapshot> {
        self.tables.get(&table_id)
    }
}

impl RowCache for MemoryRowCache {
    fn snapshot(&self, table_id: TableId) -> Option<TableSnapshot> {
        self.tables.get(&table_id).cloned()
    }

    fn replace(&mut self, snapshot: TableSnapshot) {
        self.tables.insert(snapshot.table_id, snapshot);
    }
}
