//! Row types for the locally visible table view.
//!
//! On the wire a row is a flat JSON object: its cells, an `idx` position,
//! and at most one lifecycle marker (`__tempId` or `__isDeleted`). In
//! memory the marker is lifted into [`RowState`] so the two markers can't
//! co-occur.

use crate::identifiers::FieldSource;
use crate::{error::Result, Error, TempId, DELETED_KEY, IDX_KEY, TEMP_ID_KEY};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;

/// Column name to cell value.
pub type Cells = Map<String, Value>;

/// Lifecycle of a row relative to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowState {
    /// Mirrors the server
    Persisted,
    /// Created locally, not yet committed
    Pending { temp_id: TempId },
    /// Persisted row queued for removal, still rendered until commit
    Deleted,
}

/// A row in a table snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Row {
    /// Position in the grid; negative for pending rows
    pub idx: i64,
    /// Column values, without any lifecycle marker
    pub cells: Cells,
    /// Lifecycle marker
    pub state: RowState,
}

impl Row {
    /// Create a row that mirrors the server.
    pub fn persisted(idx: i64, cells: Cells) -> Self {
        Self {
            idx,
            cells: strip_markers(cells),
            state: RowState::Persisted,
        }
    }

    /// Create a locally added row.
    pub fn pending(temp_id: impl Into<TempId>, idx: i64, cells: Cells) -> Self {
        Self {
            idx,
            cells: strip_markers(cells),
            state: RowState::Pending {
                temp_id: temp_id.into(),
            },
        }
    }

    /// Build the pending row described by an add operation's row data.
    ///
    /// Row data may carry its own `idx`; otherwise `fallback_idx` is used.
    pub fn from_row_data(temp_id: impl Into<TempId>, row_data: &Cells, fallback_idx: i64) -> Self {
        let idx = row_data
            .get(IDX_KEY)
            .and_then(Value::as_i64)
            .unwrap_or(fallback_idx);
        Self::pending(temp_id, idx, row_data.clone())
    }

    /// Parse a row from its flat JSON form.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Self::try_from(map),
            other => Err(Error::InvalidRow(format!("expected object, got {other}"))),
        }
    }

    /// The temp id of a pending row.
    pub fn temp_id(&self) -> Option<&str> {
        match &self.state {
            RowState::Pending { temp_id } => Some(temp_id),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, RowState::Pending { .. })
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self.state, RowState::Deleted)
    }

    /// Get a cell value.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells.get(column)
    }

    /// Copy of this row with one cell replaced.
    pub fn with_cell(&self, column: &str, value: Value) -> Self {
        let mut row = self.clone();
        row.set_cell(column, value);
        row
    }

    /// Set a cell. Marker names are not cells and are ignored.
    pub fn set_cell(&mut self, column: &str, value: Value) {
        if is_marker(column) {
            return;
        }
        self.cells.insert(column.to_string(), value);
    }

    /// Overlay `cells` onto this row's cells.
    pub fn merge_cells(&mut self, cells: &Cells) {
        for (column, value) in cells {
            self.set_cell(column, value.clone());
        }
    }

    /// Queue a persisted row for removal. Pending rows can't be marked.
    pub fn mark_deleted(&mut self) {
        if matches!(self.state, RowState::Persisted) {
            self.state = RowState::Deleted;
        }
    }

    /// Clear the deleted marker.
    pub fn restore(&mut self) {
        if matches!(self.state, RowState::Deleted) {
            self.state = RowState::Persisted;
        }
    }
}

impl FieldSource for Row {
    fn field(&self, name: &str) -> Option<Cow<'_, Value>> {
        match name {
            IDX_KEY => Some(Cow::Owned(Value::from(self.idx))),
            TEMP_ID_KEY => self
                .temp_id()
                .map(|temp_id| Cow::Owned(Value::String(temp_id.to_string()))),
            DELETED_KEY => self.is_deleted().then(|| Cow::Owned(Value::Bool(true))),
            _ => self.cells.get(name).map(Cow::Borrowed),
        }
    }
}

impl TryFrom<Map<String, Value>> for Row {
    type Error = Error;

    fn try_from(mut map: Map<String, Value>) -> Result<Self> {
        let idx = match map.remove(IDX_KEY) {
            Some(value) => value
                .as_i64()
                .ok_or_else(|| Error::InvalidRow(format!("idx is not an integer: {value}")))?,
            None => return Err(Error::InvalidRow("missing idx".into())),
        };

        let temp_id = match map.remove(TEMP_ID_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(other) => {
                return Err(Error::InvalidRow(format!(
                    "{TEMP_ID_KEY} must be a string, got {other}"
                )))
            }
        };

        let deleted = match map.remove(DELETED_KEY) {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => b,
            Some(other) => {
                return Err(Error::InvalidRow(format!(
                    "{DELETED_KEY} must be a boolean, got {other}"
                )))
            }
        };

        let state = match (temp_id, deleted) {
            (Some(_), true) => {
                return Err(Error::InvalidRow(format!(
                    "row carries both {TEMP_ID_KEY} and {DELETED_KEY}"
                )))
            }
            (Some(temp_id), false) => RowState::Pending { temp_id },
            (None, true) => RowState::Deleted,
            (None, false) => RowState::Persisted,
        };

        Ok(Self {
            idx,
            cells: map,
            state,
        })
    }
}

impl From<Row> for Map<String, Value> {
    fn from(row: Row) -> Self {
        let mut map = row.cells;
        map.insert(IDX_KEY.to_string(), Value::from(row.idx));
        match row.state {
            RowState::Persisted => {}
            RowState::Pending { temp_id } => {
                map.insert(TEMP_ID_KEY.to_string(), Value::String(temp_id));
            }
            RowState::Deleted => {
                map.insert(DELETED_KEY.to_string(), Value::Bool(true));
            }
        }
        map
    }
}

fn is_marker(column: &str) -> bool {
    matches!(column, IDX_KEY | TEMP_ID_KEY | DELETED_KEY)
}

fn strip_markers(mut cells: Cells) -> Cells {
    cells.retain(|column, _| !is_marker(column));
    cells
}
