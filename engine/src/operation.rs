//! Operation types for expressing pending changes.
//!
//! Every change a user makes in the grid is recorded as an operation before
//! it is committed. A [`NewOperation`] is what the UI submits; once admitted
//! to the queue it becomes an [`Operation`] stamped with its canonical id and
//! the time it was last modified.

use crate::key::canonical_key;
use crate::{
    error::Result, Cells, Error, OperationId, Row, RowIdentifiers, TableId, TableRef, TempId,
    Timestamp,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Discriminant of the operation union.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    AddRow,
    EditCellContent,
    DeleteRow,
}

impl OperationKind {
    pub const ALL: [OperationKind; 3] = [
        OperationKind::AddRow,
        OperationKind::EditCellContent,
        OperationKind::DeleteRow,
    ];

    /// Wire tag of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::AddRow => "add_row",
            OperationKind::EditCellContent => "edit_cell_content",
            OperationKind::DeleteRow => "delete_row",
        }
    }

    /// Parse a wire tag.
    pub fn from_tag(tag: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == tag)
            .ok_or_else(|| Error::UnknownOperationType(tag.to_string()))
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a row addition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRowPayload {
    /// Local handle of the new row until it is committed
    pub temp_id: TempId,
    /// Initial cell values
    pub row_data: Cells,
    pub table: TableRef,
}

/// Payload of a single cell edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditCellPayload {
    pub row_identifiers: RowIdentifiers,
    pub column_name: String,
    /// Value before any locally queued edit of this cell
    #[serde(default)]
    pub old_value: Value,
    #[serde(default)]
    pub new_value: Value,
    pub table: TableRef,
}

/// Payload of a row deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRowPayload {
    pub row_identifiers: RowIdentifiers,
    /// The row as it was displayed when the user deleted it
    pub original_row: Row,
    pub table: TableRef,
}

/// A payload that knows its own operation kind and canonical key.
pub trait KeyedPayload {
    const KIND: OperationKind;

    /// Canonical key of an operation carrying this payload.
    fn key(&self, table_id: TableId) -> OperationId;
}

impl KeyedPayload for AddRowPayload {
    const KIND: OperationKind = OperationKind::AddRow;

    fn key(&self, table_id: TableId) -> OperationId {
        canonical_key(Self::KIND, table_id, None, None, Some(&self.temp_id))
    }
}

impl KeyedPayload for EditCellPayload {
    const KIND: OperationKind = OperationKind::EditCellContent;

    fn key(&self, table_id: TableId) -> OperationId {
        canonical_key(
            Self::KIND,
            table_id,
            Some(&self.column_name),
            Some(&self.row_identifiers),
            None,
        )
    }
}

impl KeyedPayload for DeleteRowPayload {
    const KIND: OperationKind = OperationKind::DeleteRow;

    fn key(&self, table_id: TableId) -> OperationId {
        canonical_key(
            Self::KIND,
            table_id,
            None,
            Some(&self.row_identifiers),
            None,
        )
    }
}

/// A requested change, not yet admitted to the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOp<P> {
    pub table_id: TableId,
    pub payload: P,
}

impl<P: KeyedPayload> NewOp<P> {
    pub fn new(table_id: TableId, payload: P) -> Self {
        Self { table_id, payload }
    }

    pub fn key(&self) -> OperationId {
        self.payload.key(self.table_id)
    }

    /// Admit to the queue: stamp with canonical id and modification time.
    pub fn stamp(self, timestamp: Timestamp) -> QueuedOp<P> {
        QueuedOp {
            id: self.key(),
            table_id: self.table_id,
            timestamp,
            payload: self.payload,
        }
    }
}

/// A change held in the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedOp<P> {
    /// Canonical key, also the dedup key
    pub id: OperationId,
    pub table_id: TableId,
    /// Last-modified time
    pub timestamp: Timestamp,
    pub payload: P,
}

/// A change requested by the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NewOperation {
    AddRow(NewOp<AddRowPayload>),
    EditCellContent(NewOp<EditCellPayload>),
    DeleteRow(NewOp<DeleteRowPayload>),
}

/// A change held in the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    AddRow(QueuedOp<AddRowPayload>),
    EditCellContent(QueuedOp<EditCellPayload>),
    DeleteRow(QueuedOp<DeleteRowPayload>),
}

impl NewOperation {
    /// Request a new pending row.
    pub fn add_row(table: TableRef, temp_id: impl Into<TempId>, row_data: Cells) -> Self {
        NewOperation::AddRow(NewOp::new(
            table.id,
            AddRowPayload {
                temp_id: temp_id.into(),
                row_data,
                table,
            },
        ))
    }

    /// Request a cell edit.
    pub fn edit_cell(
        table: TableRef,
        row_identifiers: RowIdentifiers,
        column_name: impl Into<String>,
        old_value: Value,
        new_value: Value,
    ) -> Self {
        NewOperation::EditCellContent(NewOp::new(
            table.id,
            EditCellPayload {
                row_identifiers,
                column_name: column_name.into(),
                old_value,
                new_value,
                table,
            },
        ))
    }

    /// Request a row deletion, deriving identifiers from the table's
    /// primary keys (or the temp id of a pending row).
    pub fn delete_row(table: TableRef, original_row: Row) -> Self {
        let row_identifiers = table.row_identifiers(&original_row);
        NewOperation::DeleteRow(NewOp::new(
            table.id,
            DeleteRowPayload {
                row_identifiers,
                original_row,
                table,
            },
        ))
    }

    /// Parse from JSON, rejecting unknown type tags explicitly.
    pub fn from_json(json: &str) -> Result<Self> {
        from_tagged_json(json)
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            NewOperation::AddRow(_) => OperationKind::AddRow,
            NewOperation::EditCellContent(_) => OperationKind::EditCellContent,
            NewOperation::DeleteRow(_) => OperationKind::DeleteRow,
        }
    }

    pub fn table_id(&self) -> TableId {
        match self {
            NewOperation::AddRow(op) => op.table_id,
            NewOperation::EditCellContent(op) => op.table_id,
            NewOperation::DeleteRow(op) => op.table_id,
        }
    }

    /// Canonical key this request will be queued under.
    pub fn key(&self) -> OperationId {
        match self {
            NewOperation::AddRow(op) => op.key(),
            NewOperation::EditCellContent(op) => op.key(),
            NewOperation::DeleteRow(op) => op.key(),
        }
    }

    /// Stamp with canonical id and modification time.
    pub fn stamp(self, timestamp: Timestamp) -> Operation {
        match self {
            NewOperation::AddRow(op) => Operation::AddRow(op.stamp(timestamp)),
            NewOperation::EditCellContent(op) => Operation::EditCellContent(op.stamp(timestamp)),
            NewOperation::DeleteRow(op) => Operation::DeleteRow(op.stamp(timestamp)),
        }
    }
}

impl Operation {
    /// Parse from JSON, rejecting unknown type tags explicitly.
    pub fn from_json(json: &str) -> Result<Self> {
        from_tagged_json(json)
    }

    /// Get the canonical id.
    pub fn id(&self) -> &OperationId {
        match self {
            Operation::AddRow(op) => &op.id,
            Operation::EditCellContent(op) => &op.id,
            Operation::DeleteRow(op) => &op.id,
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::AddRow(_) => OperationKind::AddRow,
            Operation::EditCellContent(_) => OperationKind::EditCellContent,
            Operation::DeleteRow(_) => OperationKind::DeleteRow,
        }
    }

    pub fn table_id(&self) -> TableId {
        match self {
            Operation::AddRow(op) => op.table_id,
            Operation::EditCellContent(op) => op.table_id,
            Operation::DeleteRow(op) => op.table_id,
        }
    }

    /// Get the last-modified time.
    pub fn timestamp(&self) -> Timestamp {
        match self {
            Operation::AddRow(op) => op.timestamp,
            Operation::EditCellContent(op) => op.timestamp,
            Operation::DeleteRow(op) => op.timestamp,
        }
    }

    /// Recompute the canonical key from the payload.
    pub fn key(&self) -> OperationId {
        match self {
            Operation::AddRow(op) => op.payload.key(op.table_id),
            Operation::EditCellContent(op) => op.payload.key(op.table_id),
            Operation::DeleteRow(op) => op.payload.key(op.table_id),
        }
    }
}

macro_rules! impl_from_op {
    ($($variant:ident => $payload:ty),* $(,)?) => {
        $(
            impl From<NewOp<$payload>> for NewOperation {
                fn from(op: NewOp<$payload>) -> Self {
                    NewOperation::$variant(op)
                }
            }

            impl From<QueuedOp<$payload>> for Operation {
                fn from(op: QueuedOp<$payload>) -> Self {
                    Operation::$variant(op)
                }
            }
        )*
    };
}

impl_from_op! {
    AddRow => AddRowPayload,
    EditCellContent => EditCellPayload,
    DeleteRow => DeleteRowPayload,
}

/// Parse an internally tagged operation, surfacing an unrecognized tag as
/// [`Error::UnknownOperationType`] rather than a generic parse failure.
fn from_tagged_json<T: serde::de::DeserializeOwned>(json: &str) -> Result<T> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| Error::InvalidOperation(e.to_string()))?;

    let tag = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidOperation("missing type tag".into()))?;
    OperationKind::from_tag(tag)?;

    serde_json::from_value(value).map_err(|e| Error::InvalidOperation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn users() -> TableRef {
        TableRef::new(1, "public", "users").with_primary_keys(["id"])
    }

    fn id_1() -> RowIdentifiers {
        [("id", json!(1))].into_iter().collect()
    }

    #[test]
    fn kind_tags() {
        assert_eq!(OperationKind::AddRow.to_string(), "add_row");
        assert_eq!(
            OperationKind::from_tag("edit_cell_content").unwrap(),
            OperationKind::EditCellContent
        );
        assert_eq!(
            OperationKind::from_tag("DROP_TABLE"),
            Err(Error::UnknownOperationType("DROP_TABLE".into()))
        );
    }

    #[test]
    fn stamp_assigns_canonical_id() {
        let op = NewOperation::edit_cell(users(), id_1(), "name", json!("old"), json!("new"));
        assert_eq!(op.key(), "edit_cell_content:1:name:id:1");

        let queued = op.stamp(1000);
        assert_eq!(queued.id(), "edit_cell_content:1:name:id:1");
        assert_eq!(queued.timestamp(), 1000);
        assert_eq!(queued.kind(), OperationKind::EditCellContent);
        assert_eq!(queued.key(), *queued.id());
    }

    #[test]
    fn delete_row_derives_identifiers() {
        let row = Row::from_value(json!({"idx": 4, "id": 1, "name": "Alice"})).unwrap();
        let op = NewOperation::delete_row(users(), row);
        assert_eq!(op.key(), "delete_row:1:id:1");

        let pending = Row::from_value(json!({"idx": -1, "__tempId": "-1"})).unwrap();
        let op = NewOperation::delete_row(users(), pending);
        assert_eq!(op.key(), "delete_row:1:__tempId:-1");
    }

    #[test]
    fn add_row_key_uses_temp_id() {
        let op = NewOperation::add_row(users(), "-12345", Cells::new());
        assert_eq!(op.key(), "add_row:1:-12345");
        assert_eq!(op.table_id(), 1);
    }

    #[test]
    fn parse_new_operation() {
        let json = r#"{
            "type": "edit_cell_content",
            "tableId": 1,
            "payload": {
                "rowIdentifiers": {"id": 1},
                "columnName": "name",
                "oldValue": "old",
                "newValue": "new",
                "table": {"id": 1, "schema": "public", "name": "users"}
            }
        }"#;
        let op = NewOperation::from_json(json).unwrap();
        assert_eq!(op.kind(), OperationKind::EditCellContent);
        assert_eq!(op.key(), "edit_cell_content:1:name:id:1");
    }

    #[test]
    fn parse_rejects_unknown_tag() {
        let json = r#"{"type": "truncate_table", "tableId": 1, "payload": {}}"#;
        assert_eq!(
            NewOperation::from_json(json),
            Err(Error::UnknownOperationType("truncate_table".into()))
        );
    }

    #[test]
    fn parse_rejects_missing_tag() {
        let err = Operation::from_json(r#"{"tableId": 1}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));
    }

    #[test]
    fn serialization_shape() {
        let row = Row::from_value(json!({"idx": 1, "id": 1, "name": "test"})).unwrap();
        let op = NewOperation::delete_row(users(), row).stamp(5000);

        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value["type"], "delete_row");
        assert_eq!(value["id"], "delete_row:1:id:1");
        assert_eq!(value["tableId"], 1);
        assert_eq!(value["timestamp"], 5000);
        assert_eq!(value["payload"]["rowIdentifiers"], json!({"id": 1}));
        assert_eq!(value["payload"]["originalRow"]["name"], "test");

        let parsed: Operation = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, op);
    }
}
