//! Table descriptor carried by every operation payload.

use crate::{Row, RowIdentifiers, TableId};
use serde::{Deserialize, Serialize};

/// The table an operation belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRef {
    pub id: TableId,
    pub schema: String,
    pub name: String,
    /// Primary key columns, in declaration order
    #[serde(default)]
    pub primary_keys: Vec<String>,
}

impl TableRef {
    pub fn new(id: TableId, schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            schema: schema.into(),
            name: name.into(),
            primary_keys: Vec::new(),
        }
    }

    pub fn with_primary_keys<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_keys = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Derive the identifier set addressing `row`.
    ///
    /// Pending rows are addressed by their temp id. Persisted rows use the
    /// primary key columns they carry; a table without primary keys yields
    /// an empty set, which matches nothing.
    pub fn row_identifiers(&self, row: &Row) -> RowIdentifiers {
        if let Some(temp_id) = row.temp_id() {
            return RowIdentifiers::for_temp_id(temp_id);
        }
        self.primary_keys
            .iter()
            .filter_map(|column| row.get(column).map(|value| (column.as_str(), value.clone())))
            .collect()
    }
}
