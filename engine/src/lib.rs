//! # Rowqueue Engine
//!
//! A pending-mutation queue for spreadsheet-like table editors.
//!
//! Every change a user makes to a table (edit a cell, add a row, delete a
//! row) is recorded as a queued operation before it is committed. The engine
//! keeps that pending set consistent and projects it onto the rows the UI
//! shows, so the grid reflects local changes before the server has seen them.
//!
//! ## Design Principles
//!
//! - **No IO**: The engine never touches the network, disk or clock
//! - **Deterministic**: Timestamps are passed in; same inputs, same outputs
//! - **Copy-on-write**: Pure functions return new collections, never mutate
//!   their inputs
//! - **Portable**: Usable natively or from any host through [`ffi`]
//!
//! ## Core Concepts
//!
//! ### Operations
//!
//! A [`NewOperation`] is what the UI requests. Admitted to the queue it
//! becomes an [`Operation`] carrying a canonical id (see [`canonical_key`])
//! and a last-modified timestamp. The id is also the dedup key: at most one
//! queued operation exists per id.
//!
//! ### Rows
//!
//! A [`Row`] is persisted, pending (created locally, addressed by temp id)
//! or deleted (persisted and queued for removal). [`RowIdentifiers`] address
//! rows by primary key or temp id; see [`matches`].
//!
//! ### Conflict resolution
//!
//! Deletes and edits are checked against the queue before they are stored:
//! - [`resolve_delete`] cancels everything pending on a row that was never
//!   persisted, and drops edits superseded by a delete otherwise
//! - [`resolve_edit`] rejects edits on rows pending deletion and folds edits
//!   on pending rows into the row's add
//!
//! ### Projection
//!
//! [`replay`] folds the queue over a fresh snapshot from the server to
//! produce the locally visible rows.
//!
//! ## Quick Start
//!
//! ```rust
//! use rowqueue_engine::{Enqueued, NewOperation, OperationQueue, QueueConfig, Row, TableRef};
//! use serde_json::json;
//!
//! let users = TableRef::new(1, "public", "users").with_primary_keys(["id"]);
//! let mut queue = OperationQueue::new(QueueConfig::default());
//!
//! // 1. Edit a persisted row
//! let ids = [("id", json!(1))].into_iter().collect();
//! let edit = NewOperation::edit_cell(users.clone(), ids, "name", json!("Alice"), json!("Alicia"));
//! assert!(matches!(queue.enqueue(edit, 1_000), Enqueued::Queued { .. }));
//!
//! // 2. Replay onto rows fetched from the server
//! let base = vec![Row::from_value(json!({"idx": 0, "id": 1, "name": "Alice"})).unwrap()];
//! let rows = queue.replay(users.id, &base);
//! assert_eq!(rows[0].get("name"), Some(&json!("Alicia")));
//! ```
//!
//! ## Logging
//!
//! The engine emits [`tracing`] events and installs no subscriber.

pub mod config;
pub mod error;
pub mod ffi;
pub mod identifiers;
pub mod key;
pub mod operation;
pub mod project;
pub mod queue;
pub mod resolve;
pub mod row;
pub mod snapshot;
pub mod table;

// Re-export main types at crate root
pub use config::QueueConfig;
pub use error::Error;
pub use identifiers::{matches, operation_targets_row, RowIdentifiers};
pub use key::canonical_key;
pub use operation::{
    AddRowPayload, DeleteRowPayload, EditCellPayload, KeyedPayload, NewOp, NewOperation,
    Operation, OperationKind, QueuedOp,
};
pub use project::{
    apply_cell_edit, mark_rows_deleted, remove_pending_row, replay, restore_deleted_rows,
    upsert_pending_row,
};
pub use queue::{upsert, Enqueued, OperationQueue};
pub use resolve::{
    resolve_delete, resolve_edit, without_pending_row, DeleteResolution, EditResolution,
    PENDING_DELETION_REASON,
};
pub use row::{Cells, Row, RowState};
pub use snapshot::{MemoryRowCache, RowCache, TableSnapshot};
pub use table::TableRef;

/// Type aliases for clarity
pub type TableId = u32;
pub type Timestamp = u64;
pub type OperationId = String;
pub type TempId = String;

/// Marker field carrying a pending row's temp id.
pub const TEMP_ID_KEY: &str = "__tempId";
/// Marker field flagging a persisted row queued for removal.
pub const DELETED_KEY: &str = "__isDeleted";
/// Field carrying a row's display position.
pub const IDX_KEY: &str = "idx";
