//! Error types for the rowqueue engine.
//!
//! Policy rejections (editing a row that is pending deletion) are not errors;
//! they are returned as [`crate::EditResolution::Reject`] values.

use crate::TableId;
use thiserror::Error;

/// All possible errors from the rowqueue engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Boundary errors
    #[error("unknown operation type: {0}")]
    UnknownOperationType(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("invalid row: {0}")]
    InvalidRow(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    // Collaborator errors
    #[error("no cached rows for table {0}")]
    TableNotCached(TableId),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
