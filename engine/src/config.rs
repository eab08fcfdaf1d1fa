//! Queue configuration.

use crate::{error::Result, Error};
use serde::{Deserialize, Serialize};
use std::env;

/// Environment variable overriding [`QueueConfig::pending_row_idx`].
pub const PENDING_ROW_IDX_ENV: &str = "ROWQUEUE_PENDING_ROW_IDX";

/// Configuration for an [`crate::OperationQueue`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueueConfig {
    /// Position given to pending rows whose row data carries no `idx` of
    /// its own. Always negative so pending rows never collide with
    /// persisted positions.
    pub pending_row_idx: i64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { pending_row_idx: -1 }
    }
}

impl QueueConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(PENDING_ROW_IDX_ENV) {
            config.pending_row_idx = raw.trim().parse().map_err(|_| {
                Error::InvalidConfig(format!("{PENDING_ROW_IDX_ENV} is not an integer: {raw}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check invariants on the configured values.
    pub fn validate(&self) -> Result<()> {
        if self.pending_row_idx >= 0 {
            return Err(Error::InvalidConfig(format!(
                "pending row idx must be negative, got {}",
                self.pending_row_idx
            )));
        }
        Ok(())
    }
}
