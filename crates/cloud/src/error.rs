//! Error types for raster sources.

use std::time::Duration;
use thiserror::Error;

/// Errors produced while fetching frames from a raster source.
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("no data in '{collection}': {reason}")]
    NoData { collection: String, reason: String },

    #[error("source did not answer within {after:?}")]
    Timeout { after: Duration },

    #[error("band '{band}' missing from frame {frame}")]
    MissingBand { band: String, frame: String },

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("core error: {0}")]
    Core(#[from] orbit_core::Error),
}

impl CloudError {
    pub fn no_data(collection: impl Into<String>, reason: impl Into<String>) -> Self {
        CloudError::NoData {
            collection: collection.into(),
            reason: reason.into(),
        }
    }

    /// Whether the failure means "nothing to compute on" rather than a fault.
    ///
    /// Timeouts count as no-data: the unit of work yields an empty result.
    pub fn is_no_data(&self) -> bool {
        matches!(self, CloudError::NoData { .. } | CloudError::Timeout { .. })
    }
}

/// Result alias for source operations.
pub type Result<T> = std::result::Result<T, CloudError>;
