//! Batch-fatal errors.
//!
//! Failures of a single region or point never surface here; they become
//! no-data results.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("cannot read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error(transparent)]
    Core(#[from] orbit_core::Error),

    #[error(transparent)]
    Source(#[from] orbit_cloud::CloudError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
