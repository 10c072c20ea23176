//! Error types for the build pipeline.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    /// Configuration could not be loaded or compiled
    #[error("Configuration error: {0}")]
    Config(#[from] devtree_config::ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] devtree_store::StoreError),

    /// A producer failed while loading a path
    #[error("Failed to produce '{path}': {source}")]
    Produce {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    /// Directory to scan or watch does not exist
    #[error("Directory not found: {}", .0.display())]
    DirNotFound(PathBuf),

    /// An output path would land outside the destination directory
    #[error("Invalid output path: {0}")]
    InvalidOutputPath(String),

    /// Destination file exists and overwriting is disabled
    #[error("Output already exists: {0}")]
    OutputExists(String),

    #[error("Write failed: {0}")]
    WriteFailure(String),

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
