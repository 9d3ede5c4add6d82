//! Error types for the CLI

use std::path::PathBuf;

/// CLI Result type
pub type Result<T> = std::result::Result<T, Error>;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Addon(#[from] dashboard_addon::Error),

    #[error("failed to read {path}: {source}")]
    ReadManifest {
        path: PathBuf,
        source: std::io::Error,
    },
}
