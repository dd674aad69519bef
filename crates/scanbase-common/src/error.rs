//! Error types shared across the scanbase workspace

use thiserror::Error;

/// Result type alias for scanbase operations
pub type Result<T> = std::result::Result<T, ScanbaseError>;

/// Workspace-wide error type for the shared bootstrap concerns
/// (configuration parsing and logging setup).
#[derive(Error, Debug)]
pub enum ScanbaseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Logging error: {0}")]
    Logging(String),
}
