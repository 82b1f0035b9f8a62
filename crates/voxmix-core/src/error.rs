//! Error types for Voxmix.

use thiserror::Error;

/// Main error type for Voxmix operations.
#[derive(Error, Debug)]
pub enum VoxmixError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for Voxmix operations.
pub type Result<T> = std::result::Result<T, VoxmixError>;
