//! Error types for tricorr

use thiserror::Error;

/// tricorr error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Validation error (bad construction input)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invalid argument on a fill operation (non-finite kinematics,
    /// non-positive weight). The operation performed no mutation.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Binary container operation between incompatible shapes
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Value resolved outside the configured bin edges
    #[error("Out of range: {0}")]
    OutOfRange(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
