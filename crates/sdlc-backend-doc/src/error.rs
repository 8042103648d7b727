//! Error types for the documentation backend.

use thiserror::Error;

/// Error type for documentation rendering.
#[derive(Debug, Error)]
pub enum DocError {
    /// The generator options could not be decoded.
    #[error("Invalid doc options: {0}")]
    InvalidOptions(#[from] serde_json::Error),
}
