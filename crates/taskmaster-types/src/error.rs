//! Error types for the taskmaster system.

use thiserror::Error;

/// Unified error type for shared taskmaster operations.
#[derive(Debug, Error)]
pub enum TaskmasterError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
