//! Error types for the flock system

use thiserror::Error;

/// Flock system errors
#[derive(Debug, Error)]
pub enum FlockError {
    /// The parallel backend could not be created
    #[error("Failed to build flock thread pool: {0}")]
    ThreadPool(String),
}

/// Result type for flock operations
pub type Result<T> = std::result::Result<T, FlockError>;
