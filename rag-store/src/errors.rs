//! Unified error types for the crate.

use thiserror::Error;

/// Top-level error for chunk store and embedding operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O or filesystem errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing / serialization errors.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Invalid or unsupported configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Mismatch between an input vector and the collection dimension.
    #[error("dimension mismatch: got {got}, want {want}")]
    DimensionMismatch { got: usize, want: usize },

    /// A single batch exceeded the configured cap.
    #[error("batch limit exceeded: {got} items, cap {cap}")]
    BatchLimitExceeded { got: usize, cap: usize },

    /// Qdrant client errors (wrapped), surfaced after retries exhaust.
    #[error("qdrant error: {0}")]
    Qdrant(String),

    /// Embedding provider failure, surfaced after its single retry.
    #[error("embedding error: {0}")]
    Embedding(String),
}
