//! Error Types
//!
//! Contract violations surface synchronously; absence is never an error.

use thiserror::Error;

/// Errors raised by the store and cache on contract violations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoraError {
    /// An inserted or queried embedding disagrees with the store's
    /// established dimensionality
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Construction-time configuration violates the component's contract
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, MemoraError>;
