//! Error types for lazybucket.

use thiserror::Error;

use crate::bucket::OperationId;

/// Main error type for bucket operations.
#[derive(Error, Debug)]
pub enum BucketError {
    /// The operation identity was empty or otherwise unspecified
    #[error("invalid operation")]
    InvalidOperation,

    /// The rate was zero
    #[error("invalid rate")]
    InvalidRate,

    /// The time window was zero seconds
    #[error("invalid time window")]
    InvalidWindow,

    /// The operation is already registered in this bucket
    #[error("operation already registered: {0}")]
    AlreadyRegistered(OperationId),

    /// The operation was never registered, or has been unregistered
    #[error("operation not registered: {0}")]
    NotRegistered(OperationId),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for bucket operations.
pub type Result<T> = std::result::Result<T, BucketError>;
