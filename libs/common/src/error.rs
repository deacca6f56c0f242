//! Custom error types for the common library
//!
//! This module defines the error types returned by the key-value store
//! backends.

use redis::RedisError;
use thiserror::Error;

/// Custom error type for key-value store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Error reported by the Redis backend
    #[error("Redis store error: {0}")]
    Redis(#[from] RedisError),

    /// Error reading or writing the backing file
    #[error("File store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file exists but does not hold a valid key-value document
    #[error("File store is corrupted: {0}")]
    Corrupted(#[source] serde_json::Error),

    /// Configuration error
    #[error("Store configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with StoreError
pub type StoreResult<T> = Result<T, StoreError>;
