//! Error types for bolty
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type alias using BoltyError
pub type Result<T> = std::result::Result<T, BoltyError>;

/// Unified error type for bolty operations
#[derive(Debug, Error)]
pub enum BoltyError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::Error),

    #[error("Database file is locked by another handle: {}", .0.display())]
    Locked(PathBuf),

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    #[error("Key not found")]
    KeyNotFound,

    #[error("Bucket already exists: {0}")]
    BucketExists(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Lifecycle / Concurrency Errors
    // -------------------------------------------------------------------------
    #[error("Store is not open")]
    Closed,

    #[error("Timed out after {0:?} waiting for the write lock")]
    Timeout(Duration),

    // -------------------------------------------------------------------------
    // Caller Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Coarse classification of a [`BoltyError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// File, lock or backend failure. Fatal to the operation.
    Io,
    /// Bucket or key absent.
    NotFound,
    /// Bucket creation conflict.
    AlreadyExists,
    /// Value could not be encoded or decoded.
    Serialization,
    /// Operation on a store that is not open.
    Closed,
    /// Write lock could not be acquired in time.
    Timeout,
    /// Empty bucket name, empty key, bad config value.
    InvalidArgument,
}

impl BoltyError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            BoltyError::Io(_) | BoltyError::Storage(_) | BoltyError::Locked(_) => ErrorKind::Io,
            BoltyError::BucketNotFound(_) | BoltyError::KeyNotFound => ErrorKind::NotFound,
            BoltyError::BucketExists(_) => ErrorKind::AlreadyExists,
            BoltyError::Serialization(_) => ErrorKind::Serialization,
            BoltyError::Closed => ErrorKind::Closed,
            BoltyError::Timeout(_) => ErrorKind::Timeout,
            BoltyError::InvalidArgument(_) => ErrorKind::InvalidArgument,
        }
    }

    /// True for a missing bucket or a missing key
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

// -----------------------------------------------------------------------------
// Backend error conversions
//
// redb splits its errors per call site; funnel them all through redb::Error so
// `?` works everywhere. Call sites that care about a specific variant (missing
// table, already-open file) match on it before converting.
// -----------------------------------------------------------------------------

impl From<redb::DatabaseError> for BoltyError {
    fn from(e: redb::DatabaseError) -> Self {
        BoltyError::Storage(e.into())
    }
}

impl From<redb::TransactionError> for BoltyError {
    fn from(e: redb::TransactionError) -> Self {
        BoltyError::Storage(e.into())
    }
}

impl From<redb::TableError> for BoltyError {
    fn from(e: redb::TableError) -> Self {
        BoltyError::Storage(e.into())
    }
}

impl From<redb::StorageError> for BoltyError {
    fn from(e: redb::StorageError) -> Self {
        BoltyError::Storage(e.into())
    }
}

impl From<redb::CommitError> for BoltyError {
    fn from(e: redb::CommitError) -> Self {
        BoltyError::Storage(e.into())
    }
}
