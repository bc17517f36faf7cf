//! Error types for the quicklist container.

use std::collections::TryReserveError;

use thiserror::Error;

/// The result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for quicklist operations.
#[derive(Debug, Error)]
pub enum Error {
    /// An invalid argument or configuration was provided.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A logical index fell outside the list.
    #[error("Index {index} out of range for list of length {len}")]
    OutOfRange {
        /// The requested index (negative counts from the tail).
        index: i64,
        /// The number of entries in the list at the time of the lookup.
        len: usize,
    },

    /// A buffer could not grow.
    #[error("Allocation failed: {0}")]
    Allocation(#[from] TryReserveError),

    /// A stored payload could not be decoded.
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// A decompressed payload did not match its recorded checksum.
    #[error("Checksum mismatch: expected {expected:#x}, got {actual:#x}")]
    ChecksumMismatch {
        /// The checksum recorded when the payload was compressed.
        expected: u32,
        /// The checksum of the decompressed bytes.
        actual: u32,
    },

    /// An internal invariant was violated.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Creates a new corruption error.
    pub fn corruption(msg: impl Into<String>) -> Self {
        Error::Corruption(msg.into())
    }

    /// Creates a new invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Creates a new internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// Creates a new out of range error.
    pub fn out_of_range(index: i64, len: usize) -> Self {
        Error::OutOfRange { index, len }
    }

    /// Returns true if the error means stored data can no longer be trusted.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::Corruption(_) | Error::ChecksumMismatch { .. })
    }
}
