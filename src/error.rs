// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Error types for ReedTree operations.
//!
//! Provides structured error handling with detailed context. Recoverable
//! conditions (duplicate key, key not found, index out of range, unsupported
//! type) leave the in-memory tree unchanged; corruption and I/O errors are
//! fatal and the handle should be abandoned.

use thiserror::Error;

/// Standard Result type for all ReedTree operations.
pub type ReedResult<T> = Result<T, ReedError>;

/// Error types for ReedTree operations.
#[derive(Debug, Clone, Error)]
pub enum ReedError {
    /// Key already present in the tree. The tree is unchanged.
    #[error("Duplicate key: {key}")]
    DuplicateKey { key: String },

    /// Key not present in the tree. The tree is unchanged.
    #[error("Key not found: {key}")]
    KeyNotFound { key: String },

    /// Array index beyond the current length. The array is unchanged.
    #[error("Array index {index} out of range (length {length})")]
    IndexOutOfRange { index: usize, length: usize },

    /// Value cannot be encoded or used in the requested position.
    #[error("Unsupported type: {reason}")]
    UnsupportedType { reason: String },

    /// On-disk state is inconsistent (unknown tag byte, short read,
    /// signature mismatch). Fatal; do not continue mutating the file.
    #[error("Corruption detected during '{operation}': {reason}")]
    Corruption { operation: String, reason: String },

    /// File system or I/O operation error. Fatal; propagated as-is.
    #[error("I/O error during '{operation}' on '{path}': {reason}")]
    IoError {
        operation: String,
        path: String,
        reason: String,
    },
}

// == CONVENIENCE FUNCTIONS ==

/// Creates a DuplicateKey error.
pub fn duplicate_key(key: impl Into<String>) -> ReedError {
    ReedError::DuplicateKey { key: key.into() }
}

/// Creates a KeyNotFound error.
pub fn key_not_found(key: impl Into<String>) -> ReedError {
    ReedError::KeyNotFound { key: key.into() }
}

/// Creates an IndexOutOfRange error.
pub fn index_out_of_range(index: usize, length: usize) -> ReedError {
    ReedError::IndexOutOfRange { index, length }
}

/// Creates an UnsupportedType error.
pub fn unsupported_type(reason: impl Into<String>) -> ReedError {
    ReedError::UnsupportedType {
        reason: reason.into(),
    }
}

/// Creates a Corruption error.
pub fn corruption(operation: impl Into<String>, reason: impl Into<String>) -> ReedError {
    ReedError::Corruption {
        operation: operation.into(),
        reason: reason.into(),
    }
}

/// Creates an IoError.
pub fn io_error(
    operation: impl Into<String>,
    path: impl Into<String>,
    reason: impl Into<String>,
) -> ReedError {
    ReedError::IoError {
        operation: operation.into(),
        path: path.into(),
        reason: reason.into(),
    }
}

/// Automatic conversion from std::io::Error to ReedError.
///
/// A short read surfaces as corruption (the layout promised more bytes than
/// the file holds); everything else is an I/O failure.
impl From<std::io::Error> for ReedError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            ReedError::Corruption {
                operation: "read".to_string(),
                reason: "unexpected end of file".to_string(),
            }
        } else {
            ReedError::IoError {
                operation: "io".to_string(),
                path: "unknown".to_string(),
                reason: err.to_string(),
            }
        }
    }
}
