//! Error types for bus access.

use thiserror::Error;

use crate::value::ValueKind;

/// Result type for bus operations.
pub type BusResult<T> = Result<T, BusError>;

/// Errors returned by bus reads, writes and registration.
///
/// These are recoverable: they are handed back to the caller of the offending
/// operation and never halt the simulation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BusError {
    /// Path was never registered on this bus.
    #[error("Unknown path: {path}")]
    UnknownPath { path: String },

    /// Path is a derived quantity and cannot be set from outside its owner.
    #[error("Read-only path: {path}")]
    ReadOnlyViolation { path: String },

    /// Value kind disagrees with the registered kind.
    #[error("Type mismatch on {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: ValueKind,
        found: ValueKind,
    },

    /// Path text is malformed.
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// Two writers claimed the same path without override.
    #[error("Path {path} is already written by '{owner}', cannot be claimed by '{claimant}'")]
    DuplicateWriter {
        path: String,
        owner: String,
        claimant: String,
    },
}
