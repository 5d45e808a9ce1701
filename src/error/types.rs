//! Error types
//!
//! Defines domain-specific error types for the file share server.

use std::fmt;
use std::io;

/// Storage layer errors
///
/// Every failure a file operation can surface to the dispatcher. Variants
/// carry the client-facing virtual path or name they refer to.
#[derive(Debug)]
pub enum StoreError {
    /// Malformed or escaping path input, rejected before touching disk
    InvalidPath(String),
    /// Target entry or directory does not exist
    NotFound(String),
    /// Download target is a directory, not a file
    IsDirectory(String),
    /// An entry with that name already exists
    Conflict(String),
    /// Folder creation would exceed the configured nesting depth
    DepthExceeded(usize),
    /// Attempt to mutate the storage root itself
    RootForbidden,
    /// Moving an entry into itself or one of its own descendants
    InvalidDestination(String),
    /// Upload exceeds the configured size limit
    TooLarge(u64),
    /// Underlying disk error (permissions, disk full, device error)
    Io(io::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::InvalidPath(p) => write!(f, "Invalid path: {}", p),
            StoreError::NotFound(p) => write!(f, "Not found: {}", p),
            StoreError::IsDirectory(p) => write!(f, "Is a directory: {}", p),
            StoreError::Conflict(p) => write!(f, "Already exists: {}", p),
            StoreError::DepthExceeded(max) => {
                write!(f, "Maximum folder depth of {} exceeded", max)
            }
            StoreError::RootForbidden => write!(f, "The storage root cannot be modified"),
            StoreError::InvalidDestination(p) => {
                write!(f, "Cannot move an entry into itself: {}", p)
            }
            StoreError::TooLarge(max) => {
                write!(f, "Upload exceeds the maximum size of {} bytes", max)
            }
            StoreError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(error: io::Error) -> Self {
        StoreError::Io(error)
    }
}
