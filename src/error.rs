//! Error types for loading bundle archives

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building the archive index.
///
/// Only the database-level variants abort index construction. A
/// [`IndexError::PackageCorrupt`] is reported by the package loader and the
/// index skips that package.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Header database not found: {}", .0.display())]
    DatabaseMissing(PathBuf),

    #[error("Header database is corrupt: {0}")]
    DatabaseCorrupt(String),

    #[error("Package {} is corrupt: {reason}", .path.display())]
    PackageCorrupt { path: PathBuf, reason: String },

    #[error("Could not read hash list {}: {source}", .path.display())]
    HashList {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IndexError {
    pub(crate) fn package(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        IndexError::PackageCorrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True when the error should stop the server from starting.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, IndexError::PackageCorrupt { .. })
    }
}

/// Result type alias for index operations
pub type Result<T> = std::result::Result<T, IndexError>;
