//! Error types for the document model.

use crate::path::Path;
use thiserror::Error;

/// Result type for document operations.
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Errors that can occur when mutating or reading a document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DocumentError {
    /// A non-terminal segment does not resolve to a collection.
    #[error("path not found: {path}")]
    PathNotFound {
        /// The path that failed to resolve.
        path: Path,
    },

    /// The terminal id does not name an existing entry.
    #[error("entry not found: {path}")]
    EntryNotFound {
        /// The path of the missing entry.
        path: Path,
    },

    /// An entry with the terminal id already exists.
    #[error("duplicate id: {path}")]
    DuplicateId {
        /// The path that is already occupied.
        path: Path,
    },

    /// The path is empty or otherwise unusable.
    #[error("invalid path: {message}")]
    InvalidPath {
        /// Description of the problem.
        message: String,
    },

    /// Converting between typed values and entry props failed.
    #[error("conversion failed: {message}")]
    Conversion {
        /// Description of the conversion error.
        message: String,
    },
}

impl DocumentError {
    /// Creates a path-not-found error.
    pub fn path_not_found(path: &Path) -> Self {
        Self::PathNotFound { path: path.clone() }
    }

    /// Creates an entry-not-found error.
    pub fn entry_not_found(path: &Path) -> Self {
        Self::EntryNotFound { path: path.clone() }
    }

    /// Creates a duplicate-id error.
    pub fn duplicate_id(path: &Path) -> Self {
        Self::DuplicateId { path: path.clone() }
    }

    /// Creates a conversion error.
    pub fn conversion(message: impl Into<String>) -> Self {
        Self::Conversion {
            message: message.into(),
        }
    }

    /// Returns true if this error is an id collision on create.
    pub fn is_duplicate_id(&self) -> bool {
        matches!(self, DocumentError::DuplicateId { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_path() {
        let err = DocumentError::entry_not_found(&Path::from(["todos", "x1"]));
        assert_eq!(err.to_string(), "entry not found: todos/x1");
    }

    #[test]
    fn duplicate_id_classification() {
        let path = Path::from(["todos", "x1"]);
        assert!(DocumentError::duplicate_id(&path).is_duplicate_id());
        assert!(!DocumentError::path_not_found(&path).is_duplicate_id());
    }
}
