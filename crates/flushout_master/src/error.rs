//! Error types for the master.

use flushout_document::DocumentError;
use flushout_protocol::{ErrorInfo, ErrorKind, ProtocolError};
use thiserror::Error;

/// Result type for master operations.
pub type MasterResult<T> = Result<T, MasterError>;

/// Reasons a batch is rejected as a whole.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MasterError {
    /// A command is not well-formed.
    #[error("malformed command at index {index}: {source}")]
    MalformedCommand {
        /// Position of the command in the batch.
        index: usize,
        /// Underlying protocol error.
        #[source]
        source: ProtocolError,
    },

    /// A command could not be applied to the document.
    #[error("command {command} at index {index} failed: {source}")]
    InvalidCommand {
        /// Position of the command in the batch.
        index: usize,
        /// Display form of the failing command.
        command: String,
        /// Underlying document error.
        #[source]
        source: DocumentError,
    },

    /// The batch exceeds the configured size limit.
    #[error("batch too large: {size} commands, limit is {max}")]
    BatchTooLarge {
        /// Commands in the batch.
        size: usize,
        /// Configured limit.
        max: usize,
    },

    /// The batch was built against an outdated command count.
    #[error("stale batch: built against {actual}, master is at {expected}")]
    StaleBatch {
        /// Master command count.
        expected: u64,
        /// Base command count carried by the batch.
        actual: u64,
    },
}

impl MasterError {
    /// Returns the wire classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MasterError::MalformedCommand { .. } | MasterError::InvalidCommand { .. } => {
                ErrorKind::InvalidCommand
            }
            MasterError::BatchTooLarge { .. } => ErrorKind::BatchTooLarge,
            MasterError::StaleBatch { .. } => ErrorKind::StaleBatch,
        }
    }

    /// Returns the index of the failing command, if a single command failed.
    pub fn command_index(&self) -> Option<usize> {
        match self {
            MasterError::MalformedCommand { index, .. } | MasterError::InvalidCommand { index, .. } => {
                Some(*index)
            }
            _ => None,
        }
    }

    /// Converts this error into its wire form.
    pub fn to_error_info(&self) -> ErrorInfo {
        ErrorInfo {
            kind: self.kind(),
            message: self.to_string(),
            command_index: self.command_index(),
        }
    }
}

impl From<&MasterError> for ErrorInfo {
    fn from(err: &MasterError) -> Self {
        err.to_error_info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flushout_document::Path;

    #[test]
    fn error_classification() {
        let err = MasterError::InvalidCommand {
            index: 2,
            command: "update todos/x1".into(),
            source: DocumentError::entry_not_found(&Path::from(["todos", "x1"])),
        };
        assert_eq!(err.kind(), ErrorKind::InvalidCommand);
        assert_eq!(err.command_index(), Some(2));

        let err = MasterError::BatchTooLarge { size: 5, max: 4 };
        assert_eq!(err.kind(), ErrorKind::BatchTooLarge);
        assert_eq!(err.command_index(), None);

        let err = MasterError::MalformedCommand {
            index: 0,
            source: ProtocolError::invalid_message("empty path"),
        };
        assert_eq!(err.kind(), ErrorKind::InvalidCommand);
    }

    #[test]
    fn error_info_conversion() {
        let err = MasterError::StaleBatch {
            expected: 10,
            actual: 5,
        };
        let info = ErrorInfo::from(&err);

        assert_eq!(info.kind, ErrorKind::StaleBatch);
        assert!(info.message.contains("10"));
        assert!(info.message.contains("5"));
        assert_eq!(info.command_index, None);
    }
}
