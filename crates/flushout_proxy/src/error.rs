//! Error types for proxies and sync clients.

use flushout_document::DocumentError;
use flushout_protocol::ProtocolError;
use thiserror::Error;

/// Result type for proxy operations.
pub type ProxyResult<T> = Result<T, ProxyError>;

/// Errors that can occur on the client side of the protocol.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProxyError {
    /// A local command could not be applied.
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// A message was malformed or could not be encoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A flush was started while another one is in flight.
    #[error("a flush is already in flight")]
    FlushInProgress,

    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The client has no proxy yet.
    #[error("not connected to master")]
    NotConnected,
}

impl ProxyError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProxyError::Transport { retryable, .. } => *retryable,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flushout_document::Path;

    #[test]
    fn retryable_errors() {
        assert!(ProxyError::transport_retryable("connection lost").is_retryable());
        assert!(!ProxyError::transport_fatal("master gone").is_retryable());
        assert!(!ProxyError::FlushInProgress.is_retryable());
        assert!(!ProxyError::NotConnected.is_retryable());
    }

    #[test]
    fn error_display() {
        assert_eq!(ProxyError::NotConnected.to_string(), "not connected to master");

        let err = ProxyError::from(DocumentError::entry_not_found(&Path::from(["todos", "x1"])));
        assert!(err.to_string().contains("todos/x1"));
    }
}
