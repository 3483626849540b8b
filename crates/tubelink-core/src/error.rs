//! Error types for Tubelink Core

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Bridge error types
#[derive(Error, Debug)]
pub enum Error {
    // Command errors
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Method not implemented: {0}")]
    MethodNotImplemented(String),

    #[error("Operation not supported in embedded mode: {operation}")]
    UnsupportedOperation { operation: String },

    // Event errors
    #[error("Malformed event payload: {0}")]
    MalformedEvent(String),

    // Transport errors
    #[error("Transport closed: {0}")]
    Transport(String),

    #[error("Driver rejected script: {0}")]
    Driver(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an invalid argument error
    pub fn invalid_arg(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Create a malformed event error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedEvent(msg.into())
    }

    /// Returns true if the bridge keeps working after this error.
    ///
    /// Every bridge error is recoverable except a broken runtime.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::Internal(_))
    }

    /// Returns true if this error is reported back to the host caller
    pub fn is_host_visible(&self) -> bool {
        matches!(
            self,
            Error::InvalidArgument(_) | Error::MethodNotImplemented(_) | Error::Internal(_)
        )
    }

    /// Returns the stable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidArgument(_) => "INVALID_ARGS",
            Error::MethodNotImplemented(_) => "NOT_IMPLEMENTED",
            Error::UnsupportedOperation { .. } => "UNSUPPORTED",
            Error::MalformedEvent(_) => "MALFORMED_EVENT",
            Error::Transport(_) => "TRANSPORT",
            Error::Driver(_) => "DRIVER",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Json(_) => "JSON",
            Error::Io(_) => "IO",
            Error::Internal(_) => "INTERNAL",
        }
    }
}

/// Error shape returned to the host over the method channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostError {
    pub code: String,
    pub message: String,
}

impl From<&Error> for HostError {
    fn from(err: &Error) -> Self {
        let message = match err {
            Error::InvalidArgument(msg) => msg.clone(),
            other => other.to_string(),
        };
        Self {
            code: err.error_code().to_string(),
            message,
        }
    }
}

impl From<Error> for HostError {
    fn from(err: Error) -> Self {
        HostError::from(&err)
    }
}

impl std::fmt::Display for HostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for HostError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_args_code() {
        let err = Error::invalid_arg("videoId cannot be empty");
        assert_eq!(err.error_code(), "INVALID_ARGS");
        assert!(err.is_host_visible());
        assert!(err.is_recoverable());

        let host = HostError::from(&err);
        assert_eq!(host.code, "INVALID_ARGS");
        assert_eq!(host.message, "videoId cannot be empty");
    }

    #[test]
    fn test_malformed_event_stays_internal() {
        let err = Error::malformed("missing event key");
        assert_eq!(err.error_code(), "MALFORMED_EVENT");
        assert!(!err.is_host_visible());
    }
}
