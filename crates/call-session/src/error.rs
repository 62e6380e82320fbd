//! Error types for the call session library

use thiserror::Error;

/// Result type for call session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Result type returned by voice client adapters
pub type ClientResult<T> = Result<T, ClientError>;

/// Failures reported by the external voice SDK
///
/// These never reach the user directly. The controller converts them into
/// [`CallStatus::Error`](crate::types::CallStatus::Error) or absorbs them into
/// [`CallStatus::Ended`](crate::types::CallStatus::Ended).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// The SDK rejected an operation with a message
    #[error("{0}")]
    Rejected(String),

    /// The SDK failed without saying why
    #[error("voice client failed without a message")]
    Silent,

    /// The SDK could not be loaded or initialized
    #[error("voice SDK failed to load: {0}")]
    Load(String),
}

impl ClientError {
    /// Create a rejection error
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    /// Create a load error
    pub fn load(message: impl Into<String>) -> Self {
        Self::Load(message.into())
    }

    /// The failure message, if the SDK supplied a non-empty one
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Rejected(message) | Self::Load(message) => {
                let trimmed = message.trim();
                (!trimmed.is_empty()).then_some(message.as_str())
            }
            Self::Silent => None,
        }
    }
}

/// Errors returned by the session library's own fallible operations
#[derive(Debug, Error)]
pub enum SessionError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Invalid state error
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    /// The controller was created outside a tokio runtime
    #[error("No tokio runtime available: {message}")]
    NoRuntime { message: String },

    /// Loading or running the voice SDK failed
    #[error("Bootstrap failed: {0}")]
    Bootstrap(#[from] ClientError),
}

impl SessionError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }
}
