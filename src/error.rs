//! Error types for InboxHub
//!
//! `SendError` describes why a single workflow call did not produce output.
//! Its `Display` text is what the main screen shows to the user.
//! `InboxError` covers everything else the library can fail on.

use thiserror::Error;

/// Outcome of a failed send
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// Nothing left to send after trimming
    #[error("Message is empty")]
    EmptyInput,

    /// Connection, DNS, TLS or timeout failure
    #[error("{0}")]
    Network(String),

    /// The server answered with a non-success status
    #[error("Send failed: {status} {reason}")]
    Http { status: u16, reason: String },

    /// The server answered 2xx but the body could not be decoded
    #[error("Invalid response: {0}")]
    Protocol(String),

    /// The body carried an application-level error object
    #[error("API error: {message}")]
    Application {
        message: String,
        code: Option<String>,
    },
}

/// Library errors
#[derive(Error, Debug, Clone)]
pub enum InboxError {
    /// Preference backend could not be read or written
    #[error("Storage error: {0}")]
    StorageError(String),

    /// File system I/O error
    #[error("IO error: {0}")]
    IOError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Channel communication error
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// No stored profile has this id
    #[error("No profile with id '{0}'")]
    ProfileNotFound(String),

    /// A workflow call failed
    #[error(transparent)]
    SendError(#[from] SendError),
}

impl From<std::io::Error> for InboxError {
    fn from(e: std::io::Error) -> Self {
        InboxError::IOError(e.to_string())
    }
}

impl InboxError {
    /// Check if this error is recoverable
    ///
    /// Recoverable errors leave the application usable; the user can simply retry.
    pub fn is_recoverable(&self) -> bool {
        match self {
            InboxError::StorageError(_) => true,
            InboxError::IOError(_) => false,
            InboxError::ConfigError(_) => false,
            InboxError::ChannelError(_) => false,
            InboxError::ProfileNotFound(_) => true,
            InboxError::SendError(_) => true,
        }
    }

    /// Get a user-friendly description of the error
    pub fn user_message(&self) -> String {
        match self {
            InboxError::StorageError(_) => "Could not save settings. Please try again.".to_string(),
            InboxError::IOError(_) => "File system error occurred.".to_string(),
            InboxError::ConfigError(_) => "Configuration error. Please check settings.".to_string(),
            InboxError::ChannelError(_) => {
                "Internal communication error. Please restart the application.".to_string()
            }
            InboxError::ProfileNotFound(_) => "That profile no longer exists.".to_string(),
            InboxError::SendError(e) => e.to_string(),
        }
    }
}

/// Result type alias for InboxHub operations
pub type Result<T> = std::result::Result<T, InboxError>;
