//! Error types for comware-cli.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Main error type for comware-cli operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad caller input, raised before any device interaction.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Driver-level errors
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Template definition errors
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// A record failed its argument spec
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Coarse classification of an [`Error`], matching how callers react to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad caller input. Never retried.
    InvalidArgument,
    /// A mode transition did not land where expected.
    PrivilegeEscalationFailed,
    /// The device refused a command. The session stays usable.
    DeviceRejected,
    /// The session closed while a command was in flight.
    ConnectionLost,
    /// Transport failure or timeout. The session is unusable.
    ConnectionFailure,
    /// A record failed its declared schema.
    ValidationError,
    /// A rule set was defined incorrectly.
    Template,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::Transport(TransportError::Disconnected) => ErrorKind::ConnectionLost,
            Error::Transport(_) => ErrorKind::ConnectionFailure,
            Error::Channel(ChannelError::ConnectionLost) => ErrorKind::ConnectionLost,
            Error::Channel(_) => ErrorKind::ConnectionFailure,
            Error::Driver(DriverError::PrivilegeEscalationFailed { .. }) => {
                ErrorKind::PrivilegeEscalationFailed
            }
            Error::Driver(DriverError::DeviceRejected { .. }) => ErrorKind::DeviceRejected,
            Error::Template(_) => ErrorKind::Template,
            Error::Validation(_) => ErrorKind::ValidationError,
        }
    }

    /// Whether the session can still be used after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ConnectionLost | ErrorKind::ConnectionFailure
        )
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// The host key differs from the one recorded in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// The host is not present in known_hosts and strict checking is on
    #[error("Host key for {host}:{port} is unknown")]
    HostKeyUnknown { host: String, port: u16 },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Channel layer errors (prompt detection, reads).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The device closed the session before a prompt was seen
    #[error("Connection lost while waiting for the device prompt")]
    ConnectionLost,

    /// No prompt within the read timeout
    #[error("Prompt not found within {0:?}")]
    PromptTimeout(Duration),

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Driver layer errors (command execution, mode transitions).
#[derive(Error, Debug)]
pub enum DriverError {
    /// The device output matched an error pattern
    #[error("Device rejected '{command}': {message}")]
    DeviceRejected { command: String, message: String },

    /// A config mode transition did not reach the expected prompt
    #[error(
        "Mode transition failed at prompt [{}]: {}",
        .prompt.as_deref().unwrap_or(""),
        .message
    )]
    PrivilegeEscalationFailed {
        prompt: Option<String>,
        message: String,
    },
}

/// Rule set definition errors.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// Two rules in one set share a name
    #[error("Duplicate rule name '{0}'")]
    DuplicateRule(String),

    /// Invalid rule pattern
    #[error("Invalid rule pattern for '{name}': {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },
}

/// Argument spec validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A required field is absent
    #[error("missing required argument: {0}")]
    MissingRequired(String),

    /// The candidate carries a field the spec does not declare
    #[error("unsupported parameter: {0}")]
    Unsupported(String),

    /// A value does not have (and cannot be converted to) the declared type
    #[error("argument {field} is of type {found} and cannot be converted to {expected}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A value is not one of the declared choices
    #[error("value of {field} must be one of: {choices}, got: {value}")]
    InvalidChoice {
        field: String,
        choices: String,
        value: String,
    },
}

/// Result type alias using comware-cli's Error.
pub type Result<T> = std::result::Result<T, Error>;
