use std::error::Error as StdError;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Boxed low-level failure kept alongside a classified error for diagnostics.
pub type Cause = Box<dyn StdError + Send + Sync + 'static>;

/// Closed taxonomy every failure of the streaming layer is mapped into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Transport unreachable, connection refused or dropped, timeout.
    Network,
    /// Transport succeeded but the backend answered with a non-2xx status
    /// or a non-success application code.
    Api,
    /// Caller supplied invalid input. Raised before any request is issued.
    Validation,
    /// The caller's cancellation handle was triggered.
    Cancelled,
    Unknown,
}

impl ErrorKind {
    /// Short error code string, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Network => "NETWORK_ERROR",
            ErrorKind::Api => "API_ERROR",
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::Cancelled => "CANCELLED",
            ErrorKind::Unknown => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Network => "network",
            ErrorKind::Api => "api",
            ErrorKind::Validation => "validation",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// A classified failure with a user-facing message.
///
/// Built once by the classifier (or by request validation) and never mutated
/// afterwards; the fields are private for that reason.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ChatError {
    kind: ErrorKind,
    message: String,
    #[source]
    cause: Option<Cause>,
}

impl ChatError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(kind: ErrorKind, message: impl Into<String>, cause: impl Into<Cause>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn api(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Api, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "Operation was cancelled")
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The originating low-level failure, when one was captured.
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Lets a UI show "stopped by user" instead of "failed".
    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }
}

/// Failure while assembling [`crate::config::KbchatConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Load(String),

    #[error("Invalid configuration: {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, ChatError>;
