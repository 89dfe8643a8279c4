//! Unified error types for Cadence
//!
//! Every error carries enough structure to be classified once, where it is
//! produced. Handling sites ask [`CadenceError::kind`] instead of inspecting
//! message text.

use std::fmt;
use thiserror::Error;

/// Retry classification of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Plausibly recoverable by retrying (network failures, 5xx)
    Transient,
    /// Retrying will not help (validation, authentication)
    Terminal,
}

/// Network-level failure category, determined at the transport boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    Timeout,
    ConnectionReset,
    ConnectionRefused,
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkErrorKind::Timeout => write!(f, "timeout"),
            NetworkErrorKind::ConnectionReset => write!(f, "connection reset"),
            NetworkErrorKind::ConnectionRefused => write!(f, "connection refused"),
        }
    }
}

/// Unified error type for all Cadence operations
#[derive(Error, Debug)]
pub enum CadenceError {
    // Remote service errors
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Network error ({kind}): {message}")]
    Network {
        kind: NetworkErrorKind,
        message: String,
    },

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Quota error: {0}")]
    Quota(String),

    #[error("Points error: {0}")]
    Points(String),

    // Local errors
    #[error("Message generation failed: {0}")]
    Generation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dashboard error: {0}")]
    Dashboard(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl CadenceError {
    /// Shorthand for a network failure
    pub fn network(kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        CadenceError::Network {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a non-success HTTP status
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        CadenceError::Http {
            status,
            message: message.into(),
        }
    }

    /// Classify this error for retry decisions
    pub fn kind(&self) -> ErrorKind {
        match self {
            CadenceError::Network { .. } => ErrorKind::Transient,
            CadenceError::Http { status, .. } if *status >= 500 => ErrorKind::Transient,
            _ => ErrorKind::Terminal,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    /// True when the remote side rejected our credential
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            CadenceError::Auth(_) | CadenceError::Http { status: 401 | 403, .. }
        )
    }
}

/// Result type alias using CadenceError
pub type Result<T> = std::result::Result<T, CadenceError>;
