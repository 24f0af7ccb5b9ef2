//! Operator error type.
//!
//! Errors are categorized by [`ErrorKind`] for logging and callers that want
//! to branch on the failure class. The `Display` output is always the plain
//! message, so the kind never leaks into report text.

use thiserror::Error;

/// Categories of operator failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing, mistyped or inconsistent argument
    Argument,
    /// Host or subsystem not in a state where the operation can run
    Precondition,
    /// External tool failed or produced unparsable output while reading state
    StateRead,
    /// Safety invariant violated right before a change
    Invariant,
    /// Underlying tool failed while changing state
    Execution,
    /// The change is not observable in the target state
    Verification,
    /// The context was cancelled or timed out
    Cancelled,
    /// Snapshot could not be rendered
    Serialization,
}

impl ErrorKind {
    /// Short lowercase label used in structured logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Argument => "argument",
            Self::Precondition => "precondition",
            Self::StateRead => "state_read",
            Self::Invariant => "invariant",
            Self::Execution => "execution",
            Self::Verification => "verification",
            Self::Cancelled => "cancelled",
            Self::Serialization => "serialization",
        }
    }
}

/// Errors returned by phaser methods.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OperatorError {
    #[error("{0}")]
    Argument(String),

    #[error("{0}")]
    Precondition(String),

    #[error("{0}")]
    StateRead(String),

    #[error("{0}")]
    Invariant(String),

    #[error("{0}")]
    Execution(String),

    #[error("{0}")]
    Verification(String),

    #[error("{0}")]
    Cancelled(String),

    #[error("{0}")]
    Serialization(String),
}

impl OperatorError {
    /// Get the error category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Argument(_) => ErrorKind::Argument,
            Self::Precondition(_) => ErrorKind::Precondition,
            Self::StateRead(_) => ErrorKind::StateRead,
            Self::Invariant(_) => ErrorKind::Invariant,
            Self::Execution(_) => ErrorKind::Execution,
            Self::Verification(_) => ErrorKind::Verification,
            Self::Cancelled(_) => ErrorKind::Cancelled,
            Self::Serialization(_) => ErrorKind::Serialization,
        }
    }

    pub fn argument(msg: impl Into<String>) -> Self {
        Self::Argument(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    pub fn verification(msg: impl Into<String>) -> Self {
        Self::Verification(msg.into())
    }

    /// `"<context>: <err>"` as a state-read failure.
    pub fn state_read(context: &str, err: impl std::fmt::Display) -> Self {
        Self::StateRead(format!("{context}: {err}"))
    }

    /// `"<context>: <err>"` as an execution failure.
    pub fn execution(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Execution(format!("{context}: {err}"))
    }

    /// Prefix the message with `context`, keeping the kind.
    pub fn context(self, context: &str) -> Self {
        let wrap = |msg: String| format!("{context}: {msg}");
        match self {
            Self::Argument(m) => Self::Argument(wrap(m)),
            Self::Precondition(m) => Self::Precondition(wrap(m)),
            Self::StateRead(m) => Self::StateRead(wrap(m)),
            Self::Invariant(m) => Self::Invariant(wrap(m)),
            Self::Execution(m) => Self::Execution(wrap(m)),
            Self::Verification(m) => Self::Verification(wrap(m)),
            Self::Cancelled(m) => Self::Cancelled(wrap(m)),
            Self::Serialization(m) => Self::Serialization(wrap(m)),
        }
    }
}

impl From<hostexec::Error> for OperatorError {
    fn from(err: hostexec::Error) -> Self {
        if err.is_context_error() {
            Self::Cancelled(err.to_string())
        } else {
            Self::Execution(err.to_string())
        }
    }
}

impl From<serde_json::Error> for OperatorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for phaser methods.
pub type Result<T> = std::result::Result<T, OperatorError>;
