//! Error types for command execution.

use thiserror::Error;

/// Errors that can occur while running an external command.
#[derive(Debug, Error)]
pub enum Error {
    /// The command could not be started (missing binary, permissions, ...)
    #[error("failed to execute {command}: {source}")]
    Spawn {
        /// Command line that failed to start
        command: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The command ran but exited unsuccessfully
    #[error("{command} failed ({status}): {}", .output.trim())]
    Failed {
        /// Command line that was executed
        command: String,
        /// Exit code, if the process exited normally
        code: Option<i32>,
        /// Human-readable exit status
        status: String,
        /// Captured output (stdout followed by stderr)
        output: String,
    },

    /// The context was cancelled
    #[error("context canceled")]
    Cancelled,

    /// The context deadline passed
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

impl Error {
    /// Output captured from a failed command, if any.
    ///
    /// Several cluster tools report "soft" conditions ("not found",
    /// "Could not map") through a non-zero exit, so callers need the text
    /// even on failure.
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Failed { output, .. } => Some(output),
            _ => None,
        }
    }

    /// Whether this error stems from context cancellation or deadline.
    pub fn is_context_error(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

/// Result type for command execution.
pub type Result<T> = std::result::Result<T, Error>;
