//! Error types for saptune operations.

use thiserror::Error;

/// Errors that can occur while driving saptune.
#[derive(Debug, Error)]
pub enum Error {
    /// The saptune package is not installed
    #[error("saptune is not installed: {0}")]
    NotInstalled(#[source] hostexec::Error),

    /// The installed version could not be parsed
    #[error("could not parse saptune version {version:?}: {source}")]
    InvalidVersion {
        version: String,
        #[source]
        source: semver::Error,
    },

    /// The installed version is older than the minimum supported one
    #[error("saptune version {installed} is not supported, version {required} or later is required")]
    UnsupportedVersion { installed: String, required: String },

    /// A saptune command failed
    #[error("{context}: {source}")]
    Command {
        context: String,
        #[source]
        source: hostexec::Error,
    },

    /// `saptune --format json` output could not be decoded
    #[error("could not parse saptune output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for saptune operations.
pub type Result<T> = std::result::Result<T, Error>;
