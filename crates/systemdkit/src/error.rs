//! Error types for systemd access.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Connecting to the system bus failed
    #[error("could not connect to systemd: {0}")]
    Connect(#[source] zbus::Error),

    /// A manager or unit call failed
    #[error("{context}: {source}")]
    Call {
        context: String,
        #[source]
        source: zbus::Error,
    },

    /// Enable or disable succeeded but the daemon reload failed
    #[error("could not reload systemd daemon: {0}")]
    Reload(#[source] zbus::Error),

    /// The caller's context ended before the call returned
    #[error(transparent)]
    Context(#[from] hostexec::Error),
}

impl Error {
    pub(crate) fn call(context: impl Into<String>) -> impl FnOnce(zbus::Error) -> Self {
        let context = context.into();
        move |source| Self::Call { context, source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
