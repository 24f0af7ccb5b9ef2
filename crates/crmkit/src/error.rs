//! Error types for cluster commands.

use thiserror::Error;

/// Errors returned by [`ClusterCmdClient`](crate::ClusterCmdClient).
#[derive(Debug, Error)]
pub enum Error {
    /// `crmadmin -qD` failed
    #[error("error getting designated controller: {0}")]
    DesignatedController(#[source] hostexec::Error),

    /// `crmadmin -qD` answered without a node name
    #[error("designated controller name is empty")]
    EmptyDesignatedController,

    /// `crmadmin -qS <dc>` failed
    #[error("error getting controller state: {0}")]
    ControllerState(#[source] hostexec::Error),

    /// A node id was given without a resource id
    #[error("resource refresh requires a resource id when a node id is given")]
    InvalidRefreshArguments,

    /// `crm resource refresh` failed
    #[error("error refreshing resource: {0}")]
    Refresh(#[source] hostexec::Error),

    /// `crm resource refresh` exited zero without confirming completion
    #[error("resource refresh did not complete: {0}")]
    RefreshNotDone(String),

    /// `crm cluster start` failed
    #[error("error starting cluster: {0}")]
    Start(#[source] hostexec::Error),

    /// `crm cluster stop` failed
    #[error("error stopping cluster: {0}")]
    Stop(#[source] hostexec::Error),

    /// An output pattern failed to compile
    #[error("invalid output pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Result type for cluster commands.
pub type Result<T> = std::result::Result<T, Error>;
