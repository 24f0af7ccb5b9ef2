//! Error types for sapcontrol calls.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to sapcontrol.
#[derive(Debug, Error)]
pub enum Error {
    /// Could not connect to the instance socket
    #[error("error connecting to {path}: {source}")]
    Connect {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// HTTP protocol failure
    #[error("http error: {0}")]
    Http(#[from] hyper::Error),

    /// Request could not be built
    #[error("invalid request: {0}")]
    Request(#[from] hyper::http::Error),

    /// Non-success HTTP status without a SOAP fault
    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    /// The daemon answered with a SOAP fault
    #[error("SOAP fault {code}: {message}")]
    Fault { code: String, message: String },

    /// Response was not well-formed XML
    #[error("invalid XML response: {0}")]
    Xml(String),

    /// Response lacked an expected element
    #[error("missing element {0} in response")]
    MissingElement(String),

    /// Response carried a value we do not understand
    #[error("invalid value {value:?} for {field}")]
    InvalidValue { field: String, value: String },

    /// The client-side timeout elapsed
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The caller's context finished
    #[error("{0}")]
    Context(#[from] hostexec::Error),
}

/// Result type for sapcontrol calls.
pub type Result<T> = std::result::Result<T, Error>;
