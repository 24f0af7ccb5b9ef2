//! # sapcontrol
//!
//! Client for the per-instance `sapstartsrv` daemon.
//!
//! The daemon exposes its SOAP 1.1 API over HTTP on a UNIX-domain socket at
//! `/tmp/.sapstream5<NN>13`, where `<NN>` is the two-digit instance number.
//!
//! - [`SapControlWebService`]: capability trait consumed by the SAP operators
//! - [`SapControlClient`]: the real SOAP client
//! - [`WebServiceConnector`]: builds a client for an instance number, so
//!   operators can be handed a fake in tests
//!
//! ## Example
//!
//! ```no_run
//! use hostexec::Context;
//! use sapcontrol::{SapControlClient, SapControlWebService, StateColor};
//!
//! # async fn demo() -> sapcontrol::Result<()> {
//! let client = SapControlClient::for_instance("00");
//! let processes = client.get_process_list(&Context::new()).await?;
//! let running = !processes.is_empty()
//!     && processes.iter().all(|p| p.dispstatus == StateColor::Green);
//! println!("instance 00 running: {running}");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod soap;
pub mod types;

pub use client::{
    DEFAULT_CLIENT_TIMEOUT, SapControlClient, SapControlWebService, UnixSocketConnector,
    WebServiceConnector, socket_path,
};
pub use error::{Error, Result};
pub use types::{
    HaCheck, HaFailoverConfig, InstanceProperty, OsProcess, SapInstance, StartStopOption,
    StateColor, SystemRequest, VersionInfo,
};
