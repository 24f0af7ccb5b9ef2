//! # crmkit
//!
//! Pacemaker cluster control for the node agent.
//!
//! - [`ClusterCmdClient`]: capability trait consumed by the cluster operators
//! - [`CrmClient`]: implementation on top of `crm` and `crmadmin`
//! - [`parse`]: tolerant parsers for the inconsistent `crm` output

pub mod client;
pub mod error;
pub mod parse;

pub use client::{ClusterCmdClient, CrmClient, DEFAULT_IDLE_TIMEOUT};
pub use error::{Error, Result};
