//! # systemdkit
//!
//! systemd manager capabilities for the node agent.
//!
//! - [`SystemdLoader`]: hands out a fresh [`Systemd`] per operation
//! - [`Systemd`]: unit-file state, enable/disable, job and unit listings
//! - [`DbusLoader`]/[`DbusSystemd`]: implementation on the system bus
//!
//! Operators own the connection they get from the loader and release it with
//! [`Systemd::close`].

pub mod dbus;
pub mod error;
mod proxy;
pub mod types;

pub use dbus::{DbusLoader, DbusSystemd};
pub use error::{Error, Result};
pub use types::{JobInfo, UnitInfo, UnitStatus};

use async_trait::async_trait;
use hostexec::Context;

/// Factory for [`Systemd`] connections.
#[async_trait]
pub trait SystemdLoader: Send + Sync {
    async fn new_systemd(&self, ctx: &Context) -> Result<Box<dyn Systemd>>;
}

/// systemd manager capability.
#[async_trait]
pub trait Systemd: Send + Sync {
    /// Whether `unit` has `UnitFileState == "enabled"`.
    async fn is_enabled(&self, ctx: &Context, unit: &str) -> Result<bool>;

    /// Enable the unit file and reload the daemon.
    async fn enable(&self, ctx: &Context, unit: &str) -> Result<()>;

    /// Disable the unit file and reload the daemon.
    async fn disable(&self, ctx: &Context, unit: &str) -> Result<()>;

    /// `systemctl daemon-reload`.
    async fn reload(&self, ctx: &Context) -> Result<()>;

    /// Unit-file state for each of `units`, in order.
    async fn get_units_info(&self, ctx: &Context, units: &[&str]) -> Result<Vec<UnitInfo>>;

    /// Jobs currently queued in the manager.
    async fn list_jobs(&self, ctx: &Context) -> Result<Vec<JobInfo>>;

    /// Units currently loaded in the manager.
    async fn list_units(&self, ctx: &Context) -> Result<Vec<UnitStatus>>;

    /// Release the bus connection.
    async fn close(&self);
}
