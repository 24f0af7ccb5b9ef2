//! # hostexec
//!
//! Local command execution for the node agent.
//!
//! - [`Context`]: cancellation signal (with optional deadline) threaded
//!   through every blocking call
//! - [`CommandExecutor`]: capability trait for running external tools
//! - [`Executor`]: real implementation on top of `tokio::process`, starting
//!   every child in its own process group so that cancellation can take the
//!   whole tree down
//! - [`fake::ScriptedExecutor`]: scripted implementation for tests
//!
//! ## Example
//!
//! ```no_run
//! use hostexec::{CommandExecutor, Context, Executor};
//!
//! # async fn demo() -> hostexec::Result<()> {
//! let ctx = Context::new();
//! let out = Executor.exec_ctx(&ctx, "crm", &["status"]).await?;
//! println!("{}", String::from_utf8_lossy(&out));
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod error;
pub mod executor;
pub mod fake;

pub use context::Context;
pub use error::{Error, Result};
pub use executor::{CommandExecutor, Executor, command_line};
