//! # Operator
//!
//! A framework for transactional, host-local administrative operations.
//!
//! Every operation goes through the same four phases:
//!
//! - **PLAN**: read the current state, decide whether anything needs doing
//! - **COMMIT**: perform the change
//! - **VERIFY**: prove the change is observable
//! - **ROLLBACK**: undo a failed COMMIT or VERIFY
//!
//! ## Core Concepts
//!
//! - **Phaser**: the trait an operator implements, one method per phase
//! - **Executor**: drives one phaser through the state machine and produces
//!   an [`ExecutionReport`]
//! - **Registry**: maps `name@version` to an [`OperatorBuilder`]
//! - **BaseOperator**: shared arguments plus a typed before/after [`State`]
//! - **Retry**: cancellable exponential backoff for operators that poll
//!
//! ## Example
//!
//! ```ignore
//! use operator::{Arguments, BaseOperator, Diff, Executor, OperatorError, Phaser};
//! use hostexec::Context;
//!
//! struct Toggle { base: BaseOperator<bool>, on: bool }
//!
//! #[async_trait::async_trait]
//! impl Phaser for Toggle {
//!     async fn plan(&mut self, _ctx: &Context) -> Result<bool, OperatorError> {
//!         self.base.state.set_before(self.on);
//!         Ok(false)
//!     }
//!     async fn commit(&mut self, _ctx: &Context) -> Result<(), OperatorError> { Ok(()) }
//!     async fn verify(&mut self, _ctx: &Context) -> Result<(), OperatorError> {
//!         self.base.state.set_after(!self.on);
//!         Ok(())
//!     }
//!     async fn rollback(&mut self, _ctx: &Context) -> Result<(), OperatorError> { Ok(()) }
//!     fn operation_diff(&self, _ctx: &Context) -> Result<Diff, OperatorError> {
//!         self.base.state.diff()
//!     }
//!     async fn after(&mut self, _ctx: &Context) {}
//! }
//!
//! let report = Executor::new("op-1", "toggle", Box::new(toggle)).run(&ctx).await;
//! ```

pub mod arguments;
pub mod base;
pub mod error;
pub mod executor;
pub mod phaser;
pub mod registry;
pub mod report;
pub mod retry;

// Re-export main types at crate root
pub use arguments::Arguments;
pub use base::{BaseOperator, State};
pub use error::{ErrorKind, OperatorError, Result};
pub use executor::Executor;
pub use phaser::{Diff, PhaseName, Phaser};
pub use registry::{OperatorBuilder, Registry, RegistryError};
pub use report::{ExecutionError, ExecutionReport, ExecutionSuccess};
pub use retry::{BackoffOptions, RetryError, async_exponential_backoff, exponential_backoff};
