//! The four-phase contract every operator implements.

use crate::error::Result;
use async_trait::async_trait;
use hostexec::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Rendered before/after snapshots, keyed `"before"` and `"after"`.
///
/// Values are JSON documents encoded as strings.
pub type Diff = BTreeMap<String, String>;

/// Phase of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PhaseName {
    Plan,
    Commit,
    Verify,
    Rollback,
}

impl PhaseName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plan => "PLAN",
            Self::Commit => "COMMIT",
            Self::Verify => "VERIFY",
            Self::Rollback => "ROLLBACK",
        }
    }
}

impl fmt::Display for PhaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Core trait for transactional operators
///
/// Implementations own their capability clients and their before/after
/// state. The [`Executor`](crate::Executor) guarantees the call order:
///
/// - `plan` first, exactly once
/// - `commit`/`verify` only when `plan` returned `Ok(false)`
/// - `rollback` at most once, only after a failed `commit` or `verify`
/// - `operation_diff` only on success
/// - `after` exactly once whenever `plan` succeeded
#[async_trait]
pub trait Phaser: Send {
    /// Read the current state and record it as `before`.
    ///
    /// Return `Ok(true)` when the goal state already holds; the operator
    /// must then also record `after = before`. Must not change the managed
    /// subsystem.
    async fn plan(&mut self, ctx: &Context) -> Result<bool>;

    /// Perform the change.
    async fn commit(&mut self, ctx: &Context) -> Result<()>;

    /// Observe that the change stuck and record `after`.
    async fn verify(&mut self, ctx: &Context) -> Result<()>;

    /// Undo whatever was committed or attempted.
    async fn rollback(&mut self, ctx: &Context) -> Result<()>;

    /// Render `before` and `after` as JSON strings.
    fn operation_diff(&self, ctx: &Context) -> Result<Diff>;

    /// Release resources acquired since `plan`. Always runs once `plan`
    /// has succeeded.
    async fn after(&mut self, ctx: &Context);
}
