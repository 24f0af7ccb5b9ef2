//! `saptuneapplysolution` / `saptunechangesolution`: put a saptune solution
//! in place, either on an untuned host or replacing the current one.

use super::{Deps, planned};
use async_trait::async_trait;
use hostexec::Context;
use operator::arguments::get_string;
use operator::{Arguments, BaseOperator, Diff, OperatorError, Phaser, Result};
use saptune::SaptuneClient;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SolutionState {
    pub solution: String,
}

/// Shared PLAN/VERIFY logic of both operators.
struct Solution {
    base: BaseOperator<SolutionState>,
    saptune: Arc<dyn SaptuneClient>,
    requested: String,
}

impl Solution {
    fn new(operation_id: &str, arguments: Arguments, deps: &Deps) -> Self {
        Self {
            base: BaseOperator::new(operation_id, arguments),
            saptune: Arc::clone(&deps.saptune),
            requested: String::new(),
        }
    }

    async fn applied(&self, ctx: &Context) -> Result<String> {
        self.saptune
            .get_applied_solution(ctx)
            .await
            .map_err(|e| OperatorError::state_read("error getting applied solution", e))
    }

    async fn plan(&mut self, ctx: &Context) -> Result<bool> {
        self.requested = get_string(self.base.arguments(), "solution")?;
        self.saptune
            .check_version_support(ctx)
            .await
            .map_err(|e| OperatorError::precondition(e.to_string()))?;

        let applied = self.applied(ctx).await?;
        let already = applied == self.requested;
        self.base.state.set_before(SolutionState { solution: applied });
        if already {
            log::info!("Solution {} already applied", self.requested);
            self.base.state.mark_applied();
        }
        Ok(already)
    }

    /// Solution active before the change.
    fn before(&self) -> Result<&str> {
        planned(self.base.state.before()).map(|s| s.solution.as_str())
    }

    async fn verify(&mut self, ctx: &Context) -> Result<()> {
        let applied = self.applied(ctx).await?;
        if applied != self.requested {
            return Err(OperatorError::verification(format!(
                "verify saptune solution failed, the applied solution {applied:?} does not match the requested {}",
                self.requested
            )));
        }
        self.base.state.set_after(SolutionState { solution: applied });
        Ok(())
    }
}

// ============================================================================
// Apply
// ============================================================================

pub struct SaptuneApplySolution {
    inner: Solution,
}

impl SaptuneApplySolution {
    pub fn new(operation_id: &str, arguments: Arguments, deps: &Deps) -> Self {
        Self {
            inner: Solution::new(operation_id, arguments, deps),
        }
    }
}

#[async_trait]
impl Phaser for SaptuneApplySolution {
    async fn plan(&mut self, ctx: &Context) -> Result<bool> {
        self.inner.plan(ctx).await
    }

    async fn commit(&mut self, ctx: &Context) -> Result<()> {
        let before = self.inner.before()?;
        let requested = &self.inner.requested;
        if !before.is_empty() {
            return Err(OperatorError::invariant(format!(
                "cannot apply solution {requested} because solution {before} is already applied"
            )));
        }
        self.inner
            .saptune
            .apply_solution(ctx, requested)
            .await
            .map_err(|e| OperatorError::execution("error applying solution", e))
    }

    async fn verify(&mut self, ctx: &Context) -> Result<()> {
        self.inner.verify(ctx).await
    }

    async fn rollback(&mut self, ctx: &Context) -> Result<()> {
        // Only undo what this operation applied
        if !self.inner.before()?.is_empty() {
            return Ok(());
        }
        self.inner
            .saptune
            .revert_solution(ctx, &self.inner.requested)
            .await
            .map_err(|e| OperatorError::execution("error reverting solution", e))
    }

    fn operation_diff(&self, _ctx: &Context) -> Result<Diff> {
        self.inner.base.state.diff()
    }

    async fn after(&mut self, _ctx: &Context) {}
}

// ============================================================================
// Change
// ============================================================================

pub struct SaptuneChangeSolution {
    inner: Solution,
}

impl SaptuneChangeSolution {
    pub fn new(operation_id: &str, arguments: Arguments, deps: &Deps) -> Self {
        Self {
            inner: Solution::new(operation_id, arguments, deps),
        }
    }
}

#[async_trait]
impl Phaser for SaptuneChangeSolution {
    async fn plan(&mut self, ctx: &Context) -> Result<bool> {
        self.inner.plan(ctx).await
    }

    async fn commit(&mut self, ctx: &Context) -> Result<()> {
        let requested = &self.inner.requested;
        if self.inner.before()?.is_empty() {
            return Err(OperatorError::invariant(format!(
                "cannot change solution to {requested} because no solution is currently applied"
            )));
        }
        self.inner
            .saptune
            .change_solution(ctx, requested)
            .await
            .map_err(|e| OperatorError::execution("error changing solution", e))
    }

    async fn verify(&mut self, ctx: &Context) -> Result<()> {
        self.inner.verify(ctx).await
    }

    async fn rollback(&mut self, ctx: &Context) -> Result<()> {
        let before = self.inner.before()?;
        if before.is_empty() {
            return Ok(());
        }
        self.inner
            .saptune
            .change_solution(ctx, before)
            .await
            .map_err(|e| OperatorError::execution("error changing solution back", e))
    }

    fn operation_diff(&self, _ctx: &Context) -> Result<Diff> {
        self.inner.base.state.diff()
    }

    async fn after(&mut self, _ctx: &Context) {}
}
