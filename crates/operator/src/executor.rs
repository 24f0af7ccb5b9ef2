//! Execution engine - drives one phaser through PLAN/COMMIT/VERIFY/ROLLBACK

use crate::error::OperatorError;
use crate::phaser::{PhaseName, Phaser};
use crate::report::ExecutionReport;
use hostexec::Context;

/// Drives a single operator run.
///
/// The executor holds no state across runs: it is built for one operation,
/// consumed by [`Executor::run`], and discarded. No retries happen here;
/// operators that need them retry internally.
pub struct Executor {
    operation_id: String,
    operator: String,
    phaser: Box<dyn Phaser>,
}

impl Executor {
    pub fn new(operation_id: &str, operator: &str, phaser: Box<dyn Phaser>) -> Self {
        Self {
            operation_id: operation_id.to_string(),
            operator: operator.to_string(),
            phaser,
        }
    }

    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    /// Run the operation to completion and report the outcome.
    pub async fn run(mut self, ctx: &Context) -> ExecutionReport {
        self.begin(PhaseName::Plan);
        let already_applied = match self.phaser.plan(ctx).await {
            Ok(applied) => applied,
            Err(err) => {
                self.failure(PhaseName::Plan, &err);
                return ExecutionReport::error(&self.operation_id, PhaseName::Plan, err.to_string());
            }
        };

        let report = if already_applied {
            log::info!(
                operation_id = self.operation_id.as_str(),
                operator = self.operator.as_str();
                "Operation already applied, skipping commit"
            );
            self.finish(ctx, PhaseName::Plan)
        } else {
            self.success(PhaseName::Plan);
            self.converge(ctx).await
        };

        self.phaser.after(ctx).await;
        report
    }

    async fn converge(&mut self, ctx: &Context) -> ExecutionReport {
        self.begin(PhaseName::Commit);
        if let Err(err) = self.phaser.commit(ctx).await {
            self.failure(PhaseName::Commit, &err);
            return self.rollback(ctx, PhaseName::Commit, err).await;
        }
        self.success(PhaseName::Commit);

        self.begin(PhaseName::Verify);
        if let Err(err) = self.phaser.verify(ctx).await {
            self.failure(PhaseName::Verify, &err);
            return self.rollback(ctx, PhaseName::Verify, err).await;
        }

        self.finish(ctx, PhaseName::Verify)
    }

    /// Render the diff and report success for `phase`.
    fn finish(&self, ctx: &Context, phase: PhaseName) -> ExecutionReport {
        match self.phaser.operation_diff(ctx) {
            Ok(diff) => {
                log::info!(
                    operation_id = self.operation_id.as_str(),
                    operator = self.operator.as_str(),
                    phase = phase.as_str(),
                    event = "SUCCESS",
                    diff:? = diff;
                    "{phase} phase succeeded"
                );
                ExecutionReport::success(&self.operation_id, phase, diff)
            }
            Err(err) => {
                self.failure(phase, &err);
                ExecutionReport::error(&self.operation_id, phase, err.to_string())
            }
        }
    }

    async fn rollback(
        &mut self,
        ctx: &Context,
        origin: PhaseName,
        origin_err: OperatorError,
    ) -> ExecutionReport {
        self.begin(PhaseName::Rollback);
        match self.phaser.rollback(ctx).await {
            Ok(()) => {
                self.success(PhaseName::Rollback);
                ExecutionReport::error(&self.operation_id, origin, origin_err.to_string())
            }
            Err(rollback_err) => {
                self.failure(PhaseName::Rollback, &rollback_err);
                ExecutionReport::error(
                    &self.operation_id,
                    PhaseName::Rollback,
                    format!("{rollback_err}\n{origin_err}"),
                )
            }
        }
    }

    fn begin(&self, phase: PhaseName) {
        log::info!(
            operation_id = self.operation_id.as_str(),
            operator = self.operator.as_str(),
            phase = phase.as_str(),
            event = "BEGIN";
            "Starting {phase} phase"
        );
    }

    fn success(&self, phase: PhaseName) {
        log::info!(
            operation_id = self.operation_id.as_str(),
            operator = self.operator.as_str(),
            phase = phase.as_str(),
            event = "SUCCESS";
            "{phase} phase succeeded"
        );
    }

    fn failure(&self, phase: PhaseName, err: &OperatorError) {
        log::error!(
            operation_id = self.operation_id.as_str(),
            operator = self.operator.as_str(),
            phase = phase.as_str(),
            event = "FAILURE",
            kind = err.kind().as_str(),
            error:% = err;
            "{phase} phase failed"
        );
    }
}
