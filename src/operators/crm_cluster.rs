//! `crmclusterstart` / `crmclusterstop`: bring the local cluster stack up or
//! down with `crm cluster start|stop`.
//!
//! The stack takes a while to settle, so VERIFY and ROLLBACK poll with
//! exponential backoff.

use super::{Deps, require_idle};
use async_trait::async_trait;
use crmkit::ClusterCmdClient;
use hostexec::Context;
use operator::{
    Arguments, BackoffOptions, BaseOperator, Diff, OperatorError, Phaser, Result, RetryError,
    exponential_backoff,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Started {
    pub started: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stopped {
    pub stopped: bool,
}

/// Map a retry failure; `exhausted` picks the kind once every attempt failed.
fn retry_error(
    context: &str,
    err: RetryError,
    exhausted: fn(String) -> OperatorError,
) -> OperatorError {
    match err {
        RetryError::Cancelled(e) => OperatorError::from(e).context(context),
        RetryError::Exhausted { .. } => exhausted(format!("{context}: {err}")),
    }
}

/// Poll until `is_host_online` equals `online`.
async fn wait_online(
    ctx: &Context,
    cluster: &dyn ClusterCmdClient,
    backoff: &BackoffOptions,
    online: bool,
) -> std::result::Result<(), RetryError> {
    exponential_backoff(ctx, backoff, move || async move {
        if cluster.is_host_online(ctx).await == online {
            Ok(())
        } else if online {
            Err("cluster is not online yet")
        } else {
            Err("cluster is still online")
        }
    })
    .await
}

/// Retry until the designated controller reports `S_IDLE`.
async fn wait_idle(
    ctx: &Context,
    cluster: &dyn ClusterCmdClient,
    backoff: &BackoffOptions,
) -> std::result::Result<(), RetryError> {
    exponential_backoff(ctx, backoff, move || async move {
        require_idle(ctx, cluster).await
    })
    .await
}

// ============================================================================
// Start
// ============================================================================

pub struct CrmClusterStart {
    base: BaseOperator<Started>,
    cluster: Arc<dyn ClusterCmdClient>,
    backoff: BackoffOptions,
}

impl CrmClusterStart {
    pub fn new(operation_id: &str, arguments: Arguments, deps: &Deps) -> Self {
        Self {
            base: BaseOperator::new(operation_id, arguments),
            cluster: Arc::clone(&deps.cluster),
            backoff: deps.backoff,
        }
    }
}

#[async_trait]
impl Phaser for CrmClusterStart {
    async fn plan(&mut self, ctx: &Context) -> Result<bool> {
        let online = self.cluster.is_host_online(ctx).await;
        self.base.state.set_before(Started { started: online });
        if online {
            log::info!("Cluster already running on host");
            self.base.state.mark_applied();
        }
        Ok(online)
    }

    async fn commit(&mut self, ctx: &Context) -> Result<()> {
        self.cluster
            .start_cluster(ctx)
            .await
            .map_err(|e| OperatorError::execution("error starting cluster", e))
    }

    async fn verify(&mut self, ctx: &Context) -> Result<()> {
        wait_online(ctx, self.cluster.as_ref(), &self.backoff, true)
            .await
            .map_err(|e| {
                retry_error("verify cluster started failed", e, OperatorError::Verification)
            })?;
        self.base.state.set_after(Started { started: true });
        Ok(())
    }

    async fn rollback(&mut self, ctx: &Context) -> Result<()> {
        let cluster = self.cluster.as_ref();
        wait_idle(ctx, cluster, &self.backoff)
            .await
            .map_err(|e| retry_error("rollback to stopped failed", e, OperatorError::Execution))?;
        exponential_backoff(ctx, &self.backoff, move || async move {
            cluster.stop_cluster(ctx).await
        })
        .await
        .map_err(|e| retry_error("rollback to stopped failed", e, OperatorError::Execution))
    }

    fn operation_diff(&self, _ctx: &Context) -> Result<Diff> {
        self.base.state.diff()
    }

    async fn after(&mut self, _ctx: &Context) {}
}

// ============================================================================
// Stop
// ============================================================================

pub struct CrmClusterStop {
    base: BaseOperator<Stopped>,
    cluster: Arc<dyn ClusterCmdClient>,
    backoff: BackoffOptions,
}

impl CrmClusterStop {
    pub fn new(operation_id: &str, arguments: Arguments, deps: &Deps) -> Self {
        Self {
            base: BaseOperator::new(operation_id, arguments),
            cluster: Arc::clone(&deps.cluster),
            backoff: deps.backoff,
        }
    }
}

#[async_trait]
impl Phaser for CrmClusterStop {
    async fn plan(&mut self, ctx: &Context) -> Result<bool> {
        let stopped = !self.cluster.is_host_online(ctx).await;
        self.base.state.set_before(Stopped { stopped });
        if stopped {
            log::info!("Cluster already stopped on host");
            self.base.state.mark_applied();
        }
        Ok(stopped)
    }

    async fn commit(&mut self, ctx: &Context) -> Result<()> {
        require_idle(ctx, self.cluster.as_ref()).await?;
        self.cluster
            .stop_cluster(ctx)
            .await
            .map_err(|e| OperatorError::execution("error stopping cluster", e))
    }

    async fn verify(&mut self, ctx: &Context) -> Result<()> {
        wait_online(ctx, self.cluster.as_ref(), &self.backoff, false)
            .await
            .map_err(|e| {
                retry_error("verify cluster stopped failed", e, OperatorError::Verification)
            })?;
        self.base.state.set_after(Stopped { stopped: true });
        Ok(())
    }

    async fn rollback(&mut self, ctx: &Context) -> Result<()> {
        let cluster = self.cluster.as_ref();
        exponential_backoff(ctx, &self.backoff, move || async move {
            cluster.start_cluster(ctx).await
        })
        .await
        .map_err(|e| retry_error("rollback to started failed", e, OperatorError::Execution))
    }

    fn operation_diff(&self, _ctx: &Context) -> Result<Diff> {
        self.base.state.diff()
    }

    async fn after(&mut self, _ctx: &Context) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::testing::{Fixture, diff, run};
    use hostexec::fake::Response;
    use operator::{ErrorKind, PhaseName};

    #[tokio::test]
    async fn test_start_already_running() {
        let fixture = Fixture::new();
        fixture.exec.on("crm status", Response::ok(""));

        let report = run(CrmClusterStart::new("op", Arguments::new(), &fixture.deps())).await;
        assert_eq!(report.as_success().unwrap().last_phase, PhaseName::Plan);
        assert_eq!(diff(&report).0, r#"{"started":true}"#);
        assert!(!fixture.exec.called("crm cluster start"));
    }

    #[tokio::test]
    async fn test_start_waits_until_online() {
        let fixture = Fixture::new();
        fixture
            .exec
            .on("crm status", Response::fail(1, "offline"))
            .on("crm status", Response::fail(1, "offline"))
            .on("crm status", Response::ok(""))
            .on("crm cluster start", Response::ok(""));

        let report = run(CrmClusterStart::new("op", Arguments::new(), &fixture.deps())).await;
        assert_eq!(report.as_success().unwrap().last_phase, PhaseName::Verify);
        let (before, after) = diff(&report);
        assert_eq!(before, r#"{"started":false}"#);
        assert_eq!(after, r#"{"started":true}"#);
        assert_eq!(fixture.exec.count("crm status"), 3);
    }

    #[tokio::test]
    async fn test_start_never_online_rolls_back() {
        let fixture = Fixture::new();
        fixture.controller_state("S_IDLE");
        fixture
            .exec
            .on("crm status", Response::fail(1, "offline"))
            .on("crm cluster start", Response::ok(""))
            .on("crm cluster stop", Response::ok(""));

        let report = run(CrmClusterStart::new("op", Arguments::new(), &fixture.deps())).await;
        let error = report.as_error().unwrap();
        assert_eq!(error.error_phase, PhaseName::Verify);
        assert_eq!(
            error.message,
            "verify cluster started failed: operation failed after 3 attempts: cluster is not online yet"
        );
        assert_eq!(fixture.exec.count("crm cluster stop"), 1);
    }

    #[tokio::test]
    async fn test_exhausted_rollback_is_an_execution_error() {
        let fixture = Fixture::new();
        fixture.controller_state("S_IDLE");
        fixture
            .exec
            .on("crm cluster stop", Response::fail(1, "stop refused"));

        let mut op = CrmClusterStart::new("op", Arguments::new(), &fixture.deps());
        let err = op.rollback(&Context::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Execution);
        let prefix = "rollback to stopped failed: operation failed after 3 attempts";
        assert!(err.to_string().starts_with(prefix));
        assert_eq!(fixture.exec.count("crm cluster stop"), 3);
    }

    #[tokio::test]
    async fn test_stop_requires_idle_before_commit() {
        let fixture = Fixture::new();
        fixture.controller_state("S_POLICY_ENGINE");
        fixture
            .exec
            .on("crm status", Response::ok(""))
            .on("crm cluster start", Response::ok(""));

        let report = run(CrmClusterStop::new("op", Arguments::new(), &fixture.deps())).await;
        let error = report.as_error().unwrap();
        assert_eq!(error.error_phase, PhaseName::Commit);
        assert_eq!(error.message, "cluster is not in S_IDLE state");
        assert!(!fixture.exec.called("crm cluster stop"));
    }

    #[tokio::test]
    async fn test_stop_succeeds_once_offline() {
        let fixture = Fixture::new();
        fixture.controller_state("S_IDLE");
        fixture
            .exec
            .on("crm status", Response::ok(""))
            .on("crm status", Response::fail(1, "offline"))
            .on("crm cluster stop", Response::ok(""));

        let report = run(CrmClusterStop::new("op", Arguments::new(), &fixture.deps())).await;
        let (before, after) = diff(&report);
        assert_eq!(before, r#"{"stopped":false}"#);
        assert_eq!(after, r#"{"stopped":true}"#);
    }
}
