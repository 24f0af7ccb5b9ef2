//! Cluster command client over `crm` and `crmadmin`.

use crate::error::{Error, Result};
use crate::parse::last_line;
use async_trait::async_trait;
use hostexec::{CommandExecutor, Context};
use std::sync::Arc;
use std::time::Duration;

/// Shared budget for the two `crmadmin` probes of [`ClusterCmdClient::is_idle`].
///
/// An unsettled designated controller can make `crmadmin` hang; the budget
/// keeps the caller responsive.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(2);

const IDLE_STATE: &str = "S_IDLE";
const REFRESH_DONE: &str = "got reply (done)";

/// Cluster control capability.
#[async_trait]
pub trait ClusterCmdClient: Send + Sync {
    /// Whether the local cluster stack is up and answering.
    async fn is_host_online(&self, ctx: &Context) -> bool;

    /// Whether the designated controller reports `S_IDLE`.
    async fn is_idle(&self, ctx: &Context) -> Result<bool>;

    /// `crm resource refresh [resource] [node]`.
    ///
    /// An empty `resource_id` refreshes every resource; a `node_id` without a
    /// `resource_id` is rejected.
    async fn resource_refresh(&self, ctx: &Context, resource_id: &str, node_id: &str)
    -> Result<()>;

    /// `crm cluster start`.
    async fn start_cluster(&self, ctx: &Context) -> Result<()>;

    /// `crm cluster stop`.
    async fn stop_cluster(&self, ctx: &Context) -> Result<()>;
}

/// [`ClusterCmdClient`] backed by the crmsh and pacemaker CLIs.
pub struct CrmClient {
    executor: Arc<dyn CommandExecutor>,
    idle_timeout: Duration,
}

impl CrmClient {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            executor,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    /// Override the shared `crmadmin` budget.
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }
}

#[async_trait]
impl ClusterCmdClient for CrmClient {
    async fn is_host_online(&self, ctx: &Context) -> bool {
        match self.executor.exec_ctx(ctx, "crm", &["status"]).await {
            Ok(_) => true,
            Err(e) => {
                log::debug!("Cluster is not online on this host: {e}");
                false
            }
        }
    }

    async fn is_idle(&self, ctx: &Context) -> Result<bool> {
        // Both probes share one budget; the second may see an expired context.
        let ctx = ctx.with_timeout(self.idle_timeout);

        let output = self
            .executor
            .exec_ctx(&ctx, "crmadmin", &["-qD"])
            .await
            .map_err(Error::DesignatedController)?;
        let output = String::from_utf8_lossy(&output);
        let dc = last_line(&output);
        if dc.is_empty() {
            return Err(Error::EmptyDesignatedController);
        }

        let output = self
            .executor
            .exec_ctx(&ctx, "crmadmin", &["-qS", dc])
            .await
            .map_err(Error::ControllerState)?;
        let output = String::from_utf8_lossy(&output);
        let state = last_line(&output);
        log::debug!("Designated controller {dc} is in state {state}");

        Ok(state == IDLE_STATE)
    }

    async fn resource_refresh(
        &self,
        ctx: &Context,
        resource_id: &str,
        node_id: &str,
    ) -> Result<()> {
        if resource_id.is_empty() && !node_id.is_empty() {
            return Err(Error::InvalidRefreshArguments);
        }

        let mut args = vec!["resource", "refresh"];
        if !resource_id.is_empty() {
            args.push(resource_id);
        }
        if !node_id.is_empty() {
            args.push(node_id);
        }

        let output = self
            .executor
            .exec_ctx(ctx, "crm", &args)
            .await
            .map_err(Error::Refresh)?;
        let output = String::from_utf8_lossy(&output);
        if !output.contains(REFRESH_DONE) {
            return Err(Error::RefreshNotDone(output.trim().to_string()));
        }
        Ok(())
    }

    async fn start_cluster(&self, ctx: &Context) -> Result<()> {
        self.executor
            .exec_ctx(ctx, "crm", &["cluster", "start"])
            .await
            .map_err(Error::Start)?;
        Ok(())
    }

    async fn stop_cluster(&self, ctx: &Context) -> Result<()> {
        self.executor
            .exec_ctx(ctx, "crm", &["cluster", "stop"])
            .await
            .map_err(Error::Stop)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostexec::fake::{Response, ScriptedExecutor};

    fn client(exec: &Arc<ScriptedExecutor>) -> CrmClient {
        CrmClient::new(exec.clone())
    }

    #[tokio::test]
    async fn test_is_host_online() {
        let exec = Arc::new(ScriptedExecutor::new());
        exec.on("crm status", Response::ok("Cluster Summary: ..."));
        assert!(client(&exec).is_host_online(&Context::new()).await);

        let exec = Arc::new(ScriptedExecutor::new());
        exec.on("crm status", Response::fail(1, "cluster is not available"));
        assert!(!client(&exec).is_host_online(&Context::new()).await);
    }

    #[tokio::test]
    async fn test_is_idle_reads_dc_state() {
        let exec = Arc::new(ScriptedExecutor::new());
        exec.on("crmadmin -qD", Response::ok("node01\n"))
            .on("crmadmin -qS node01", Response::ok("S_IDLE\n"));
        assert!(client(&exec).is_idle(&Context::new()).await.unwrap());

        let exec = Arc::new(ScriptedExecutor::new());
        exec.on("crmadmin -qD", Response::ok("node01"))
            .on("crmadmin -qS node01", Response::ok("S_TRANSITION_ENGINE"));
        assert!(!client(&exec).is_idle(&Context::new()).await.unwrap());
    }

    #[tokio::test]
    async fn test_is_idle_propagates_dc_failure() {
        let exec = Arc::new(ScriptedExecutor::new());
        exec.on("crmadmin -qD", Response::fail(1, "no DC"));
        let err = client(&exec).is_idle(&Context::new()).await.unwrap_err();
        assert!(matches!(err, Error::DesignatedController(_)));
        assert!(!exec.called("crmadmin -qS"));
    }

    #[tokio::test]
    async fn test_resource_refresh_argument_validation() {
        let exec = Arc::new(ScriptedExecutor::new());
        let err = client(&exec)
            .resource_refresh(&Context::new(), "", "node01")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRefreshArguments));
        assert!(exec.calls().is_empty());
    }

    #[tokio::test]
    async fn test_resource_refresh_requires_done_reply() {
        let exec = Arc::new(ScriptedExecutor::new());
        exec.on(
            "crm resource refresh rsc1 node01",
            Response::ok("Waiting for 1 reply from the controller\n... got reply (done)"),
        )
        .on("crm resource refresh", Response::ok("Waiting for 1 reply"));

        let c = client(&exec);
        c.resource_refresh(&Context::new(), "rsc1", "node01")
            .await
            .unwrap();

        let err = c
            .resource_refresh(&Context::new(), "", "")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RefreshNotDone(_)));
    }

    #[tokio::test]
    async fn test_start_and_stop_cluster() {
        let exec = Arc::new(ScriptedExecutor::new());
        exec.on("crm cluster start", Response::ok(""))
            .on("crm cluster stop", Response::fail(1, "busy"));

        let c = client(&exec);
        c.start_cluster(&Context::new()).await.unwrap();
        let err = c.stop_cluster(&Context::new()).await.unwrap_err();
        assert!(err.to_string().starts_with("error stopping cluster:"));
    }
}
