//! `clusterresourcerefresh`: clear stale failure state of cluster resources.

use super::{Deps, require_idle, require_online};
use async_trait::async_trait;
use crmkit::ClusterCmdClient;
use hostexec::Context;
use operator::arguments::get_optional_string;
use operator::{Arguments, BaseOperator, Diff, OperatorError, Phaser, Result};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshState {
    pub refreshed: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub resource_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub node_id: String,
}

pub struct ClusterResourceRefresh {
    base: BaseOperator<RefreshState>,
    cluster: Arc<dyn ClusterCmdClient>,
    resource_id: String,
    node_id: String,
}

impl ClusterResourceRefresh {
    pub fn new(operation_id: &str, arguments: Arguments, deps: &Deps) -> Self {
        Self {
            base: BaseOperator::new(operation_id, arguments),
            cluster: Arc::clone(&deps.cluster),
            resource_id: String::new(),
            node_id: String::new(),
        }
    }

    fn snapshot(&self, refreshed: bool) -> RefreshState {
        RefreshState {
            refreshed,
            resource_id: self.resource_id.clone(),
            node_id: self.node_id.clone(),
        }
    }
}

#[async_trait]
impl Phaser for ClusterResourceRefresh {
    async fn plan(&mut self, ctx: &Context) -> Result<bool> {
        let args = self.base.arguments();
        let resource_id = get_optional_string(args, "resource_id")?.unwrap_or_default();
        let node_id = get_optional_string(args, "node_id")?.unwrap_or_default();
        if resource_id.is_empty() && !node_id.is_empty() {
            return Err(OperatorError::argument(
                "node_id argument requires resource_id to be provided",
            ));
        }
        self.resource_id = resource_id;
        self.node_id = node_id;

        require_online(ctx, self.cluster.as_ref()).await?;
        self.base.state.set_before(self.snapshot(false));
        Ok(false)
    }

    async fn commit(&mut self, ctx: &Context) -> Result<()> {
        require_idle(ctx, self.cluster.as_ref()).await?;
        self.cluster
            .resource_refresh(ctx, &self.resource_id, &self.node_id)
            .await
            .map_err(|e| OperatorError::execution("error refreshing resource", e))
    }

    async fn verify(&mut self, _ctx: &Context) -> Result<()> {
        let after = self.snapshot(true);
        self.base.state.set_after(after);
        Ok(())
    }

    async fn rollback(&mut self, _ctx: &Context) -> Result<()> {
        Ok(())
    }

    fn operation_diff(&self, _ctx: &Context) -> Result<Diff> {
        self.base.state.diff()
    }

    async fn after(&mut self, _ctx: &Context) {}
}
