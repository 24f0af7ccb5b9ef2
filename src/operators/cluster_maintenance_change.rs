//! `clustermaintenancechange`: toggle the maintenance flag of the cluster, a
//! resource or a node.

use super::{Deps, planned, require_idle, require_online};
use async_trait::async_trait;
use crmkit::ClusterCmdClient;
use crmkit::parse::{node_attribute_value, parse_last_line_bool};
use hostexec::{CommandExecutor, Context};
use operator::arguments::{get_bool, get_optional_string};
use operator::{Arguments, BaseOperator, Diff, OperatorError, Phaser, Result};
use serde::Serialize;
use std::sync::Arc;

const NOT_FOUND: &str = "not found";
const UNKNOWN_NODE: &str = "Could not map";

/// Maintenance snapshot; empty ids are left out of the JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaintenanceState {
    pub maintenance: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub resource_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub node_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Scope {
    Cluster,
    Resource(String),
    Node(String),
}

#[derive(Debug, Clone)]
struct Request {
    maintenance: bool,
    scope: Scope,
}

impl Request {
    fn parse(args: &Arguments) -> Result<Self> {
        let maintenance = get_bool(args, "maintenance")?;
        let resource_id = get_optional_string(args, "resource_id")?.unwrap_or_default();
        let node_id = get_optional_string(args, "node_id")?.unwrap_or_default();

        let scope = match (resource_id.is_empty(), node_id.is_empty()) {
            (false, false) => {
                return Err(OperatorError::argument(
                    "resource_id and node_id arguments are mutually exclusive, use only one of them",
                ));
            }
            (false, true) => Scope::Resource(resource_id),
            (true, false) => Scope::Node(node_id),
            (true, true) => Scope::Cluster,
        };
        Ok(Self { maintenance, scope })
    }

    fn snapshot(&self, maintenance: bool) -> MaintenanceState {
        let (resource_id, node_id) = match &self.scope {
            Scope::Cluster => (String::new(), String::new()),
            Scope::Resource(id) => (id.clone(), String::new()),
            Scope::Node(id) => (String::new(), id.clone()),
        };
        MaintenanceState {
            maintenance,
            resource_id,
            node_id,
        }
    }

    /// Resource to refresh before leaving maintenance; empty means all.
    fn refresh_target(&self) -> &str {
        match &self.scope {
            Scope::Resource(id) => id,
            _ => "",
        }
    }
}

pub struct ClusterMaintenanceChange {
    base: BaseOperator<MaintenanceState>,
    executor: Arc<dyn CommandExecutor>,
    cluster: Arc<dyn ClusterCmdClient>,
    request: Option<Request>,
}

impl ClusterMaintenanceChange {
    pub fn new(operation_id: &str, arguments: Arguments, deps: &Deps) -> Self {
        Self {
            base: BaseOperator::new(operation_id, arguments),
            executor: Arc::clone(&deps.executor),
            cluster: Arc::clone(&deps.cluster),
            request: None,
        }
    }

    async fn crm(&self, ctx: &Context, args: &[&str]) -> hostexec::Result<String> {
        let output = self.executor.exec_ctx(ctx, "crm", args).await?;
        Ok(String::from_utf8_lossy(&output).into_owned())
    }

    /// Like [`Self::crm`], but a failure whose output says `not found` is
    /// returned as output; `crm` exits non-zero for unset meta attributes.
    async fn crm_meta(&self, ctx: &Context, args: &[&str]) -> hostexec::Result<String> {
        match self.crm(ctx, args).await {
            Err(e) if e.output().is_some_and(|o| o.contains(NOT_FOUND)) => {
                Ok(e.output().unwrap_or_default().to_string())
            }
            other => other,
        }
    }

    async fn read(&self, ctx: &Context, scope: &Scope) -> Result<bool> {
        match scope {
            Scope::Cluster => {
                let output = self
                    .crm(ctx, &["configure", "get_property", "-t", "maintenance-mode"])
                    .await
                    .map_err(|e| {
                        OperatorError::state_read("error getting maintenance-mode property", e)
                    })?;
                parse_last_line_bool(&output).ok_or_else(|| {
                    OperatorError::StateRead(format!(
                        "could not parse maintenance-mode value: {}",
                        output.trim()
                    ))
                })
            }
            Scope::Resource(id) => self.read_resource(ctx, id).await,
            Scope::Node(id) => self.read_node(ctx, id).await,
        }
    }

    async fn read_resource(&self, ctx: &Context, resource_id: &str) -> Result<bool> {
        let read_err =
            |e| OperatorError::state_read("error getting resource maintenance attribute", e);

        let output = self
            .crm_meta(ctx, &["resource", "meta", resource_id, "show", "maintenance"])
            .await
            .map_err(read_err)?;
        if !output.contains(NOT_FOUND) {
            return parse_meta_bool(&output, "maintenance");
        }

        log::debug!("No maintenance attribute on {resource_id}, checking is-managed");
        let output = self
            .crm_meta(ctx, &["resource", "meta", resource_id, "show", "is-managed"])
            .await
            .map_err(read_err)?;
        if output.contains(NOT_FOUND) {
            return Ok(false);
        }
        parse_meta_bool(&output, "is-managed").map(|managed| !managed)
    }

    async fn read_node(&self, ctx: &Context, node_id: &str) -> Result<bool> {
        const CONTEXT: &str = "error getting node maintenance attribute";

        let output = self
            .crm(ctx, &["node", "attribute", node_id, "show", "maintenance"])
            .await
            .map_err(|e| OperatorError::state_read(CONTEXT, e))?;
        if output.contains(UNKNOWN_NODE) {
            return Err(OperatorError::state_read(CONTEXT, output.trim()));
        }
        let value =
            node_attribute_value(&output).map_err(|e| OperatorError::state_read(CONTEXT, e))?;
        Ok(value == Some("true"))
    }

    async fn write(&self, ctx: &Context, scope: &Scope, maintenance: bool) -> Result<()> {
        let toggle = if maintenance { "on" } else { "off" };
        let result = match scope {
            Scope::Cluster => self.crm(ctx, &["maintenance", toggle]).await,
            Scope::Resource(id) => self.crm(ctx, &["maintenance", toggle, id]).await,
            Scope::Node(id) => {
                let action = if maintenance { "maintenance" } else { "ready" };
                self.crm(ctx, &["--force", "node", action, id]).await
            }
        };
        result
            .map(drop)
            .map_err(|e| OperatorError::execution("error setting maintenance state", e))
    }
}

fn parse_meta_bool(output: &str, attribute: &str) -> Result<bool> {
    parse_last_line_bool(output).ok_or_else(|| {
        OperatorError::StateRead(format!(
            "could not parse {attribute} value: {}",
            output.trim()
        ))
    })
}

#[async_trait]
impl Phaser for ClusterMaintenanceChange {
    async fn plan(&mut self, ctx: &Context) -> Result<bool> {
        let request = Request::parse(self.base.arguments())?;
        require_online(ctx, self.cluster.as_ref()).await?;

        let current = self.read(ctx, &request.scope).await?;
        self.base.state.set_before(request.snapshot(current));
        let applied = current == request.maintenance;
        self.request = Some(request);

        if applied {
            log::info!("Maintenance already set to {current}");
            self.base.state.mark_applied();
        }
        Ok(applied)
    }

    async fn commit(&mut self, ctx: &Context) -> Result<()> {
        let request = planned(self.request.as_ref())?;
        require_idle(ctx, self.cluster.as_ref()).await?;

        if !request.maintenance {
            self.cluster
                .resource_refresh(ctx, request.refresh_target(), "")
                .await
                .map_err(|e| OperatorError::execution("error refreshing resource", e))?;
        }
        self.write(ctx, &request.scope, request.maintenance).await
    }

    async fn verify(&mut self, ctx: &Context) -> Result<()> {
        let request = planned(self.request.as_ref())?;
        let current = self.read(ctx, &request.scope).await?;
        if current != request.maintenance {
            return Err(OperatorError::verification(format!(
                "verify maintenance failed, the maintenance value {} was not set",
                request.maintenance
            )));
        }
        let snapshot = request.snapshot(current);
        self.base.state.set_after(snapshot);
        Ok(())
    }

    async fn rollback(&mut self, ctx: &Context) -> Result<()> {
        let request = planned(self.request.as_ref())?;
        let before = planned(self.base.state.before())?.maintenance;
        require_idle(ctx, self.cluster.as_ref()).await?;
        self.write(ctx, &request.scope, before)
            .await
            .map_err(|e| e.context("error rolling back maintenance state"))
    }

    fn operation_diff(&self, _ctx: &Context) -> Result<Diff> {
        self.base.state.diff()
    }

    async fn after(&mut self, _ctx: &Context) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::testing::{Fixture, args, diff, run};
    use hostexec::fake::Response;
    use operator::PhaseName;
    use serde_json::json;

    const CLUSTER_GET: &str = "crm configure get_property -t maintenance-mode";

    fn operator(fixture: &Fixture, arguments: serde_json::Value) -> ClusterMaintenanceChange {
        ClusterMaintenanceChange::new("op", args(arguments), &fixture.deps())
    }

    #[tokio::test]
    async fn test_cluster_already_in_maintenance() {
        let fixture = Fixture::new();
        fixture
            .exec
            .on("crm status", Response::ok("Cluster Summary:"))
            .on(CLUSTER_GET, Response::ok("true"));

        let report = run(operator(&fixture, json!({"maintenance": true}))).await;
        assert_eq!(report.as_success().unwrap().last_phase, PhaseName::Plan);
        let (before, after) = diff(&report);
        assert_eq!(before, r#"{"maintenance":true}"#);
        assert_eq!(after, r#"{"maintenance":true}"#);
        assert!(!fixture.exec.called("crm maintenance on"));
    }

    #[tokio::test]
    async fn test_resource_maintenance_through_is_managed() {
        let fixture = Fixture::new();
        fixture.controller_state("S_IDLE");
        fixture
            .exec
            .on("crm status", Response::ok(""))
            .on(
                "crm resource meta some-id show maintenance",
                Response::ok("not found"),
            )
            .on(
                "crm resource meta some-id show is-managed",
                Response::ok("true"),
            )
            .on(
                "crm resource meta some-id show is-managed",
                Response::ok("false"),
            )
            .on("crm maintenance on some-id", Response::ok(""));

        let report = run(operator(
            &fixture,
            json!({"maintenance": true, "resource_id": "some-id"}),
        ))
        .await;

        assert_eq!(report.as_success().unwrap().last_phase, PhaseName::Verify);
        let (before, after) = diff(&report);
        assert_eq!(before, r#"{"maintenance":false,"resource_id":"some-id"}"#);
        assert_eq!(after, r#"{"maintenance":true,"resource_id":"some-id"}"#);
        assert_eq!(fixture.exec.count("crm maintenance on some-id"), 1);
    }

    #[tokio::test]
    async fn test_node_maintenance_parsing() {
        let fixture = Fixture::new();
        let op = operator(&fixture, json!({"maintenance": true, "node_id": "node1"}));
        let ctx = Context::new();
        let cmd = "crm node attribute node1 show maintenance";

        fixture
            .exec
            .on(cmd, Response::ok("scope=nodes  name=maintenance value=true"))
            .on(cmd, Response::ok("value=off"));
        assert!(op.read_node(&ctx, "node1").await.unwrap());
        assert!(!op.read_node(&ctx, "node1").await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_node_fails_in_plan() {
        let fixture = Fixture::new();
        fixture
            .exec
            .on("crm status", Response::ok(""))
            .on(
                "crm node attribute some-id show maintenance",
                Response::fail(1, "Could not map name=some-id to a UUID"),
            );

        let report = run(operator(
            &fixture,
            json!({"maintenance": true, "node_id": "some-id"}),
        ))
        .await;
        let error = report.as_error().unwrap();
        assert_eq!(error.error_phase, PhaseName::Plan);
        assert!(
            error
                .message
                .starts_with("error getting node maintenance attribute: ")
        );
    }

    #[tokio::test]
    async fn test_leaving_maintenance_refreshes_first() {
        let fixture = Fixture::new();
        fixture.controller_state("S_IDLE");
        fixture
            .exec
            .on("crm status", Response::ok(""))
            .on(CLUSTER_GET, Response::ok("DEBUG: x\ntrue"))
            .on(CLUSTER_GET, Response::ok("false"))
            .on("crm resource refresh", Response::ok("got reply (done)"))
            .on("crm maintenance off", Response::ok(""));

        let report = run(operator(&fixture, json!({"maintenance": false}))).await;
        assert!(report.is_success(), "{report:?}");

        let calls = fixture.exec.calls();
        let refresh = calls.iter().position(|c| c == "crm resource refresh");
        let write = calls.iter().position(|c| c == "crm maintenance off");
        assert!(refresh.unwrap() < write.unwrap());
    }

    #[tokio::test]
    async fn test_commit_requires_idle_cluster() {
        let fixture = Fixture::new();
        fixture.controller_state("S_TRANSITION_ENGINE");
        fixture
            .exec
            .on("crm status", Response::ok(""))
            .on(CLUSTER_GET, Response::ok("false"));

        let report = run(operator(&fixture, json!({"maintenance": true}))).await;
        let error = report.as_error().unwrap();
        // Rollback needs an idle cluster too
        assert_eq!(error.error_phase, PhaseName::Rollback);
        assert_eq!(
            error.message,
            "cluster is not in S_IDLE state\ncluster is not in S_IDLE state"
        );
        assert!(!fixture.exec.called("crm maintenance on"));
    }

    #[tokio::test]
    async fn test_verify_mismatch_rolls_back() {
        let fixture = Fixture::new();
        fixture.controller_state("S_IDLE");
        fixture
            .exec
            .on("crm status", Response::ok(""))
            .on(CLUSTER_GET, Response::ok("false"))
            .on("crm maintenance on", Response::ok(""))
            .on("crm maintenance off", Response::ok(""));

        let report = run(operator(&fixture, json!({"maintenance": true}))).await;
        let error = report.as_error().unwrap();
        assert_eq!(error.error_phase, PhaseName::Verify);
        assert_eq!(
            error.message,
            "verify maintenance failed, the maintenance value true was not set"
        );
        assert_eq!(fixture.exec.count("crm maintenance off"), 1);
    }

    #[tokio::test]
    async fn test_offline_cluster_is_a_plan_error() {
        let fixture = Fixture::new();
        fixture.exec.on("crm status", Response::fail(1, "not running"));

        let report = run(operator(&fixture, json!({"maintenance": true}))).await;
        let error = report.as_error().unwrap();
        assert_eq!(error.error_phase, PhaseName::Plan);
        assert_eq!(error.message, "cluster is not running on host");
    }

    #[test]
    fn test_argument_validation() {
        let both = args(json!({"maintenance": true, "resource_id": "r", "node_id": "n"}));
        let err = Request::parse(&both).unwrap_err();
        assert_eq!(err.kind(), operator::ErrorKind::Argument);

        let request = Request::parse(&args(
            json!({"maintenance": false, "resource_id": "", "node_id": "n"}),
        ))
        .unwrap();
        assert_eq!(request.scope, Scope::Node("n".to_string()));

        assert!(Request::parse(&args(json!({"maintenance": "yes"}))).is_err());
    }
}
