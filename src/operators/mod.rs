//! Built-in operators and the registry wiring them.
//!
//! Every operator parses its arguments in PLAN, reads state through the
//! capabilities in [`Deps`], and records typed before/after snapshots in its
//! [`BaseOperator`](operator::BaseOperator).

pub mod cluster_maintenance_change;
pub mod cluster_resource_refresh;
pub mod crm_cluster;
pub mod host_reboot;
pub mod sap;
pub mod sap_instance;
pub mod sap_system;
pub mod saptune_solution;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

use crate::config::Config;
use crmkit::{ClusterCmdClient, CrmClient};
use hostexec::{CommandExecutor, Context};
use operator::{Arguments, BackoffOptions, Executor, OperatorError, Phaser, Registry, Result};
use sapcontrol::{UnixSocketConnector, WebServiceConnector};
use saptune::{SaptuneCli, SaptuneClient};
use std::sync::Arc;
use std::time::Duration;
use systemdkit::{DbusLoader, SystemdLoader};

const V1: &str = "v1";

/// Capabilities and tunables shared by the built-in operators.
#[derive(Clone)]
pub struct Deps {
    pub executor: Arc<dyn CommandExecutor>,
    pub cluster: Arc<dyn ClusterCmdClient>,
    pub sapcontrol: Arc<dyn WebServiceConnector>,
    pub saptune: Arc<dyn SaptuneClient>,
    pub systemd: Arc<dyn SystemdLoader>,
    /// Cluster start/stop polling
    pub backoff: BackoffOptions,
    /// Cadence of sapcontrol state polls
    pub poll_interval: Duration,
    /// SAP wait budget when no `timeout` argument is given
    pub default_timeout: Duration,
    /// Unit driven by the enable/disable operators
    pub service_unit: String,
}

impl Deps {
    /// Real host capabilities tuned by `config`.
    pub fn from_config(config: &Config) -> Self {
        let executor: Arc<dyn CommandExecutor> = Arc::new(hostexec::Executor);
        Self {
            cluster: Arc::new(
                CrmClient::new(Arc::clone(&executor)).with_idle_timeout(config.idle_timeout()),
            ),
            sapcontrol: Arc::new(UnixSocketConnector {
                timeout: config.client_timeout(),
            }),
            saptune: Arc::new(SaptuneCli::new(Arc::clone(&executor))),
            systemd: Arc::new(DbusLoader),
            executor,
            backoff: config.backoff_options(),
            poll_interval: config.poll_interval(),
            default_timeout: config.default_timeout(),
            service_unit: config.systemd.unit.clone(),
        }
    }
}

/// Registry with every built-in operator on the real host.
pub fn standard_registry(config: &Config) -> Registry {
    registry_with(&Deps::from_config(config))
}

/// Registry with every built-in operator on the given capabilities.
pub fn registry_with(deps: &Deps) -> Registry {
    use cluster_maintenance_change::ClusterMaintenanceChange;
    use cluster_resource_refresh::ClusterResourceRefresh;
    use crm_cluster::{CrmClusterStart, CrmClusterStop};
    use host_reboot::HostReboot;
    use sap_instance::{SapInstanceStart, SapInstanceStop};
    use sap_system::{SapSystemStart, SapSystemStop};
    use saptune_solution::{SaptuneApplySolution, SaptuneChangeSolution};
    use service::{ServiceDisable, ServiceEnable};

    let mut registry = Registry::new();
    register(&mut registry, "clustermaintenancechange", deps, |id, args, d| {
        Box::new(ClusterMaintenanceChange::new(id, args, d))
    });
    register(&mut registry, "clusterresourcerefresh", deps, |id, args, d| {
        Box::new(ClusterResourceRefresh::new(id, args, d))
    });
    register(&mut registry, "crmclusterstart", deps, |id, args, d| {
        Box::new(CrmClusterStart::new(id, args, d))
    });
    register(&mut registry, "crmclusterstop", deps, |id, args, d| {
        Box::new(CrmClusterStop::new(id, args, d))
    });
    register(&mut registry, "sapinstancestart", deps, |id, args, d| {
        Box::new(SapInstanceStart::new(id, args, d))
    });
    register(&mut registry, "sapinstancestop", deps, |id, args, d| {
        Box::new(SapInstanceStop::new(id, args, d))
    });
    register(&mut registry, "sapsystemstart", deps, |id, args, d| {
        Box::new(SapSystemStart::new(id, args, d))
    });
    register(&mut registry, "sapsystemstop", deps, |id, args, d| {
        Box::new(SapSystemStop::new(id, args, d))
    });
    register(&mut registry, "saptuneapplysolution", deps, |id, args, d| {
        Box::new(SaptuneApplySolution::new(id, args, d))
    });
    register(&mut registry, "saptunechangesolution", deps, |id, args, d| {
        Box::new(SaptuneChangeSolution::new(id, args, d))
    });
    register(&mut registry, "pacemakerenable", deps, |id, args, d| {
        Box::new(ServiceEnable::new(id, args, d))
    });
    register(&mut registry, "pacemakerdisable", deps, |id, args, d| {
        Box::new(ServiceDisable::new(id, args, d))
    });
    register(&mut registry, "hostreboot", deps, |id, args, d| {
        Box::new(HostReboot::new(id, args, d))
    });
    registry
}

fn register<F>(registry: &mut Registry, name: &'static str, deps: &Deps, build: F)
where
    F: Fn(&str, Arguments, &Deps) -> Box<dyn Phaser> + Send + Sync + 'static,
{
    let deps = deps.clone();
    registry.register(
        name,
        V1,
        Arc::new(move |operation_id: &str, arguments: Arguments| {
            Executor::new(operation_id, name, build(operation_id, arguments, &deps))
        }),
    );
}

// ============================================================================
// Shared phase helpers
// ============================================================================

/// Value recorded during PLAN, needed by the later phases.
pub(crate) fn planned<T>(value: Option<&T>) -> Result<&T> {
    value.ok_or_else(|| OperatorError::invariant("operation was not planned"))
}

/// Fail unless the cluster stack answers on this host.
pub(crate) async fn require_online(ctx: &Context, cluster: &dyn ClusterCmdClient) -> Result<()> {
    if cluster.is_host_online(ctx).await {
        Ok(())
    } else {
        Err(OperatorError::precondition("cluster is not running on host"))
    }
}

/// Fail unless the designated controller reports `S_IDLE`.
pub(crate) async fn require_idle(ctx: &Context, cluster: &dyn ClusterCmdClient) -> Result<()> {
    let idle = cluster
        .is_idle(ctx)
        .await
        .map_err(|e| OperatorError::state_read("error checking if cluster is idle", e))?;
    if idle {
        Ok(())
    } else {
        Err(OperatorError::invariant("cluster is not in S_IDLE state"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::testing::Fixture;

    #[test]
    fn test_standard_registry_lists_every_operator() {
        let registry = registry_with(&Fixture::new().deps());
        assert_eq!(
            registry.available_operators(),
            vec![
                "clustermaintenancechange - v1",
                "clusterresourcerefresh - v1",
                "crmclusterstart - v1",
                "crmclusterstop - v1",
                "hostreboot - v1",
                "pacemakerdisable - v1",
                "pacemakerenable - v1",
                "sapinstancestart - v1",
                "sapinstancestop - v1",
                "sapsystemstart - v1",
                "sapsystemstop - v1",
                "saptuneapplysolution - v1",
                "saptunechangesolution - v1",
            ]
        );
    }

    #[tokio::test]
    async fn test_builder_produces_named_executor() {
        let registry = registry_with(&Fixture::new().deps());
        let builder = registry.get_operator_builder("hostreboot@v1").unwrap();
        let executor = builder("op-7", Arguments::new());
        assert_eq!(executor.operator(), "hostreboot");
        assert_eq!(executor.operation_id(), "op-7");
        assert!(registry.get_operator_builder("hostreboot@v2").is_err());
    }

    #[tokio::test]
    async fn test_argument_errors_fail_in_plan() {
        let fixture = Fixture::new();
        let registry = registry_with(&fixture.deps());
        let builder = registry.get_operator_builder("saptuneapplysolution").unwrap();
        let report = builder("op-1", Arguments::new()).run(&Context::new()).await;

        let error = report.as_error().unwrap();
        assert_eq!(error.error_phase, operator::PhaseName::Plan);
        assert_eq!(
            error.message,
            "argument solution not provided, could not use the operator"
        );
        assert!(fixture.saptune.calls().is_empty());
    }
}
