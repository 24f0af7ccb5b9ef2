//! `sapinstancestart` / `sapinstancestop`: start or stop one SAP instance
//! through its sapcontrol daemon.

use super::sap::{SapArguments, poll_until, sap_error};
use super::{Deps, planned};
use async_trait::async_trait;
use hostexec::Context;
use operator::{Arguments, BaseOperator, Diff, Phaser, Result};
use sapcontrol::{OsProcess, SapControlWebService, StateColor, WebServiceConnector};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Started {
    pub started: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stopped {
    pub stopped: bool,
}

/// Every process green. An empty list is not started: the daemon reports no
/// processes for a moment while the instance comes up.
pub fn is_started(processes: &[OsProcess]) -> bool {
    !processes.is_empty() && processes.iter().all(|p| p.dispstatus == StateColor::Green)
}

/// Every process gray.
pub fn is_stopped(processes: &[OsProcess]) -> bool {
    processes.iter().all(|p| p.dispstatus == StateColor::Gray)
}

/// Connection and wait parameters resolved in PLAN.
struct Session {
    client: Arc<dyn SapControlWebService>,
    timeout: Duration,
}

/// State shared by the start and stop operators.
struct Instance {
    connector: Arc<dyn WebServiceConnector>,
    poll_interval: Duration,
    default_timeout: Duration,
    session: Option<Session>,
}

impl Instance {
    fn new(deps: &Deps) -> Self {
        Self {
            connector: Arc::clone(&deps.sapcontrol),
            poll_interval: deps.poll_interval,
            default_timeout: deps.default_timeout,
            session: None,
        }
    }

    fn connect(&mut self, args: &Arguments) -> Result<()> {
        let parsed = SapArguments::parse(args, self.default_timeout)?;
        self.session = Some(Session {
            client: self.connector.connect(&parsed.instance_number),
            timeout: parsed.timeout,
        });
        Ok(())
    }

    fn session(&self) -> Result<&Session> {
        planned(self.session.as_ref())
    }

    async fn processes(&self, ctx: &Context) -> Result<Vec<OsProcess>> {
        self.session()?
            .client
            .get_process_list(ctx)
            .await
            .map_err(|e| sap_error("error getting instance process list", e))
    }

    async fn start(&self, ctx: &Context) -> Result<()> {
        self.session()?
            .client
            .start(ctx)
            .await
            .map_err(|e| sap_error("error starting instance", e))
    }

    async fn stop(&self, ctx: &Context) -> Result<()> {
        self.session()?
            .client
            .stop(ctx)
            .await
            .map_err(|e| sap_error("error stopping instance", e))
    }

    async fn wait_for(&self, ctx: &Context, check: fn(&[OsProcess]) -> bool) -> Result<()> {
        let session = self.session()?;
        let client = session.client.as_ref();
        poll_until(
            ctx,
            session.timeout,
            self.poll_interval,
            "instance",
            move || async move {
                client
                    .get_process_list(ctx)
                    .await
                    .map(|processes| check(&processes))
            },
        )
        .await
    }

    fn release(&mut self) {
        self.session = None;
    }
}

// ============================================================================
// Start
// ============================================================================

pub struct SapInstanceStart {
    base: BaseOperator<Started>,
    instance: Instance,
}

impl SapInstanceStart {
    pub fn new(operation_id: &str, arguments: Arguments, deps: &Deps) -> Self {
        Self {
            base: BaseOperator::new(operation_id, arguments),
            instance: Instance::new(deps),
        }
    }
}

#[async_trait]
impl Phaser for SapInstanceStart {
    async fn plan(&mut self, ctx: &Context) -> Result<bool> {
        self.instance.connect(self.base.arguments())?;
        let started = is_started(&self.instance.processes(ctx).await?);
        self.base.state.set_before(Started { started });
        if started {
            log::info!("SAP instance already started");
            self.base.state.mark_applied();
        }
        Ok(started)
    }

    async fn commit(&mut self, ctx: &Context) -> Result<()> {
        self.instance.start(ctx).await
    }

    async fn verify(&mut self, ctx: &Context) -> Result<()> {
        self.instance
            .wait_for(ctx, is_started)
            .await
            .map_err(|e| e.context("verify instance started failed"))?;
        self.base.state.set_after(Started { started: true });
        Ok(())
    }

    async fn rollback(&mut self, ctx: &Context) -> Result<()> {
        let context = "rollback to stopped failed";
        self.instance
            .stop(ctx)
            .await
            .map_err(|e| e.context(context))?;
        self.instance
            .wait_for(ctx, is_stopped)
            .await
            .map_err(|e| e.context(context))
    }

    fn operation_diff(&self, _ctx: &Context) -> Result<Diff> {
        self.base.state.diff()
    }

    async fn after(&mut self, _ctx: &Context) {
        self.instance.release();
    }
}

// ============================================================================
// Stop
// ============================================================================

pub struct SapInstanceStop {
    base: BaseOperator<Stopped>,
    instance: Instance,
}

impl SapInstanceStop {
    pub fn new(operation_id: &str, arguments: Arguments, deps: &Deps) -> Self {
        Self {
            base: BaseOperator::new(operation_id, arguments),
            instance: Instance::new(deps),
        }
    }
}

#[async_trait]
impl Phaser for SapInstanceStop {
    async fn plan(&mut self, ctx: &Context) -> Result<bool> {
        self.instance.connect(self.base.arguments())?;
        let stopped = is_stopped(&self.instance.processes(ctx).await?);
        self.base.state.set_before(Stopped { stopped });
        if stopped {
            log::info!("SAP instance already stopped");
            self.base.state.mark_applied();
        }
        Ok(stopped)
    }

    async fn commit(&mut self, ctx: &Context) -> Result<()> {
        self.instance.stop(ctx).await
    }

    async fn verify(&mut self, ctx: &Context) -> Result<()> {
        self.instance
            .wait_for(ctx, is_stopped)
            .await
            .map_err(|e| e.context("verify instance stopped failed"))?;
        self.base.state.set_after(Stopped { stopped: true });
        Ok(())
    }

    async fn rollback(&mut self, ctx: &Context) -> Result<()> {
        let context = "rollback to started failed";
        self.instance
            .start(ctx)
            .await
            .map_err(|e| e.context(context))?;
        self.instance
            .wait_for(ctx, is_started)
            .await
            .map_err(|e| e.context(context))
    }

    fn operation_diff(&self, _ctx: &Context) -> Result<Diff> {
        self.base.state.diff()
    }

    async fn after(&mut self, _ctx: &Context) {
        self.instance.release();
    }
}
