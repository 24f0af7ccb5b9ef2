//! `sapsystemstart` / `sapsystemstop`: start or stop a whole SAP system, or
//! one class of its instances, through `StartSystem`/`StopSystem`.

use super::sap::{SapArguments, poll_until, sap_error};
use super::{Deps, planned};
use async_trait::async_trait;
use hostexec::Context;
use operator::arguments::get_optional_string;
use operator::{Arguments, BaseOperator, Diff, OperatorError, Phaser, Result};
use sapcontrol::{
    SapControlWebService, SapInstance, StartStopOption, StateColor, SystemRequest,
    WebServiceConnector,
};
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

/// Class of instances an operation acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceType {
    All,
    Abap,
    J2ee,
    Scs,
    Enqrep,
}

impl InstanceType {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "all" => Ok(Self::All),
            "abap" => Ok(Self::Abap),
            "j2ee" => Ok(Self::J2ee),
            "scs" => Ok(Self::Scs),
            "enqrep" => Ok(Self::Enqrep),
            other => Err(OperatorError::argument(format!(
                "invalid instance_type value: {other}, must be one of all, abap, j2ee, scs, enqrep"
            ))),
        }
    }

    pub fn option(self) -> StartStopOption {
        match self {
            Self::All => StartStopOption::AllInstances,
            Self::Abap => StartStopOption::AbapInstances,
            Self::J2ee => StartStopOption::J2eeInstances,
            Self::Scs => StartStopOption::ScsInstances,
            Self::Enqrep => StartStopOption::EnqrepInstances,
        }
    }

    /// Substring of `features` selecting the instances of this class.
    pub fn feature(self) -> &'static str {
        match self {
            Self::All => "",
            Self::Abap => "ABAP",
            Self::J2ee => "J2EE",
            Self::Scs => "MESSAGESERVER",
            Self::Enqrep => "ENQREP",
        }
    }

    fn selects(self, instance: &SapInstance) -> bool {
        instance.features.contains(self.feature())
    }
}

/// Every selected instance green; nothing selected is not started.
pub fn all_started(instance_type: InstanceType, instances: &[SapInstance]) -> bool {
    let mut selected = instances.iter().filter(|i| instance_type.selects(i)).peekable();
    selected.peek().is_some() && selected.all(|i| i.dispstatus == StateColor::Green)
}

/// Every selected instance gray.
pub fn all_stopped(instance_type: InstanceType, instances: &[SapInstance]) -> bool {
    instances
        .iter()
        .filter(|i| instance_type.selects(i))
        .all(|i| i.dispstatus == StateColor::Gray)
}

type Check = fn(InstanceType, &[SapInstance]) -> bool;

struct Session {
    client: Arc<dyn SapControlWebService>,
    timeout: Duration,
    instance_type: InstanceType,
}

impl Session {
    fn request(&self) -> SystemRequest {
        // Partial seconds round up
        let wait = self.timeout.as_secs_f64().ceil().min(f64::from(u32::MAX)) as u32;
        SystemRequest {
            options: self.instance_type.option(),
            // Without a wait timeout the daemon answers before anything moved
            wait_timeout_secs: Some(wait),
        }
    }
}

struct System {
    connector: Arc<dyn WebServiceConnector>,
    poll_interval: Duration,
    default_timeout: Duration,
    session: Option<Session>,
}

impl System {
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
        let instance_type = match get_optional_string(args, "instance_type")? {
            None => InstanceType::All,
            Some(value) if value.is_empty() => InstanceType::All,
            Some(value) => InstanceType::parse(&value)?,
        };
        self.session = Some(Session {
            client: self.connector.connect(&parsed.instance_number),
            timeout: parsed.timeout,
            instance_type,
        });
        Ok(())
    }

    fn session(&self) -> Result<&Session> {
        planned(self.session.as_ref())
    }

    async fn check(&self, ctx: &Context, check: Check) -> Result<bool> {
        let session = self.session()?;
        let instances = session
            .client
            .get_system_instance_list(ctx)
            .await
            .map_err(|e| sap_error("error getting system instance list", e))?;
        Ok(check(session.instance_type, &instances))
    }

    async fn start(&self, ctx: &Context) -> Result<()> {
        let session = self.session()?;
        session
            .client
            .start_system(ctx, &session.request())
            .await
            .map_err(|e| sap_error("error starting system", e))
    }

    async fn stop(&self, ctx: &Context) -> Result<()> {
        let session = self.session()?;
        session
            .client
            .stop_system(ctx, &session.request())
            .await
            .map_err(|e| sap_error("error stopping system", e))
    }

    async fn wait_for(&self, ctx: &Context, check: Check) -> Result<()> {
        let session = self.session()?;
        let client = session.client.as_ref();
        let instance_type = session.instance_type;
        poll_until(
            ctx,
            session.timeout,
            self.poll_interval,
            "system",
            move || async move {
                client
                    .get_system_instance_list(ctx)
                    .await
                    .map(|instances| check(instance_type, &instances))
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

pub struct SapSystemStart {
    base: BaseOperator<Started>,
    system: System,
}

impl SapSystemStart {
    pub fn new(operation_id: &str, arguments: Arguments, deps: &Deps) -> Self {
        Self {
            base: BaseOperator::new(operation_id, arguments),
            system: System::new(deps),
        }
    }
}

#[async_trait]
impl Phaser for SapSystemStart {
    async fn plan(&mut self, ctx: &Context) -> Result<bool> {
        self.system.connect(self.base.arguments())?;
        let started = self.system.check(ctx, all_started).await?;
        self.base.state.set_before(Started { started });
        if started {
            log::info!("SAP system already started");
            self.base.state.mark_applied();
        }
        Ok(started)
    }

    async fn commit(&mut self, ctx: &Context) -> Result<()> {
        self.system.start(ctx).await
    }

    async fn verify(&mut self, ctx: &Context) -> Result<()> {
        self.system
            .wait_for(ctx, all_started)
            .await
            .map_err(|e| e.context("verify system started failed"))?;
        self.base.state.set_after(Started { started: true });
        Ok(())
    }

    async fn rollback(&mut self, ctx: &Context) -> Result<()> {
        let context = "rollback to stopped failed";
        self.system.stop(ctx).await.map_err(|e| e.context(context))?;
        self.system
            .wait_for(ctx, all_stopped)
            .await
            .map_err(|e| e.context(context))
    }

    fn operation_diff(&self, _ctx: &Context) -> Result<Diff> {
        self.base.state.diff()
    }

    async fn after(&mut self, _ctx: &Context) {
        self.system.release();
    }
}

// ============================================================================
// Stop
// ============================================================================

pub struct SapSystemStop {
    base: BaseOperator<Stopped>,
    system: System,
}

impl SapSystemStop {
    pub fn new(operation_id: &str, arguments: Arguments, deps: &Deps) -> Self {
        Self {
            base: BaseOperator::new(operation_id, arguments),
            system: System::new(deps),
        }
    }
}

#[async_trait]
impl Phaser for SapSystemStop {
    async fn plan(&mut self, ctx: &Context) -> Result<bool> {
        self.system.connect(self.base.arguments())?;
        let stopped = self.system.check(ctx, all_stopped).await?;
        self.base.state.set_before(Stopped { stopped });
        if stopped {
            log::info!("SAP system already stopped");
            self.base.state.mark_applied();
        }
        Ok(stopped)
    }

    async fn commit(&mut self, ctx: &Context) -> Result<()> {
        self.system.stop(ctx).await
    }

    async fn verify(&mut self, ctx: &Context) -> Result<()> {
        self.system
            .wait_for(ctx, all_stopped)
            .await
            .map_err(|e| e.context("verify system stopped failed"))?;
        self.base.state.set_after(Stopped { stopped: true });
        Ok(())
    }

    async fn rollback(&mut self, ctx: &Context) -> Result<()> {
        let context = "rollback to started failed";
        self.system.start(ctx).await.map_err(|e| e.context(context))?;
        self.system
            .wait_for(ctx, all_started)
            .await
            .map_err(|e| e.context(context))
    }

    fn operation_diff(&self, _ctx: &Context) -> Result<Diff> {
        self.base.state.diff()
    }

    async fn after(&mut self, _ctx: &Context) {
        self.system.release();
    }
}
