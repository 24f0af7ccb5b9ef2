//! `hostreboot`: schedule a reboot one minute out, unless one is already
//! pending.

use super::{Deps, planned};
use async_trait::async_trait;
use hostexec::{CommandExecutor, Context};
use operator::{Arguments, BaseOperator, Diff, OperatorError, Phaser, Result};
use serde::Serialize;
use std::sync::Arc;
use systemdkit::{Systemd, SystemdLoader};

const SHUTDOWN_TARGETS: [&str; 4] = [
    "reboot.target",
    "shutdown.target",
    "poweroff.target",
    "halt.target",
];
const SHUTDOWN_TIMERS: [&str; 2] = ["shutdown.timer", "reboot.timer"];
const REBOOT_MESSAGE: &str = "Host reboot scheduled by automation";

/// Process-table and filesystem traces of a pending shutdown.
const PROBES: [(&str, &[&str]); 3] = [
    ("pgrep", &["-f", "shutdown"]),
    ("pgrep", &["-f", "systemd-shutdown"]),
    ("test", &["-f", "/run/systemd/shutdown/scheduled"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RebootState {
    pub scheduled: bool,
}

pub struct HostReboot {
    base: BaseOperator<RebootState>,
    executor: Arc<dyn CommandExecutor>,
    loader: Arc<dyn SystemdLoader>,
    systemd: Option<Box<dyn Systemd>>,
}

impl HostReboot {
    pub fn new(operation_id: &str, arguments: Arguments, deps: &Deps) -> Self {
        Self {
            base: BaseOperator::new(operation_id, arguments),
            executor: Arc::clone(&deps.executor),
            loader: Arc::clone(&deps.systemd),
            systemd: None,
        }
    }

    /// Whether a reboot or shutdown is already on its way.
    async fn reboot_scheduled(&self, ctx: &Context) -> Result<bool> {
        let systemd = planned(self.systemd.as_ref())?;

        let jobs = systemd
            .list_jobs(ctx)
            .await
            .map_err(|e| OperatorError::state_read("error listing systemd jobs", e))?;
        if let Some(job) = jobs
            .iter()
            .find(|j| SHUTDOWN_TARGETS.contains(&j.unit.as_str()))
        {
            log::debug!("Found pending {} job for {}", job.job_type, job.unit);
            return Ok(true);
        }

        let units = systemd
            .list_units(ctx)
            .await
            .map_err(|e| OperatorError::state_read("error listing systemd units", e))?;
        if units
            .iter()
            .any(|u| u.is_running() && SHUTDOWN_TIMERS.contains(&u.name.as_str()))
        {
            log::debug!("Found active shutdown timer");
            return Ok(true);
        }

        for (name, args) in PROBES {
            match self.executor.exec_ctx(ctx, name, args).await {
                Ok(_) => {
                    log::debug!("Shutdown probe `{name} {}` matched", args.join(" "));
                    return Ok(true);
                }
                Err(e) if e.is_context_error() => return Err(e.into()),
                Err(_) => {}
            }
        }
        Ok(false)
    }
}

#[async_trait]
impl Phaser for HostReboot {
    async fn plan(&mut self, ctx: &Context) -> Result<bool> {
        let systemd = self
            .loader
            .new_systemd(ctx)
            .await
            .map_err(|e| OperatorError::precondition(e.to_string()))?;
        self.systemd = Some(systemd);

        let scheduled = self.reboot_scheduled(ctx).await?;
        self.base.state.set_before(RebootState { scheduled });
        if scheduled {
            log::info!("Host reboot already scheduled");
            self.base.state.mark_applied();
        }
        Ok(scheduled)
    }

    async fn commit(&mut self, ctx: &Context) -> Result<()> {
        self.executor
            .exec_ctx(ctx, "shutdown", &["-r", "+1", REBOOT_MESSAGE])
            .await
            .map(drop)
            .map_err(|e| OperatorError::execution("error scheduling host reboot", e))
    }

    async fn verify(&mut self, ctx: &Context) -> Result<()> {
        if !self.reboot_scheduled(ctx).await? {
            return Err(OperatorError::verification(
                "verify host reboot failed, no scheduled reboot detected",
            ));
        }
        self.base.state.set_after(RebootState { scheduled: true });
        Ok(())
    }

    async fn rollback(&mut self, ctx: &Context) -> Result<()> {
        self.executor
            .exec_ctx(ctx, "shutdown", &["-c"])
            .await
            .map(drop)
            .map_err(|e| OperatorError::execution("error cancelling host reboot", e))
    }

    fn operation_diff(&self, _ctx: &Context) -> Result<Diff> {
        self.base.state.diff()
    }

    async fn after(&mut self, _ctx: &Context) {
        if let Some(systemd) = self.systemd.take() {
            systemd.close().await;
        }
    }
}
