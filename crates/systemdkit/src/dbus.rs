//! [`Systemd`] over the system bus.

use crate::error::{Error, Result};
use crate::proxy::{ManagerProxy, UnitProxy};
use crate::types::{JobInfo, UnitInfo, UnitStatus};
use crate::{Systemd, SystemdLoader};
use async_trait::async_trait;
use hostexec::Context;
use zbus::Connection;

const ENABLED: &str = "enabled";

/// Opens a new system-bus connection per [`SystemdLoader::new_systemd`] call.
#[derive(Debug, Default, Clone, Copy)]
pub struct DbusLoader;

#[async_trait]
impl SystemdLoader for DbusLoader {
    async fn new_systemd(&self, ctx: &Context) -> Result<Box<dyn Systemd>> {
        let systemd = ctx.run(DbusSystemd::connect()).await??;
        Ok(Box::new(systemd))
    }
}

/// systemd manager client owning one bus connection.
pub struct DbusSystemd {
    connection: Connection,
    manager: ManagerProxy<'static>,
}

impl DbusSystemd {
    pub async fn connect() -> Result<Self> {
        let connection = Connection::system().await.map_err(Error::Connect)?;
        let manager = ManagerProxy::new(&connection)
            .await
            .map_err(Error::Connect)?;
        log::debug!("Connected to systemd on the system bus");
        Ok(Self {
            connection,
            manager,
        })
    }

    async fn unit_file_state(&self, unit: &str) -> Result<String> {
        let context = format!("could not get unit file state of {unit}");
        let path = self
            .manager
            .load_unit(unit)
            .await
            .map_err(Error::call(context.as_str()))?;
        let proxy = UnitProxy::builder(&self.connection)
            .path(path)
            .map_err(Error::call(context.as_str()))?
            .build()
            .await
            .map_err(Error::call(context.as_str()))?;
        proxy
            .unit_file_state()
            .await
            .map_err(Error::call(context))
    }

    async fn daemon_reload(&self) -> Result<()> {
        self.manager.reload().await.map_err(Error::Reload)
    }
}

#[async_trait]
impl Systemd for DbusSystemd {
    async fn is_enabled(&self, ctx: &Context, unit: &str) -> Result<bool> {
        let state = ctx.run(self.unit_file_state(unit)).await??;
        Ok(state == ENABLED)
    }

    async fn enable(&self, ctx: &Context, unit: &str) -> Result<()> {
        ctx.run(async {
            let (_, changes) = self
                .manager
                .enable_unit_files(&[unit], false, true)
                .await
                .map_err(Error::call(format!("could not enable {unit}")))?;
            log::debug!("Enabled {unit}: {changes:?}");
            self.daemon_reload().await
        })
        .await?
    }

    async fn disable(&self, ctx: &Context, unit: &str) -> Result<()> {
        ctx.run(async {
            let changes = self
                .manager
                .disable_unit_files(&[unit], false)
                .await
                .map_err(Error::call(format!("could not disable {unit}")))?;
            log::debug!("Disabled {unit}: {changes:?}");
            self.daemon_reload().await
        })
        .await?
    }

    async fn reload(&self, ctx: &Context) -> Result<()> {
        ctx.run(self.daemon_reload()).await?
    }

    async fn get_units_info(&self, ctx: &Context, units: &[&str]) -> Result<Vec<UnitInfo>> {
        let mut infos = Vec::with_capacity(units.len());
        for unit in units {
            let unit_file_state = ctx.run(self.unit_file_state(unit)).await??;
            infos.push(UnitInfo {
                name: (*unit).to_string(),
                unit_file_state,
            });
        }
        Ok(infos)
    }

    async fn list_jobs(&self, ctx: &Context) -> Result<Vec<JobInfo>> {
        let raw = ctx
            .run(self.manager.list_jobs())
            .await?
            .map_err(Error::call("could not list systemd jobs"))?;
        Ok(raw
            .into_iter()
            .map(|(id, unit, job_type, state, _, _)| JobInfo {
                id,
                unit,
                job_type,
                state,
            })
            .collect())
    }

    async fn list_units(&self, ctx: &Context) -> Result<Vec<UnitStatus>> {
        let raw = ctx
            .run(self.manager.list_units())
            .await?
            .map_err(Error::call("could not list systemd units"))?;
        Ok(raw
            .into_iter()
            .map(
                |(name, description, load_state, active_state, sub_state, ..)| UnitStatus {
                    name,
                    description,
                    load_state,
                    active_state,
                    sub_state,
                },
            )
            .collect())
    }

    async fn close(&self) {
        if let Err(e) = self.connection.clone().close().await {
            log::debug!("Error closing systemd connection: {e}");
        }
    }
}
