//! `pacemakerenable` / `pacemakerdisable`: enable or disable a systemd unit
//! file. The standard registry points both at the configured unit.

use super::{Deps, planned};
use async_trait::async_trait;
use hostexec::Context;
use operator::{Arguments, BaseOperator, Diff, OperatorError, Phaser, Result};
use serde::Serialize;
use std::sync::Arc;
use systemdkit::{Systemd, SystemdLoader};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnitState {
    pub enabled: bool,
}

/// Connection handling shared by both operators.
struct Unit {
    base: BaseOperator<UnitState>,
    loader: Arc<dyn SystemdLoader>,
    unit: String,
    systemd: Option<Box<dyn Systemd>>,
}

impl Unit {
    fn new(operation_id: &str, arguments: Arguments, deps: &Deps) -> Self {
        Self {
            base: BaseOperator::new(operation_id, arguments),
            loader: Arc::clone(&deps.systemd),
            unit: deps.service_unit.clone(),
            systemd: None,
        }
    }

    fn systemd(&self) -> Result<&dyn Systemd> {
        let systemd = planned(self.systemd.as_ref())?;
        Ok(systemd.as_ref())
    }

    async fn is_enabled(&self, ctx: &Context) -> Result<bool> {
        self.systemd()?
            .is_enabled(ctx, &self.unit)
            .await
            .map_err(|e| {
                OperatorError::state_read(&format!("error checking if {} is enabled", self.unit), e)
            })
    }

    /// Connect and record `before`; true when already `enabled`.
    async fn plan(&mut self, ctx: &Context, enabled: bool) -> Result<bool> {
        let systemd = self
            .loader
            .new_systemd(ctx)
            .await
            .map_err(|e| OperatorError::precondition(e.to_string()))?;
        self.systemd = Some(systemd);

        let current = self.is_enabled(ctx).await?;
        self.base.state.set_before(UnitState { enabled: current });
        if current == enabled {
            log::info!("Unit {} already in desired state", self.unit);
            self.base.state.mark_applied();
        }
        Ok(current == enabled)
    }

    async fn set(&self, ctx: &Context, enabled: bool) -> Result<()> {
        let systemd = self.systemd()?;
        let result = if enabled {
            systemd.enable(ctx, &self.unit).await
        } else {
            systemd.disable(ctx, &self.unit).await
        };
        let action = if enabled { "enabling" } else { "disabling" };
        result.map_err(|e| OperatorError::execution(&format!("error {action} {}", self.unit), e))
    }

    async fn verify(&mut self, ctx: &Context, enabled: bool) -> Result<()> {
        if self.is_enabled(ctx).await? != enabled {
            let state = if enabled { "enabled" } else { "disabled" };
            return Err(OperatorError::verification(format!(
                "verify {} failed, unit is not {state}",
                self.unit
            )));
        }
        self.base.state.set_after(UnitState { enabled });
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(systemd) = self.systemd.take() {
            systemd.close().await;
        }
    }
}

// ============================================================================
// Enable
// ============================================================================

pub struct ServiceEnable {
    unit: Unit,
}

impl ServiceEnable {
    pub fn new(operation_id: &str, arguments: Arguments, deps: &Deps) -> Self {
        Self {
            unit: Unit::new(operation_id, arguments, deps),
        }
    }
}

#[async_trait]
impl Phaser for ServiceEnable {
    async fn plan(&mut self, ctx: &Context) -> Result<bool> {
        self.unit.plan(ctx, true).await
    }

    async fn commit(&mut self, ctx: &Context) -> Result<()> {
        self.unit.set(ctx, true).await
    }

    async fn verify(&mut self, ctx: &Context) -> Result<()> {
        self.unit.verify(ctx, true).await
    }

    async fn rollback(&mut self, ctx: &Context) -> Result<()> {
        self.unit.set(ctx, false).await
    }

    fn operation_diff(&self, _ctx: &Context) -> Result<Diff> {
        self.unit.base.state.diff()
    }

    async fn after(&mut self, _ctx: &Context) {
        self.unit.close().await;
    }
}

// ============================================================================
// Disable
// ============================================================================

pub struct ServiceDisable {
    unit: Unit,
}

impl ServiceDisable {
    pub fn new(operation_id: &str, arguments: Arguments, deps: &Deps) -> Self {
        Self {
            unit: Unit::new(operation_id, arguments, deps),
        }
    }
}

#[async_trait]
impl Phaser for ServiceDisable {
    async fn plan(&mut self, ctx: &Context) -> Result<bool> {
        self.unit.plan(ctx, false).await
    }

    async fn commit(&mut self, ctx: &Context) -> Result<()> {
        self.unit.set(ctx, false).await
    }

    async fn verify(&mut self, ctx: &Context) -> Result<()> {
        self.unit.verify(ctx, false).await
    }

    async fn rollback(&mut self, ctx: &Context) -> Result<()> {
        self.unit.set(ctx, true).await
    }

    fn operation_diff(&self, _ctx: &Context) -> Result<Diff> {
        self.unit.base.state.diff()
    }

    async fn after(&mut self, _ctx: &Context) {
        self.unit.close().await;
    }
}
