//! Fakes and fixtures shared by the operator tests.

use super::Deps;
use async_trait::async_trait;
use crmkit::CrmClient;
use hostexec::Context;
use hostexec::fake::ScriptedExecutor;
use operator::{Arguments, BackoffOptions, ExecutionReport, Executor, Phaser};
use sapcontrol::{
    HaCheck, HaFailoverConfig, InstanceProperty, OsProcess, SapControlWebService, SapInstance,
    StateColor, SystemRequest, VersionInfo, WebServiceConnector,
};
use saptune::SaptuneClient;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use systemdkit::{JobInfo, Systemd, SystemdLoader, UnitInfo, UnitStatus};

/// Scripted host: `crm`/`shutdown`/`pgrep` through a [`ScriptedExecutor`],
/// everything else through in-memory fakes.
pub struct Fixture {
    pub exec: Arc<ScriptedExecutor>,
    pub sap: Arc<FakeSapControl>,
    pub saptune: Arc<FakeSaptune>,
    pub systemd: Arc<FakeSystemd>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            exec: Arc::new(ScriptedExecutor::new()),
            sap: Arc::new(FakeSapControl::default()),
            saptune: Arc::new(FakeSaptune::default()),
            systemd: Arc::new(FakeSystemd::default()),
        }
    }

    pub fn deps(&self) -> Deps {
        Deps {
            executor: self.exec.clone(),
            cluster: Arc::new(CrmClient::new(self.exec.clone())),
            sapcontrol: Arc::new(FakeConnector(self.sap.clone())),
            saptune: self.saptune.clone(),
            systemd: Arc::new(FakeLoader(self.systemd.clone())),
            backoff: BackoffOptions {
                max_retries: 3,
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
                factor: 2.0,
            },
            poll_interval: Duration::ZERO,
            default_timeout: Duration::ZERO,
            service_unit: "pacemaker.service".to_string(),
        }
    }

    /// Script `crmadmin` so that `is_idle` answers `state`.
    pub fn controller_state(&self, state: &str) -> &Self {
        self.exec
            .on("crmadmin -qD", hostexec::fake::Response::ok("node01"))
            .on(
                "crmadmin -qS node01",
                hostexec::fake::Response::ok(state),
            );
        self
    }
}

pub fn args(value: serde_json::Value) -> Arguments {
    value.as_object().cloned().unwrap()
}

/// Drive `phaser` through a fresh executor.
pub async fn run(phaser: impl Phaser + 'static) -> ExecutionReport {
    Executor::new("test-op", "test", Box::new(phaser))
        .run(&Context::new())
        .await
}

/// `(before, after)` of a successful report.
pub fn diff(report: &ExecutionReport) -> (String, String) {
    let success = report
        .as_success()
        .unwrap_or_else(|| panic!("expected success, got {report:?}"));
    (
        success.diff["before"].clone(),
        success.diff["after"].clone(),
    )
}

fn next<T: Clone>(queue: &Mutex<VecDeque<T>>) -> Option<T> {
    let mut queue = queue.lock().unwrap();
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

// ============================================================================
// sapcontrol
// ============================================================================

/// Scripted sapcontrol daemon; listings are returned in order and the last
/// one repeats.
#[derive(Default)]
pub struct FakeSapControl {
    processes: Mutex<VecDeque<Vec<OsProcess>>>,
    instances: Mutex<VecDeque<Vec<SapInstance>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeSapControl {
    pub fn push_processes(&self, colors: &[StateColor]) -> &Self {
        let list = colors
            .iter()
            .enumerate()
            .map(|(i, color)| OsProcess {
                name: format!("proc{i}"),
                description: String::new(),
                dispstatus: *color,
                textstatus: String::new(),
                starttime: String::new(),
                elapsedtime: String::new(),
                pid: i as i64 + 100,
            })
            .collect();
        self.processes.lock().unwrap().push_back(list);
        self
    }

    pub fn push_instances(&self, instances: &[(&str, StateColor)]) -> &Self {
        let list = instances
            .iter()
            .enumerate()
            .map(|(i, (features, color))| SapInstance {
                hostname: format!("sapha{i}"),
                instance_nr: i as i32,
                http_port: 50013,
                https_port: 50014,
                start_priority: "1".to_string(),
                features: (*features).to_string(),
                dispstatus: *color,
            })
            .collect();
        self.instances.lock().unwrap().push_back(list);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl SapControlWebService for FakeSapControl {
    async fn get_instance_properties(
        &self,
        _ctx: &Context,
    ) -> sapcontrol::Result<Vec<InstanceProperty>> {
        Ok(Vec::new())
    }

    async fn get_process_list(&self, ctx: &Context) -> sapcontrol::Result<Vec<OsProcess>> {
        if let Some(err) = ctx.err() {
            return Err(err.into());
        }
        self.record("GetProcessList");
        Ok(next(&self.processes).unwrap_or_default())
    }

    async fn get_system_instance_list(
        &self,
        _ctx: &Context,
    ) -> sapcontrol::Result<Vec<SapInstance>> {
        self.record("GetSystemInstanceList");
        Ok(next(&self.instances).unwrap_or_default())
    }

    async fn start(&self, _ctx: &Context) -> sapcontrol::Result<()> {
        self.record("Start");
        Ok(())
    }

    async fn stop(&self, _ctx: &Context) -> sapcontrol::Result<()> {
        self.record("Stop");
        Ok(())
    }

    async fn start_system(
        &self,
        _ctx: &Context,
        request: &SystemRequest,
    ) -> sapcontrol::Result<()> {
        self.record(format!(
            "StartSystem {} {:?}",
            request.options.as_str(),
            request.wait_timeout_secs
        ));
        Ok(())
    }

    async fn stop_system(&self, _ctx: &Context, request: &SystemRequest) -> sapcontrol::Result<()> {
        self.record(format!(
            "StopSystem {} {:?}",
            request.options.as_str(),
            request.wait_timeout_secs
        ));
        Ok(())
    }

    async fn ha_check_config(&self, _ctx: &Context) -> sapcontrol::Result<Vec<HaCheck>> {
        Ok(Vec::new())
    }

    async fn ha_get_failover_config(&self, _ctx: &Context) -> sapcontrol::Result<HaFailoverConfig> {
        Ok(HaFailoverConfig::default())
    }

    async fn get_version_info(&self, _ctx: &Context) -> sapcontrol::Result<Vec<VersionInfo>> {
        Ok(Vec::new())
    }
}

pub struct FakeConnector(pub Arc<FakeSapControl>);

impl WebServiceConnector for FakeConnector {
    fn connect(&self, _instance_number: &str) -> Arc<dyn SapControlWebService> {
        self.0.clone()
    }
}

// ============================================================================
// saptune
// ============================================================================

/// In-memory saptune; apply/revert/change update the applied solution unless
/// `frozen` is set.
#[derive(Default)]
pub struct FakeSaptune {
    pub unsupported: AtomicBool,
    pub frozen: AtomicBool,
    applied: Mutex<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeSaptune {
    pub fn set_applied(&self, solution: &str) {
        *self.applied.lock().unwrap() = solution.to_string();
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn change(&self, call: String, applied: &str) {
        self.calls.lock().unwrap().push(call);
        if !self.frozen.load(Ordering::SeqCst) {
            self.set_applied(applied);
        }
    }
}

#[async_trait]
impl SaptuneClient for FakeSaptune {
    async fn check_version_support(&self, _ctx: &Context) -> saptune::Result<()> {
        if self.unsupported.load(Ordering::SeqCst) {
            return Err(saptune::Error::UnsupportedVersion {
                installed: "3.0.2".to_string(),
                required: "3.1.0".to_string(),
            });
        }
        Ok(())
    }

    async fn get_applied_solution(&self, _ctx: &Context) -> saptune::Result<String> {
        Ok(self.applied.lock().unwrap().clone())
    }

    async fn apply_solution(&self, _ctx: &Context, solution: &str) -> saptune::Result<()> {
        self.change(format!("apply {solution}"), solution);
        Ok(())
    }

    async fn revert_solution(&self, _ctx: &Context, solution: &str) -> saptune::Result<()> {
        self.change(format!("revert {solution}"), "");
        Ok(())
    }

    async fn change_solution(&self, _ctx: &Context, solution: &str) -> saptune::Result<()> {
        self.change(format!("change {solution}"), solution);
        Ok(())
    }
}

// ============================================================================
// systemd
// ============================================================================

/// In-memory systemd manager for a single unit.
#[derive(Default)]
pub struct FakeSystemd {
    pub enabled: AtomicBool,
    /// Enable/disable calls succeed without changing the unit file state
    pub frozen: AtomicBool,
    pub jobs: Mutex<Vec<JobInfo>>,
    pub units: Mutex<Vec<UnitStatus>>,
    pub closed: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl FakeSystemd {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn set_enabled(&self, enabled: bool) {
        if !self.frozen.load(Ordering::SeqCst) {
            self.enabled.store(enabled, Ordering::SeqCst);
        }
    }
}

pub struct FakeLoader(pub Arc<FakeSystemd>);

#[async_trait]
impl SystemdLoader for FakeLoader {
    async fn new_systemd(&self, _ctx: &Context) -> systemdkit::Result<Box<dyn Systemd>> {
        Ok(Box::new(SharedSystemd(self.0.clone())))
    }
}

struct SharedSystemd(Arc<FakeSystemd>);

#[async_trait]
impl Systemd for SharedSystemd {
    async fn is_enabled(&self, _ctx: &Context, unit: &str) -> systemdkit::Result<bool> {
        self.0.record(format!("is_enabled {unit}"));
        Ok(self.0.enabled.load(Ordering::SeqCst))
    }

    async fn enable(&self, _ctx: &Context, unit: &str) -> systemdkit::Result<()> {
        self.0.record(format!("enable {unit}"));
        self.0.set_enabled(true);
        self.0.record("reload");
        Ok(())
    }

    async fn disable(&self, _ctx: &Context, unit: &str) -> systemdkit::Result<()> {
        self.0.record(format!("disable {unit}"));
        self.0.set_enabled(false);
        self.0.record("reload");
        Ok(())
    }

    async fn reload(&self, _ctx: &Context) -> systemdkit::Result<()> {
        self.0.record("reload");
        Ok(())
    }

    async fn get_units_info(
        &self,
        _ctx: &Context,
        units: &[&str],
    ) -> systemdkit::Result<Vec<UnitInfo>> {
        let state = if self.0.enabled.load(Ordering::SeqCst) {
            "enabled"
        } else {
            "disabled"
        };
        Ok(units
            .iter()
            .map(|name| UnitInfo {
                name: (*name).to_string(),
                unit_file_state: state.to_string(),
            })
            .collect())
    }

    async fn list_jobs(&self, _ctx: &Context) -> systemdkit::Result<Vec<JobInfo>> {
        self.0.record("list_jobs");
        Ok(self.0.jobs.lock().unwrap().clone())
    }

    async fn list_units(&self, _ctx: &Context) -> systemdkit::Result<Vec<UnitStatus>> {
        self.0.record("list_units");
        Ok(self.0.units.lock().unwrap().clone())
    }

    async fn close(&self) {
        self.0.closed.fetch_add(1, Ordering::SeqCst);
    }
}
