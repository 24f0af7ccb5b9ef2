use anyhow::{Context, Result};
use operator::BackoffOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// System-wide configuration file, read when no other path is given
pub const DEFAULT_CONFIG_PATH: &str = "/etc/sapagent/config.toml";

/// Agent configuration, every key optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub crm: CrmConfig,
    pub backoff: BackoffConfig,
    pub sap: SapConfig,
    pub systemd: SystemdConfig,
}

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CrmConfig {
    /// Shared budget of the two `crmadmin` probes
    pub idle_timeout_ms: u64,
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackoffConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay_ms: 500,
            max_delay_ms: 60_000,
            factor: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SapConfig {
    /// Cadence of `GetProcessList`/`GetSystemInstanceList` polls
    pub poll_interval_secs: u64,
    /// Used when an operation carries no `timeout` argument
    pub default_timeout_secs: u64,
    /// Per-call limit of the SOAP client
    pub client_timeout_secs: u64,
}

impl Default for SapConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            default_timeout_secs: 300,
            client_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SystemdConfig {
    /// Unit driven by the enable/disable operators
    pub unit: String,
}

impl Default for SystemdConfig {
    fn default() -> Self {
        Self {
            unit: "pacemaker.service".to_string(),
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl Config {
    /// Load the configuration.
    ///
    /// An explicit path must exist; the default path may be absent, in which
    /// case built-in defaults apply.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    Self::from_file(&path)
                } else {
                    log::debug!("No config at {}, using defaults", path.display());
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid config format in {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.crm.idle_timeout_ms)
    }

    pub fn backoff_options(&self) -> BackoffOptions {
        BackoffOptions {
            max_retries: self.backoff.max_retries,
            initial_delay: Duration::from_millis(self.backoff.initial_delay_ms),
            max_delay: Duration::from_millis(self.backoff.max_delay_ms),
            factor: self.backoff.factor,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.sap.poll_interval_secs)
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.sap.default_timeout_secs)
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.sap.client_timeout_secs)
    }
}
