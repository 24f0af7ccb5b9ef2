//! Typed sapcontrol requests and responses.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Display color sapcontrol reports for processes and instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateColor {
    #[serde(rename = "SAPControl-GRAY")]
    Gray,
    #[serde(rename = "SAPControl-GREEN")]
    Green,
    #[serde(rename = "SAPControl-YELLOW")]
    Yellow,
    #[serde(rename = "SAPControl-RED")]
    Red,
}

impl StateColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gray => "SAPControl-GRAY",
            Self::Green => "SAPControl-GREEN",
            Self::Yellow => "SAPControl-YELLOW",
            Self::Red => "SAPControl-RED",
        }
    }
}

impl fmt::Display for StateColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StateColor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "SAPControl-GRAY" => Ok(Self::Gray),
            "SAPControl-GREEN" => Ok(Self::Green),
            "SAPControl-YELLOW" => Ok(Self::Yellow),
            "SAPControl-RED" => Ok(Self::Red),
            other => Err(Error::InvalidValue {
                field: "dispstatus".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Which instances `StartSystem`/`StopSystem` act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StartStopOption {
    #[serde(rename = "SAPControl-ALL-INSTANCES")]
    AllInstances,
    #[serde(rename = "SAPControl-ABAP-INSTANCES")]
    AbapInstances,
    #[serde(rename = "SAPControl-J2EE-INSTANCES")]
    J2eeInstances,
    #[serde(rename = "SAPControl-SCS-INSTANCES")]
    ScsInstances,
    #[serde(rename = "SAPControl-ENQREP-INSTANCES")]
    EnqrepInstances,
}

impl StartStopOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllInstances => "SAPControl-ALL-INSTANCES",
            Self::AbapInstances => "SAPControl-ABAP-INSTANCES",
            Self::J2eeInstances => "SAPControl-J2EE-INSTANCES",
            Self::ScsInstances => "SAPControl-SCS-INSTANCES",
            Self::EnqrepInstances => "SAPControl-ENQREP-INSTANCES",
        }
    }
}

/// Parameters of `StartSystem`/`StopSystem`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemRequest {
    pub options: StartStopOption,
    /// Seconds the daemon waits for the system to settle before answering
    pub wait_timeout_secs: Option<u32>,
}

/// One entry of `GetInstanceProperties`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceProperty {
    pub property: String,
    pub propertytype: String,
    pub value: String,
}

/// One entry of `GetProcessList`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsProcess {
    pub name: String,
    pub description: String,
    pub dispstatus: StateColor,
    pub textstatus: String,
    pub starttime: String,
    pub elapsedtime: String,
    pub pid: i64,
}

/// One entry of `GetSystemInstanceList`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SapInstance {
    pub hostname: String,
    pub instance_nr: i32,
    pub http_port: i32,
    pub https_port: i32,
    pub start_priority: String,
    /// `|`-separated feature list, e.g. `ABAP|GATEWAY|ICMAN|IGS`
    pub features: String,
    pub dispstatus: StateColor,
}

/// One entry of `HACheckConfig`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HaCheck {
    pub state: String,
    pub category: String,
    pub description: String,
    pub comment: String,
}

/// Response of `HAGetFailoverConfig`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HaFailoverConfig {
    pub ha_active: bool,
    pub ha_product_version: String,
    pub ha_sap_interface_version: String,
    pub ha_documentation: String,
    pub ha_active_nodes: Vec<String>,
}

/// One entry of `GetVersionInfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub filename: String,
    pub version_info: String,
    pub time: String,
}
