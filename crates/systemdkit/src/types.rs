//! Plain records returned by the manager listings.

use serde::Serialize;

/// Unit-file state of one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitInfo {
    pub name: String,
    pub unit_file_state: String,
}

/// One entry of `ListJobs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobInfo {
    pub id: u32,
    pub unit: String,
    pub job_type: String,
    pub state: String,
}

/// One entry of `ListUnits`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitStatus {
    pub name: String,
    pub description: String,
    pub load_state: String,
    pub active_state: String,
    pub sub_state: String,
}

impl UnitStatus {
    /// Loaded and active.
    pub fn is_running(&self) -> bool {
        self.load_state == "loaded" && self.active_state == "active"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(load: &str, active: &str) -> UnitStatus {
        UnitStatus {
            name: "reboot.timer".to_string(),
            description: String::new(),
            load_state: load.to_string(),
            active_state: active.to_string(),
            sub_state: "waiting".to_string(),
        }
    }

    #[test]
    fn test_is_running_requires_loaded_and_active() {
        assert!(unit("loaded", "active").is_running());
        assert!(!unit("loaded", "inactive").is_running());
        assert!(!unit("not-found", "active").is_running());
    }
}
