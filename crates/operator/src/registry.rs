//! Operator registry: `name -> version -> builder`.

use crate::arguments::Arguments;
use crate::executor::Executor;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Builds a ready-to-run [`Executor`] from an operation id and arguments.
pub type OperatorBuilder = Arc<dyn Fn(&str, Arguments) -> Executor + Send + Sync>;

/// Registry lookup errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("operator {0} not found")]
    NotFound(String),
}

/// Two-level operator table.
#[derive(Default, Clone)]
pub struct Registry {
    operators: HashMap<String, HashMap<String, OperatorBuilder>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `builder` as `name@version`, replacing any previous entry.
    pub fn register(&mut self, name: &str, version: &str, builder: OperatorBuilder) {
        self.operators
            .entry(name.to_string())
            .or_default()
            .insert(version.to_string(), builder);
    }

    /// Resolve `name` or `name@version`.
    ///
    /// Without a version the highest registered version wins.
    pub fn get_operator_builder(&self, operator: &str) -> Result<OperatorBuilder, RegistryError> {
        let (name, version) = match operator.split_once('@') {
            Some((name, version)) => (name, Some(version)),
            None => (operator, None),
        };

        let versions = self
            .operators
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(operator.to_string()))?;

        let builder = match version {
            Some(version) => versions.get(version),
            None => versions
                .keys()
                .max_by(|a, b| compare_versions(a, b))
                .and_then(|latest| versions.get(latest)),
        };

        builder
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(operator.to_string()))
    }

    /// One `"<name> - v1/v2"` line per operator, sorted by name.
    pub fn available_operators(&self) -> Vec<String> {
        let mut names: Vec<&String> = self.operators.keys().collect();
        names.sort();

        names
            .into_iter()
            .map(|name| {
                let mut versions: Vec<&String> = self.operators[name].keys().collect();
                versions.sort_by(|a, b| compare_versions(a, b));
                let versions: Vec<&str> = versions.into_iter().map(String::as_str).collect();
                format!("{} - {}", name, versions.join("/"))
            })
            .collect()
    }
}

/// Order `v2` before `v10`; fall back to plain string order otherwise.
fn compare_versions(a: &str, b: &str) -> Ordering {
    let number = |v: &str| v.strip_prefix('v').unwrap_or(v).parse::<u64>().ok();
    match (number(a), number(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        _ => a.cmp(b),
    }
}
