//! Shared operator state: identity, arguments and typed before/after.

use crate::arguments::Arguments;
use crate::error::{OperatorError, Result};
use crate::phaser::Diff;
use serde::Serialize;

/// Typed before/after snapshots of an operator's domain state.
#[derive(Debug, Clone, PartialEq)]
pub struct State<T> {
    before: Option<T>,
    after: Option<T>,
}

impl<T> Default for State<T> {
    fn default() -> Self {
        Self {
            before: None,
            after: None,
        }
    }
}

impl<T: Clone + Serialize> State<T> {
    pub fn set_before(&mut self, value: T) {
        self.before = Some(value);
    }

    pub fn set_after(&mut self, value: T) {
        self.after = Some(value);
    }

    pub fn before(&self) -> Option<&T> {
        self.before.as_ref()
    }

    pub fn after(&self) -> Option<&T> {
        self.after.as_ref()
    }

    /// Record `after = before` for the already-applied short circuit.
    pub fn mark_applied(&mut self) {
        self.after = self.before.clone();
    }

    /// Render both snapshots as JSON strings.
    pub fn diff(&self) -> Result<Diff> {
        let before = self
            .before
            .as_ref()
            .ok_or_else(|| OperatorError::Serialization("before state not recorded".into()))?;
        let after = self
            .after
            .as_ref()
            .ok_or_else(|| OperatorError::Serialization("after state not recorded".into()))?;

        let mut diff = Diff::new();
        diff.insert("before".to_string(), serde_json::to_string(before)?);
        diff.insert("after".to_string(), serde_json::to_string(after)?);
        Ok(diff)
    }
}

/// Fields every operator carries.
#[derive(Debug, Clone)]
pub struct BaseOperator<T> {
    operation_id: String,
    arguments: Arguments,
    pub state: State<T>,
}

impl<T> BaseOperator<T> {
    pub fn new(operation_id: &str, arguments: Arguments) -> Self {
        Self {
            operation_id: operation_id.to_string(),
            arguments,
            state: State::default(),
        }
    }

    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }
}
