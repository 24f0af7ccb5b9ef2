//! Execution report returned for every operation run.

use crate::phaser::{Diff, PhaseName};
use serde::{Deserialize, Serialize};

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSuccess {
    pub operation_id: String,
    /// `PLAN` when the change was already applied, `VERIFY` otherwise
    pub last_phase: PhaseName,
    pub diff: Diff,
}

/// Outcome of a failed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionError {
    pub operation_id: String,
    pub error_phase: PhaseName,
    pub message: String,
}

/// Result of driving one operator; exactly one variant is populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionReport {
    Success(ExecutionSuccess),
    Error(ExecutionError),
}

impl ExecutionReport {
    pub fn success(operation_id: &str, last_phase: PhaseName, diff: Diff) -> Self {
        Self::Success(ExecutionSuccess {
            operation_id: operation_id.to_string(),
            last_phase,
            diff,
        })
    }

    pub fn error(operation_id: &str, error_phase: PhaseName, message: impl Into<String>) -> Self {
        Self::Error(ExecutionError {
            operation_id: operation_id.to_string(),
            error_phase,
            message: message.into(),
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn operation_id(&self) -> &str {
        match self {
            Self::Success(s) => &s.operation_id,
            Self::Error(e) => &e.operation_id,
        }
    }

    /// The success payload, if any.
    pub fn as_success(&self) -> Option<&ExecutionSuccess> {
        match self {
            Self::Success(s) => Some(s),
            Self::Error(_) => None,
        }
    }

    /// The error payload, if any.
    pub fn as_error(&self) -> Option<&ExecutionError> {
        match self {
            Self::Success(_) => None,
            Self::Error(e) => Some(e),
        }
    }
}
