//! Errors returned by control-plane operations.

use thiserror::Error;

use crate::plan::issue::PlanIssue;

/// Failure of a control-plane operation.
///
/// Lookup failures are terminal and reported one at a time. Validation
/// failures carry every problem found in the submission.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("plan failed validation with {} error(s)", .0.len())]
    Invalid(Vec<PlanIssue>),

    #[error("run not found: {0}")]
    RunNotFound(String),

    #[error("plan not found: run {run_id}, {}", describe_version(.version))]
    PlanNotFound {
        run_id: String,
        version: Option<i64>,
    },

    #[error("node not found: {node_id} in run {run_id} version {version}")]
    NodeNotFound {
        run_id: String,
        version: i64,
        node_id: String,
    },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl PlanError {
    /// Stable condition code for callers that map errors onto responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Invalid(_) => "invalid_plan",
            Self::RunNotFound(_) => "run_not_found",
            Self::PlanNotFound { .. } => "plan_not_found",
            Self::NodeNotFound { .. } => "node_not_found",
            Self::Storage(_) => "storage_error",
        }
    }

    /// The validation items, if this is a validation failure.
    pub fn issues(&self) -> &[PlanIssue] {
        match self {
            Self::Invalid(issues) => issues,
            _ => &[],
        }
    }
}

fn describe_version(version: &Option<i64>) -> String {
    match version {
        Some(v) => format!("version {v}"),
        None => "no sealed versions".to_owned(),
    }
}
