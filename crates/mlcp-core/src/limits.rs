//! Size ceilings applied to submitted plans.

use std::env;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Ceilings on plan size. Every field can be overridden from the
/// environment or the CLI config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanLimits {
    /// Maximum size of a plan submitted as text, in bytes (UTF-8).
    pub max_bytes: usize,
    /// Maximum number of accepted nodes.
    pub max_nodes: usize,
    /// Maximum number of edges.
    pub max_edges: usize,
}

impl PlanLimits {
    pub const DEFAULT_MAX_BYTES: usize = 1_000_000;
    pub const DEFAULT_MAX_NODES: usize = 500;
    pub const DEFAULT_MAX_EDGES: usize = 1_500;

    /// Build limits from `MLCP_PLAN_MAX_BYTES`, `MLCP_PLAN_MAX_NODES`, and
    /// `MLCP_PLAN_MAX_EDGES`, keeping the default for any variable that is
    /// unset or not a non-negative integer.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply environment overrides on top of `self`.
    pub fn with_env_overrides(self) -> Self {
        Self {
            max_bytes: env_usize("MLCP_PLAN_MAX_BYTES").unwrap_or(self.max_bytes),
            max_nodes: env_usize("MLCP_PLAN_MAX_NODES").unwrap_or(self.max_nodes),
            max_edges: env_usize("MLCP_PLAN_MAX_EDGES").unwrap_or(self.max_edges),
        }
    }
}

impl Default for PlanLimits {
    fn default() -> Self {
        Self {
            max_bytes: Self::DEFAULT_MAX_BYTES,
            max_nodes: Self::DEFAULT_MAX_NODES,
            max_edges: Self::DEFAULT_MAX_EDGES,
        }
    }
}

fn env_usize(name: &str) -> Option<usize> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse::<usize>() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(var = name, value = %raw, error = %e, "ignoring invalid limit override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let limits = PlanLimits::default();
        assert_eq!(limits.max_bytes, 1_000_000);
        assert_eq!(limits.max_nodes, 500);
        assert_eq!(limits.max_edges, 1_500);
    }

    #[test]
    fn partial_document_keeps_defaults() {
        let limits: PlanLimits =
            serde_json::from_str(r#"{"max_nodes": 10}"#).expect("should deserialize");
        assert_eq!(limits.max_nodes, 10);
        assert_eq!(limits.max_edges, PlanLimits::DEFAULT_MAX_EDGES);
        assert_eq!(limits.max_bytes, PlanLimits::DEFAULT_MAX_BYTES);
    }
}
