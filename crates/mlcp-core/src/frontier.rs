//! Ready-set computation over a sealed plan.
//!
//! The frontier is recomputed from scratch on every call; nothing is
//! cached between task events.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use mlcp_db::models::{Gate, PlanEdgeRow, PlanNodeRow, Role, TaskStatus};

/// A node that is ready to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontierNode {
    pub node_id: String,
    pub role: Role,
    pub retries: i64,
    pub timeout_ms: i64,
    pub gates: Vec<Gate>,
}

impl From<&PlanNodeRow> for FrontierNode {
    fn from(row: &PlanNodeRow) -> Self {
        Self {
            node_id: row.node_id.clone(),
            role: row.role,
            retries: row.retries,
            timeout_ms: row.timeout_ms,
            gates: row.gates.0.clone(),
        }
    }
}

/// Compute the nodes that are ready to run.
///
/// A node is ready when it has not finished (neither complete nor failed)
/// and every predecessor is complete. A failed or untouched predecessor
/// blocks its dependents; failure is never propagated further. The result
/// is sorted by node ID.
pub fn compute_frontier(
    nodes: &[PlanNodeRow],
    edges: &[PlanEdgeRow],
    statuses: &HashMap<String, TaskStatus>,
) -> Vec<FrontierNode> {
    let mut predecessors: HashMap<&str, Vec<&str>> = HashMap::with_capacity(nodes.len());
    for edge in edges {
        predecessors
            .entry(edge.dst.as_str())
            .or_default()
            .push(edge.src.as_str());
    }

    let is_complete = |id: &str| statuses.get(id) == Some(&TaskStatus::Complete);

    let mut ready: Vec<FrontierNode> = nodes
        .iter()
        .filter(|node| {
            !statuses
                .get(&node.node_id)
                .is_some_and(|status| status.is_finished())
        })
        .filter(|node| {
            predecessors
                .get(node.node_id.as_str())
                .is_none_or(|preds| preds.iter().all(|p| is_complete(p)))
        })
        .map(FrontierNode::from)
        .collect();

    ready.sort_by(|a, b| a.node_id.cmp(&b.node_id));
    ready
}
