//! Structural validation of coerced plans.
//!
//! Validation never fails: every problem found is collected into the
//! returned [`ValidationReport`], and the caller decides how to surface
//! them.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use mlcp_db::models::{Gate, Role};

use super::coerce::{self, PlanInput};
use super::issue::{IssueCode, PlanIssue};
use super::value::{PlanMap, PlanValue, compact_whitespace, field_text};
use crate::limits::PlanLimits;

/// The only schema version this service accepts.
pub const SCHEMA_VERSION: &str = "1";

/// Maximum number of distinct cycles reported per plan.
pub const MAX_REPORTED_CYCLES: usize = 3;

/// Counts of an accepted plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStats {
    pub nodes: usize,
    pub edges: usize,
}

/// Outcome of validating a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub ok: bool,
    pub errors: Vec<PlanIssue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<PlanStats>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<PlanIssue>, stats: PlanStats) -> Self {
        if errors.is_empty() {
            Self {
                ok: true,
                errors,
                stats: Some(stats),
            }
        } else {
            Self {
                ok: false,
                errors,
                stats: None,
            }
        }
    }

    fn rejected(issue: PlanIssue) -> Self {
        Self {
            ok: false,
            errors: vec![issue],
            stats: None,
        }
    }
}

/// Coerce `input` and validate the result.
///
/// Coercion failures (oversized text, parse errors, non-map roots) are
/// reported as the single error of a failed report.
pub fn validate_input(input: &PlanInput, limits: &PlanLimits) -> ValidationReport {
    match coerce::coerce(input, limits.max_bytes) {
        Ok(tree) => validate(&tree, limits),
        Err(e) => {
            debug!(error = %e, "plan input rejected before validation");
            ValidationReport::rejected(e.to_issue())
        }
    }
}

/// Validate a coerced plan tree against `limits`.
pub fn validate(tree: &PlanMap, limits: &PlanLimits) -> ValidationReport {
    let mut errors = Vec::new();

    let version = field_text(tree, "schema_version", SCHEMA_VERSION);
    if version != SCHEMA_VERSION {
        errors.push(PlanIssue::new(IssueCode::UnsupportedSchemaVersion, version));
    }

    let nodes = list_field(tree, "nodes", &mut errors);
    let edges = list_field(tree, "edges", &mut errors);

    // Accepted ids, in input order.
    let mut seen: HashSet<String> = HashSet::new();
    let mut node_ids: Vec<String> = Vec::new();

    for (idx, raw) in nodes.iter().enumerate() {
        let Some(node) = raw.as_map() else {
            errors.push(PlanIssue::new(
                IssueCode::InvalidFormat,
                format!("nodes[{idx}] must be an object"),
            ));
            continue;
        };

        let id = compact_whitespace(&field_text(node, "id", ""));
        let name = compact_whitespace(&field_text(node, "name", ""));
        let role = field_text(node, "role", &Role::default().to_string());
        let role = role.trim();

        if id.is_empty() || name.is_empty() {
            let detail = if id.is_empty() {
                format!("nodes[{idx}]")
            } else {
                id
            };
            errors.push(PlanIssue::new(IssueCode::EmptyIdOrName, detail));
            continue;
        }
        if seen.contains(&id) {
            errors.push(PlanIssue::new(IssueCode::DuplicateNodeId, id));
            continue;
        }
        if role.parse::<Role>().is_err() {
            errors.push(PlanIssue::new(IssueCode::InvalidRole, role));
        }

        match node.get("gates") {
            None => {}
            Some(PlanValue::Array(gates)) => {
                for gate in gates {
                    let gate = gate.render();
                    if gate.parse::<Gate>().is_err() {
                        errors.push(PlanIssue::new(IssueCode::InvalidGate, gate));
                    }
                }
            }
            Some(_) => errors.push(PlanIssue::new(
                IssueCode::InvalidFormat,
                format!("nodes[{idx}].gates must be list"),
            )),
        }

        seen.insert(id.clone());
        node_ids.push(id);
    }

    if node_ids.len() > limits.max_nodes {
        errors.push(PlanIssue::new(
            IssueCode::TooManyNodes,
            node_ids.len().to_string(),
        ));
    }

    let mut edge_list: Vec<(String, String)> = Vec::new();
    for raw in edges {
        let Some((src, dst)) = edge_endpoints(raw) else {
            errors.push(PlanIssue::new(IssueCode::InvalidEdgeFormat, raw.render()));
            continue;
        };

        if src == dst {
            errors.push(PlanIssue::new(IssueCode::SelfEdge, src.clone()));
        }
        if !seen.contains(&src) || !seen.contains(&dst) {
            errors.push(PlanIssue::new(
                IssueCode::EdgeRefersToUnknownNode,
                format!("{src}->{dst}"),
            ));
        }
        edge_list.push((src, dst));
    }

    if edge_list.len() > limits.max_edges {
        errors.push(PlanIssue::new(
            IssueCode::TooManyEdges,
            edge_list.len().to_string(),
        ));
    }

    for cycle in find_cycles(&node_ids, &edge_list, MAX_REPORTED_CYCLES) {
        errors.push(PlanIssue::new(IssueCode::CycleDetected, cycle.join(" -> ")));
    }

    let stats = PlanStats {
        nodes: node_ids.len(),
        edges: edge_list.len(),
    };
    let report = ValidationReport::from_errors(errors, stats);
    debug!(
        ok = report.ok,
        errors = report.errors.len(),
        nodes = stats.nodes,
        edges = stats.edges,
        "plan validated"
    );
    report
}

/// Read an optional list field. A present non-list value is an error and
/// is treated as empty.
fn list_field<'a>(tree: &'a PlanMap, key: &str, errors: &mut Vec<PlanIssue>) -> &'a [PlanValue] {
    match tree.get(key) {
        None => &[],
        Some(PlanValue::Array(items)) => items.as_slice(),
        Some(_) => {
            errors.push(PlanIssue::new(
                IssueCode::InvalidFormat,
                format!("{key} must be a list"),
            ));
            &[]
        }
    }
}

/// Extract `(src, dst)` from a two-element array, compacting whitespace in
/// both endpoints. Anything else is malformed.
pub(crate) fn edge_endpoints(raw: &PlanValue) -> Option<(String, String)> {
    match raw.as_array()? {
        [src, dst] => Some((
            compact_whitespace(&src.render()),
            compact_whitespace(&dst.render()),
        )),
        _ => None,
    }
}

/// Find up to `limit` distinct simple cycles in a directed graph.
///
/// Walks depth-first from each node of `nodes` in order, keeping a
/// visiting set (nodes on the current path), a visited set (fully
/// explored nodes), and the tree parent of every discovered node. An edge
/// into a visiting node closes a cycle, whose path is rebuilt by following
/// parents back from the edge source. The returned path starts and ends
/// with the same node.
///
/// Endpoints that are not in `nodes` are still traversed when reached
/// through an edge. The traversal keeps its own frame stack, so graph
/// depth is not bounded by the call stack.
pub fn find_cycles(
    nodes: &[String],
    edges: &[(String, String)],
    limit: usize,
) -> Vec<Vec<String>> {
    let mut graph: HashMap<&str, Vec<&str>> =
        nodes.iter().map(|n| (n.as_str(), Vec::new())).collect();
    for (src, dst) in edges {
        graph.entry(src.as_str()).or_default().push(dst.as_str());
    }

    let mut visiting: HashSet<&str> = HashSet::new();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut parent: HashMap<&str, &str> = HashMap::new();
    let mut cycles: Vec<Vec<String>> = Vec::new();

    if limit == 0 {
        return cycles;
    }

    for start in nodes {
        let start = start.as_str();
        if visited.contains(start) {
            continue;
        }

        // Each frame is a node plus the index of its next unexplored edge.
        let mut stack: Vec<(&str, usize)> = vec![(start, 0)];
        visiting.insert(start);

        while let Some(frame) = stack.last_mut() {
            let (u, next) = *frame;
            let neighbours = graph.get(u).map(Vec::as_slice).unwrap_or(&[]);

            let Some(&v) = neighbours.get(next) else {
                stack.pop();
                visiting.remove(u);
                visited.insert(u);
                continue;
            };
            frame.1 += 1;

            if visiting.contains(v) {
                let path = cycle_path(u, v, &parent);
                if !cycles.contains(&path) {
                    cycles.push(path);
                    if cycles.len() >= limit {
                        return cycles;
                    }
                }
            } else if !visited.contains(v) {
                parent.insert(v, u);
                visiting.insert(v);
                stack.push((v, 0));
            }
        }
    }

    cycles
}

/// Rebuild `v -> ... -> u -> v` from the back-edge `u -> v`.
fn cycle_path(u: &str, v: &str, parent: &HashMap<&str, &str>) -> Vec<String> {
    let mut path = vec![v.to_owned()];
    let mut cur = Some(u);
    while let Some(node) = cur {
        if node == v {
            break;
        }
        path.push(node.to_owned());
        cur = parent.get(node).copied();
    }
    path.push(v.to_owned());
    path.reverse();
    path
}
