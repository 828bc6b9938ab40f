//! Canonical form of a plan.
//!
//! Normalization is total: it never rejects input, it only repairs or drops
//! what it cannot use. Plans are validated before they are normalized for
//! storage, so in practice the repairs only matter for hashing raw input.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use mlcp_db::models::{Gate, Role};

use super::validate::{SCHEMA_VERSION, edge_endpoints};
use super::value::{PlanMap, PlanValue, compact_whitespace, field_text};

pub const DEFAULT_RETRIES: i64 = 1;
pub const MIN_RETRIES: i64 = 0;
pub const DEFAULT_TIMEOUT_MS: i64 = 120_000;
pub const MIN_TIMEOUT_MS: i64 = 1_000;

/// A node in canonical form.
///
/// Fields are declared in lexicographic order so the serialized object
/// has sorted keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalNode {
    pub gates: Vec<Gate>,
    pub id: String,
    pub name: String,
    pub retries: i64,
    pub role: Role,
    pub timeout_ms: i64,
}

/// A plan in canonical form: nodes sorted by id, edges sorted by
/// `(src, dst)`, every field present.
///
/// Fields are declared in lexicographic order so the serialized object
/// has sorted keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalPlan {
    pub edges: Vec<(String, String)>,
    pub nodes: Vec<CanonicalNode>,
    pub schema_version: String,
    pub stats_edges: usize,
    pub stats_nodes: usize,
}

impl CanonicalPlan {
    /// Convert back into a document tree that [`normalize`] accepts.
    pub fn to_tree(&self) -> PlanMap {
        let nodes = self.nodes.iter().map(CanonicalNode::to_value).collect();
        let edges = self
            .edges
            .iter()
            .map(|(src, dst)| {
                PlanValue::Array(vec![PlanValue::from(src.as_str()), PlanValue::from(dst.as_str())])
            })
            .collect();

        let mut map = PlanMap::new();
        map.insert("schema_version".to_owned(), PlanValue::from(self.schema_version.as_str()));
        map.insert("nodes".to_owned(), PlanValue::Array(nodes));
        map.insert("edges".to_owned(), PlanValue::Array(edges));
        map
    }

    /// Look up a node by id.
    pub fn node(&self, id: &str) -> Option<&CanonicalNode> {
        self.nodes
            .binary_search_by(|n| n.id.as_str().cmp(id))
            .ok()
            .map(|idx| &self.nodes[idx])
    }
}

impl CanonicalNode {
    fn to_value(&self) -> PlanValue {
        let gates = self
            .gates
            .iter()
            .map(|g| PlanValue::from(g.to_string()))
            .collect();

        let mut map = PlanMap::new();
        map.insert("id".to_owned(), PlanValue::from(self.id.as_str()));
        map.insert("name".to_owned(), PlanValue::from(self.name.as_str()));
        map.insert("role".to_owned(), PlanValue::from(self.role.to_string()));
        map.insert("retries".to_owned(), PlanValue::Integer(self.retries));
        map.insert("timeout_ms".to_owned(), PlanValue::Integer(self.timeout_ms));
        map.insert("gates".to_owned(), PlanValue::Array(gates));
        PlanValue::Map(map)
    }
}

/// Produce the canonical form of a plan tree.
pub fn normalize(tree: &PlanMap) -> CanonicalPlan {
    let mut nodes: Vec<CanonicalNode> = match tree.get("nodes") {
        Some(PlanValue::Array(items)) => items
            .iter()
            .filter_map(PlanValue::as_map)
            .map(normalize_node)
            .collect(),
        _ => Vec::new(),
    };

    let mut edges: Vec<(String, String)> = match tree.get("edges") {
        Some(PlanValue::Array(items)) => items.iter().filter_map(edge_endpoints).collect(),
        _ => Vec::new(),
    };

    nodes.sort_by(|a, b| a.id.cmp(&b.id));
    edges.sort();

    CanonicalPlan {
        stats_nodes: nodes.len(),
        stats_edges: edges.len(),
        schema_version: field_text(tree, "schema_version", SCHEMA_VERSION),
        nodes,
        edges,
    }
}

fn normalize_node(node: &PlanMap) -> CanonicalNode {
    let role = field_text(node, "role", &Role::default().to_string())
        .trim()
        .parse::<Role>()
        .unwrap_or_default();

    let gates: BTreeSet<Gate> = match node.get("gates") {
        Some(PlanValue::Array(items)) => items
            .iter()
            .filter_map(|g| g.render().trim().parse::<Gate>().ok())
            .collect(),
        _ => BTreeSet::new(),
    };

    CanonicalNode {
        id: compact_whitespace(&field_text(node, "id", "")),
        name: compact_whitespace(&field_text(node, "name", "")),
        role,
        retries: int_field(node, "retries", DEFAULT_RETRIES, MIN_RETRIES),
        timeout_ms: int_field(node, "timeout_ms", DEFAULT_TIMEOUT_MS, MIN_TIMEOUT_MS),
        gates: gates.into_iter().collect(),
    }
}

/// Read an integer field. Values that are not integral fall back to
/// `default`; the result is clamped to at least `min`.
fn int_field(node: &PlanMap, key: &str, default: i64, min: i64) -> i64 {
    let value = match node.get(key) {
        Some(PlanValue::Integer(i)) => *i,
        Some(PlanValue::Float(f)) if f.is_finite() && f.fract() == 0.0 => *f as i64,
        Some(PlanValue::String(s)) => s.trim().parse().unwrap_or(default),
        _ => default,
    };
    value.max(min)
}
