//! Validation error items.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Condition code of a single validation problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    InvalidFormat,
    PlanTooLarge,
    UnsupportedSchemaVersion,
    EmptyIdOrName,
    DuplicateNodeId,
    InvalidRole,
    InvalidGate,
    TooManyNodes,
    InvalidEdgeFormat,
    SelfEdge,
    EdgeRefersToUnknownNode,
    TooManyEdges,
    CycleDetected,
}

impl IssueCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidFormat => "invalid_format",
            Self::PlanTooLarge => "plan_too_large",
            Self::UnsupportedSchemaVersion => "unsupported_schema_version",
            Self::EmptyIdOrName => "empty_id_or_name",
            Self::DuplicateNodeId => "duplicate_node_id",
            Self::InvalidRole => "invalid_role",
            Self::InvalidGate => "invalid_gate",
            Self::TooManyNodes => "too_many_nodes",
            Self::InvalidEdgeFormat => "invalid_edge_format",
            Self::SelfEdge => "self_edge",
            Self::EdgeRefersToUnknownNode => "edge_refers_to_unknown_node",
            Self::TooManyEdges => "too_many_edges",
            Self::CycleDetected => "cycle_detected",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One problem found in a submitted plan: a condition code plus a detail
/// payload (the offending id, edge, count, or cycle path).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanIssue {
    pub code: IssueCode,
    pub detail: String,
}

impl PlanIssue {
    pub fn new(code: IssueCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for PlanIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_name_matches_as_str() {
        for code in [
            IssueCode::InvalidFormat,
            IssueCode::EdgeRefersToUnknownNode,
            IssueCode::CycleDetected,
        ] {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn issue_serializes_as_code_and_detail() {
        let issue = PlanIssue::new(IssueCode::SelfEdge, "a");
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json, serde_json::json!({"code": "self_edge", "detail": "a"}));
        assert_eq!(issue.to_string(), "self_edge: a");
    }
}
