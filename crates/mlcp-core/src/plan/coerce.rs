//! Input coercion: structured documents and raw text into a [`PlanMap`].
//!
//! Text is size-checked before it is parsed, then read as YAML. YAML is a
//! superset of JSON object notation, so the same path accepts both.

use thiserror::Error;

use super::issue::{IssueCode, PlanIssue};
use super::value::{PlanMap, PlanValue};

/// A plan as submitted by a caller.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanInput {
    /// An already-structured document (e.g. a JSON request body).
    Document(serde_json::Value),
    /// Raw YAML or JSON text.
    Text(String),
}

impl PlanInput {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

impl From<serde_json::Value> for PlanInput {
    fn from(value: serde_json::Value) -> Self {
        Self::Document(value)
    }
}

/// Errors that stop a plan before validation can start.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoerceError {
    #[error("plan text is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("yaml_parse_error:{0}")]
    Parse(String),

    #[error("root must be an object")]
    RootNotMap,
}

impl CoerceError {
    /// The validation item reported for this failure.
    pub fn to_issue(&self) -> PlanIssue {
        match self {
            Self::TooLarge { size, .. } => PlanIssue::new(IssueCode::PlanTooLarge, size.to_string()),
            Self::Parse(_) | Self::RootNotMap => {
                PlanIssue::new(IssueCode::InvalidFormat, self.to_string())
            }
        }
    }
}

/// Coerce either input shape into a string-keyed map.
pub fn coerce(input: &PlanInput, max_bytes: usize) -> Result<PlanMap, CoerceError> {
    match input {
        PlanInput::Document(value) => match from_json(value) {
            PlanValue::Map(map) => Ok(map),
            _ => Err(CoerceError::RootNotMap),
        },
        PlanInput::Text(text) => parse_text(text, max_bytes),
    }
}

/// Parse plan text under a byte ceiling.
///
/// The ceiling is checked against the UTF-8 length before any parsing
/// happens, so oversized input is rejected without being tokenized.
pub fn parse_text(text: &str, max_bytes: usize) -> Result<PlanMap, CoerceError> {
    if text.len() > max_bytes {
        return Err(CoerceError::TooLarge {
            size: text.len(),
            limit: max_bytes,
        });
    }

    let mut loaded: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| CoerceError::Parse(e.to_string()))?;
    loaded
        .apply_merge()
        .map_err(|e| CoerceError::Parse(e.to_string()))?;

    match from_yaml(loaded) {
        PlanValue::Map(map) => Ok(map),
        _ => Err(CoerceError::RootNotMap),
    }
}

/// Convert a JSON value into the plan tree.
///
/// Integers that fit `i64` stay integers; larger ones become floats.
pub fn from_json(value: &serde_json::Value) -> PlanValue {
    match value {
        serde_json::Value::Null => PlanValue::Null,
        serde_json::Value::Bool(b) => PlanValue::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                PlanValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                PlanValue::Float(f)
            } else {
                PlanValue::String(n.to_string())
            }
        }
        serde_json::Value::String(s) => PlanValue::String(s.clone()),
        serde_json::Value::Array(items) => PlanValue::Array(items.iter().map(from_json).collect()),
        serde_json::Value::Object(map) => PlanValue::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), from_json(v)))
                .collect(),
        ),
    }
}

/// Convert a YAML value into the plan tree.
///
/// Mapping keys of any type are rendered to strings. Tagged values are
/// replaced by the value they wrap.
pub fn from_yaml(value: serde_yaml::Value) -> PlanValue {
    match value {
        serde_yaml::Value::Null => PlanValue::Null,
        serde_yaml::Value::Bool(b) => PlanValue::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                PlanValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                PlanValue::Float(f)
            } else {
                PlanValue::String(n.to_string())
            }
        }
        serde_yaml::Value::String(s) => PlanValue::String(s),
        serde_yaml::Value::Sequence(items) => {
            PlanValue::Array(items.into_iter().map(from_yaml).collect())
        }
        serde_yaml::Value::Mapping(map) => PlanValue::Map(
            map.into_iter()
                .map(|(k, v)| (from_yaml(k).render(), from_yaml(v)))
                .collect(),
        ),
        serde_yaml::Value::Tagged(tagged) => from_yaml(tagged.value),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn document_map_is_accepted() {
        let input = PlanInput::from(json!({"schema_version": "1", "nodes": []}));
        let map = coerce(&input, 10).expect("documents are not size-limited");
        assert_eq!(map.get("schema_version"), Some(&PlanValue::from("1")));
        assert_eq!(map.get("nodes"), Some(&PlanValue::Array(vec![])));
    }

    #[test]
    fn document_non_map_root_is_rejected() {
        let input = PlanInput::from(json!([1, 2, 3]));
        assert_eq!(coerce(&input, 1_000), Err(CoerceError::RootNotMap));
    }

    #[test]
    fn yaml_text_is_parsed() {
        let text = r#"
schema_version: "1"
nodes:
  - id: a
    name: Build
    role: developer
    retries: 2
    gates: [review]
edges: []
"#;
        let map = parse_text(text, 10_000).expect("should parse");
        let nodes = map["nodes"].as_array().unwrap();
        let node = nodes[0].as_map().unwrap();
        assert_eq!(node["id"], PlanValue::from("a"));
        assert_eq!(node["retries"], PlanValue::Integer(2));
        assert_eq!(
            node["gates"],
            PlanValue::Array(vec![PlanValue::from("review")])
        );
    }

    #[test]
    fn json_text_is_parsed() {
        let text = r#"{"schema_version": "1", "nodes": [{"id": "a", "name": "A"}], "edges": [["a", "b"]]}"#;
        let map = parse_text(text, 10_000).expect("JSON is valid YAML");
        assert_eq!(map["edges"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn oversized_text_is_rejected_before_parsing() {
        // Not valid YAML either; the size check must win.
        let text = format!("{{{{{{{}", "x".repeat(100));
        let err = parse_text(&text, 50).unwrap_err();
        assert_eq!(
            err,
            CoerceError::TooLarge {
                size: text.len(),
                limit: 50
            }
        );
        assert_eq!(err.to_issue().code, IssueCode::PlanTooLarge);
        assert_eq!(err.to_issue().detail, text.len().to_string());
    }

    #[test]
    fn size_limit_counts_bytes_not_chars() {
        let text = "a: \"ééé\"";
        assert!(text.chars().count() <= 9);
        assert!(parse_text(text, text.len()).is_ok());
        assert!(parse_text(text, text.len() - 1).is_err());
    }

    #[test]
    fn malformed_text_is_invalid_format() {
        let err = parse_text("nodes: [unclosed", 1_000).unwrap_err();
        assert!(matches!(err, CoerceError::Parse(_)));
        let issue = err.to_issue();
        assert_eq!(issue.code, IssueCode::InvalidFormat);
        assert!(issue.detail.starts_with("yaml_parse_error:"), "{issue}");
    }

    #[test]
    fn scalar_root_is_invalid_format() {
        for text in ["just a string", "- a\n- b", "42"] {
            let err = parse_text(text, 1_000).unwrap_err();
            assert_eq!(err, CoerceError::RootNotMap, "input {text:?}");
            assert_eq!(err.to_issue().detail, "root must be an object");
        }
    }

    #[test]
    fn non_string_keys_are_rendered() {
        let map = parse_text("1: one\ntrue: yes\n2.5: x\n", 1_000).unwrap();
        assert!(map.contains_key("1"));
        assert!(map.contains_key("true"));
        assert!(map.contains_key("2.5"));
    }

    #[test]
    fn merge_keys_are_applied() {
        let text = r#"
defaults: &defaults
  role: tester
  retries: 3
nodes:
  - <<: *defaults
    id: a
    name: A
"#;
        let map = parse_text(text, 1_000).unwrap();
        let node = map["nodes"].as_array().unwrap()[0].as_map().unwrap();
        assert_eq!(node["role"], PlanValue::from("tester"));
        assert_eq!(node["retries"], PlanValue::Integer(3));
        assert!(!node.contains_key("<<"));
    }

    #[test]
    fn tagged_values_unwrap() {
        let map = parse_text("id: !custom abc\n", 1_000).unwrap();
        assert_eq!(map["id"], PlanValue::from("abc"));
    }

    #[test]
    fn big_integers_become_floats() {
        let value = from_json(&json!(u64::MAX));
        assert!(matches!(value, PlanValue::Float(_)));
    }
}
