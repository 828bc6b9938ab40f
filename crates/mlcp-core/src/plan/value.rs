//! The coerced plan document tree.
//!
//! Every input format (structured JSON, YAML text, JSON text) is reduced to
//! [`PlanValue`] before validation or normalization, so consumers match on a
//! closed set of shapes instead of probing an untyped value.

use std::collections::BTreeMap;

/// String-keyed map node of a [`PlanValue`] tree.
pub type PlanMap = BTreeMap<String, PlanValue>;

/// A node of a coerced plan document.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<PlanValue>),
    Map(PlanMap),
}

impl PlanValue {
    pub fn as_map(&self) -> Option<&PlanMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PlanValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Short name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
        }
    }

    /// Render the value as text, the way identifiers and enum fields are
    /// read out of a document.
    ///
    /// `Null` renders as the empty string, so an explicit `null` id is
    /// treated the same as a missing one. Arrays and maps render as compact
    /// JSON.
    pub fn render(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => format!("{f:?}"),
            Self::String(s) => s.clone(),
            Self::Array(_) | Self::Map(_) => self.to_json().to_string(),
        }
    }

    /// Convert back into a JSON value. Non-finite floats become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Integer(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Array(items) => {
                serde_json::Value::Array(items.iter().map(PlanValue::to_json).collect())
            }
            Self::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

/// Read `key` from a node map as text, falling back to `default` when the
/// key is absent.
pub(crate) fn field_text(map: &PlanMap, key: &str, default: &str) -> String {
    map.get(key)
        .map(PlanValue::render)
        .unwrap_or_else(|| default.to_owned())
}

/// Collapse every run of whitespace to a single space and trim both ends.
pub(crate) fn compact_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl From<&str> for PlanValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for PlanValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for PlanValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<PlanMap> for PlanValue {
    fn from(map: PlanMap) -> Self {
        Self::Map(map)
    }
}

impl From<Vec<PlanValue>> for PlanValue {
    fn from(items: Vec<PlanValue>) -> Self {
        Self::Array(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_scalars() {
        assert_eq!(PlanValue::Null.render(), "");
        assert_eq!(PlanValue::Bool(true).render(), "true");
        assert_eq!(PlanValue::Integer(-7).render(), "-7");
        assert_eq!(PlanValue::Float(1.0).render(), "1.0");
        assert_eq!(PlanValue::Float(2.5).render(), "2.5");
        assert_eq!(PlanValue::from(" a ").render(), " a ");
    }

    #[test]
    fn render_composites_as_compact_json() {
        let value = PlanValue::Array(vec![PlanValue::from("a"), PlanValue::Integer(1)]);
        assert_eq!(value.render(), r#"["a",1]"#);

        let mut map = PlanMap::new();
        map.insert("k".to_owned(), PlanValue::Null);
        assert_eq!(PlanValue::Map(map).render(), r#"{"k":null}"#);
    }

    #[test]
    fn accessors_match_variant() {
        let arr = PlanValue::Array(vec![]);
        assert!(arr.as_array().is_some());
        assert!(arr.as_map().is_none());
        assert_eq!(arr.kind(), "array");
        assert_eq!(PlanValue::Map(PlanMap::new()).kind(), "map");
    }

    #[test]
    fn compact_whitespace_collapses_runs() {
        assert_eq!(compact_whitespace("  build \t the\n thing  "), "build the thing");
        assert_eq!(compact_whitespace("   "), "");
    }

    #[test]
    fn field_text_defaults_only_when_absent() {
        let mut map = PlanMap::new();
        map.insert("role".to_owned(), PlanValue::Null);
        assert_eq!(field_text(&map, "role", "developer"), "");
        assert_eq!(field_text(&map, "name", "x"), "x");
    }

    #[test]
    fn non_finite_float_becomes_null_json() {
        assert_eq!(PlanValue::Float(f64::NAN).to_json(), serde_json::Value::Null);
    }
}
