//! Content hash of canonical plans.

use sha2::{Digest, Sha256};

use super::normalize::CanonicalPlan;

/// Serialize a canonical plan as compact JSON with sorted keys.
///
/// These bytes are both the hash input and the stored plan body.
pub fn canonical_json(plan: &CanonicalPlan) -> serde_json::Result<String> {
    serde_json::to_string(plan)
}

/// Lowercase hex SHA-256 of `body`.
pub fn digest(body: &str) -> String {
    hex::encode(Sha256::digest(body.as_bytes()))
}

/// Hash of a canonical plan. Equal canonical content always yields the
/// same hash.
pub fn plan_hash(plan: &CanonicalPlan) -> serde_json::Result<String> {
    canonical_json(plan).map(|body| digest(&body))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::plan::coerce::{self, PlanInput};
    use crate::plan::normalize::normalize;

    fn canonical(input: PlanInput) -> CanonicalPlan {
        normalize(&coerce::coerce(&input, usize::MAX).unwrap())
    }

    #[test]
    fn body_has_sorted_keys_and_no_whitespace() {
        let plan = canonical(PlanInput::from(json!({
            "nodes": [{"name": "A", "id": "a", "gates": ["review"]}],
            "edges": []
        })));
        assert_eq!(
            canonical_json(&plan).unwrap(),
            r#"{"edges":[],"nodes":[{"gates":["review"],"id":"a","name":"A","retries":1,"role":"developer","timeout_ms":120000}],"schema_version":"1","stats_edges":0,"stats_nodes":1}"#
        );
    }

    #[test]
    fn digest_is_lowercase_sha256_hex() {
        assert_eq!(
            digest(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn formatting_differences_hash_equal() {
        let yaml = PlanInput::text(
            "edges:\n  - [a, b]\nnodes:\n  - name: \"A\"\n    id: a\n  - id: \"  b \"\n    name: B\n",
        );
        let json_text = PlanInput::text(
            r#"{ "nodes": [ {"id": "b", "name": "B", "retries": 1}, {"id": "a", "name": "A"} ],
                "edges": [["a", "b"]], "schema_version": "1" }"#,
        );
        let document = PlanInput::from(json!({
            "schema_version": "1",
            "nodes": [{"id": "a", "name": "A", "role": "developer"}, {"id": "b", "name": "B"}],
            "edges": [["a", "b"]]
        }));

        let h1 = plan_hash(&canonical(yaml)).unwrap();
        let h2 = plan_hash(&canonical(json_text)).unwrap();
        let h3 = plan_hash(&canonical(document)).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h2, h3);
    }

    #[test]
    fn content_changes_change_the_hash() {
        let base = canonical(PlanInput::from(json!({"nodes": [{"id": "a", "name": "A"}]})));
        let retried = canonical(PlanInput::from(
            json!({"nodes": [{"id": "a", "name": "A", "retries": 2}]}),
        ));
        assert_ne!(plan_hash(&base).unwrap(), plan_hash(&retried).unwrap());
    }

    #[test]
    fn renormalizing_keeps_the_hash() {
        let once = canonical(PlanInput::text(
            "nodes:\n  - {id: ' x  y ', name: X, gates: [review, review, nope], timeout_ms: 3}\n",
        ));
        let twice = normalize(&once.to_tree());
        assert_eq!(plan_hash(&once).unwrap(), plan_hash(&twice).unwrap());
    }
}
