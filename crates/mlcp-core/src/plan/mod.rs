//! Plan ingestion: coercion, validation, canonical form, hashing, storage.

pub mod coerce;
pub mod hash;
pub mod issue;
pub mod normalize;
pub mod store;
pub mod validate;
pub mod value;

pub use coerce::{CoerceError, PlanInput};
pub use hash::{canonical_json, plan_hash};
pub use issue::{IssueCode, PlanIssue};
pub use normalize::{CanonicalNode, CanonicalPlan, normalize};
pub use store::{SealedPlan, persist};
pub use validate::{PlanStats, ValidationReport, validate, validate_input};
pub use value::{PlanMap, PlanValue};
