//! Plan control-plane core.
//!
//! Ingests task graphs, validates and canonicalizes them, stores each one as
//! an immutable numbered version, and answers which nodes are ready to run
//! as task events arrive. [`ControlPlane`] is the entry point.

pub mod control;
pub mod error;
pub mod frontier;
pub mod limits;
pub mod plan;
pub mod tasks;

pub use control::ControlPlane;
pub use error::PlanError;
pub use frontier::{FrontierNode, compute_frontier};
pub use limits::PlanLimits;
