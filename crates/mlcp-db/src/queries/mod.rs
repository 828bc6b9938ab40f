//! Query functions, one module per table family.

pub mod plans;
pub mod runs;
pub mod task_states;
