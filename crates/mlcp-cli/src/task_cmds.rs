//! Handlers for `mlcp task` subcommands and `mlcp frontier`.

use anyhow::Result;

use mlcp_core::ControlPlane;

use crate::{TaskCommands, print_json};

/// Dispatch a `TaskCommands` variant to the appropriate handler.
pub async fn run_task_command(command: TaskCommands, cp: &ControlPlane) -> Result<()> {
    match command {
        TaskCommands::Complete {
            run_id,
            node_id,
            version,
        } => {
            let state = cp.mark_task_complete(&run_id, &node_id, version).await?;
            print_json(&state)
        }
        TaskCommands::Fail {
            run_id,
            node_id,
            version,
        } => {
            let state = cp.mark_task_failed(&run_id, &node_id, version).await?;
            print_json(&state)
        }
        TaskCommands::List { run_id, version } => {
            let states = cp.task_statuses(&run_id, version).await?;
            print_json(&states)
        }
    }
}

/// Print the ready set of a run.
pub async fn cmd_frontier(cp: &ControlPlane, run_id: &str, version: Option<i64>) -> Result<()> {
    let frontier = cp.get_frontier(run_id, version).await?;
    print_json(&frontier)
}
