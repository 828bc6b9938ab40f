//! Handlers for `mlcp run` subcommands.

use anyhow::Result;

use mlcp_core::ControlPlane;

use crate::{RunCommands, print_json};

/// Dispatch a `RunCommands` variant to the appropriate handler.
pub async fn run_run_command(command: RunCommands, cp: &ControlPlane) -> Result<()> {
    match command {
        RunCommands::Create {
            goals,
            project,
            owner,
        } => {
            let run = cp
                .create_run(&goals, project.as_deref(), owner.as_deref())
                .await?;
            print_json(&run)
        }
        RunCommands::Show { run_id } => {
            let run = cp.get_run(&run_id).await?;
            print_json(&run)
        }
    }
}
