//! Handlers for `mlcp plan` subcommands.
//!
//! Implements:
//! - `mlcp plan validate <file>`         -- validate without storing
//! - `mlcp plan seal <run-id> <file>`    -- seal the next version of a run
//! - `mlcp plan versions <run-id>`       -- list sealed versions
//! - `mlcp plan show <run-id>`           -- print a canonical plan

use std::io::Read;

use anyhow::{Context, Result};

use mlcp_core::ControlPlane;
use mlcp_core::PlanLimits;
use mlcp_core::plan::{PlanInput, validate_input};

use crate::{PlanCommands, print_json};

/// Dispatch a `PlanCommands` variant to the appropriate handler.
pub async fn run_plan_command(command: PlanCommands, cp: &ControlPlane) -> Result<()> {
    match command {
        PlanCommands::Validate { file } => cmd_validate(cp.limits(), &file),
        PlanCommands::Seal { run_id, file } => cmd_seal(cp, &run_id, &file).await,
        PlanCommands::Versions { run_id } => {
            let versions = cp.list_plan_versions(&run_id).await?;
            print_json(&versions)
        }
        PlanCommands::Show { run_id, version } => {
            let plan = cp.get_canonical_plan(&run_id, version).await?;
            print_json(&plan)
        }
    }
}

/// Read plan text from a file, or from stdin when `file` is `-`.
pub fn read_plan_input(file: &str) -> Result<PlanInput> {
    let text = if file == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read plan from stdin")?;
        buf
    } else {
        std::fs::read_to_string(file)
            .with_context(|| format!("failed to read plan file: {file}"))?
    };
    Ok(PlanInput::Text(text))
}

/// Print the validation report. Exits non-zero when the plan is invalid.
pub fn cmd_validate(limits: &PlanLimits, file: &str) -> Result<()> {
    let input = read_plan_input(file)?;
    let report = validate_input(&input, limits);
    print_json(&report)?;
    if !report.ok {
        anyhow::bail!("plan {file} is invalid ({} error(s))", report.errors.len());
    }
    Ok(())
}

async fn cmd_seal(cp: &ControlPlane, run_id: &str, file: &str) -> Result<()> {
    let input = read_plan_input(file)?;
    let sealed = cp.seal_plan(run_id, &input).await?;
    print_json(&sealed)
}
