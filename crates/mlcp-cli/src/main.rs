mod config;
mod plan_cmds;
mod run_cmds;
mod task_cmds;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use mlcp_core::{ControlPlane, PlanError};
use mlcp_db::config::DbConfig;
use mlcp_db::pool;

use config::MlcpConfig;

#[derive(Parser)]
#[command(name = "mlcp", about = "Plan control plane: validate, seal, and track task graphs")]
struct Cli {
    /// Database URL (overrides MLCP_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write an mlcp config file (no database required)
    Init {
        /// SQLite connection URL
        #[arg(long, default_value = DbConfig::DEFAULT_URL)]
        db_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create the database file and apply migrations
    DbInit,
    /// Run management
    Run {
        #[command(subcommand)]
        command: RunCommands,
    },
    /// Plan validation and versioning
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Show the nodes that are ready to run
    Frontier {
        /// Run ID
        run_id: String,
        /// Plan version (defaults to the latest)
        #[arg(long)]
        version: Option<i64>,
    },
    /// Record task outcomes
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
}

#[derive(Subcommand)]
pub enum RunCommands {
    /// Create a new run
    Create {
        /// What the run is meant to achieve
        #[arg(long)]
        goals: String,
        /// Project name (default: mlcp)
        #[arg(long)]
        project: Option<String>,
        /// Owner (default: operator)
        #[arg(long)]
        owner: Option<String>,
    },
    /// Show a run
    Show {
        /// Run ID
        run_id: String,
    },
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Validate a plan file without storing it
    Validate {
        /// Path to a YAML or JSON plan file (`-` for stdin)
        file: String,
    },
    /// Validate and seal a plan as the next version of a run
    Seal {
        /// Run ID
        run_id: String,
        /// Path to a YAML or JSON plan file (`-` for stdin)
        file: String,
    },
    /// List the sealed versions of a run
    Versions {
        /// Run ID
        run_id: String,
    },
    /// Print the canonical form of a sealed version
    Show {
        /// Run ID
        run_id: String,
        /// Plan version (defaults to the latest)
        #[arg(long)]
        version: Option<i64>,
    },
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Mark a node complete
    Complete {
        /// Run ID
        run_id: String,
        /// Node ID
        node_id: String,
        /// Plan version (defaults to the latest)
        #[arg(long)]
        version: Option<i64>,
    },
    /// Mark a node failed
    Fail {
        /// Run ID
        run_id: String,
        /// Node ID
        node_id: String,
        /// Plan version (defaults to the latest)
        #[arg(long)]
        version: Option<i64>,
    },
    /// List recorded task statuses
    List {
        /// Run ID
        run_id: String,
        /// Plan version (defaults to the latest)
        #[arg(long)]
        version: Option<i64>,
    },
}

/// Print a value as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("failed to encode output")?;
    println!("{out}");
    Ok(())
}

#[derive(Serialize)]
struct ErrorOutput {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<mlcp_core::plan::PlanIssue>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        match e.downcast_ref::<PlanError>() {
            Some(plan_err) => {
                let out = ErrorOutput {
                    error: plan_err.code(),
                    message: plan_err.to_string(),
                    errors: plan_err.issues().to_vec(),
                };
                if print_json(&out).is_err() {
                    eprintln!("{e:#}");
                }
            }
            None => eprintln!("{e:#}"),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Init { db_url, force } => cmd_init(&db_url, force),
        Commands::DbInit => cmd_db_init(cli.database_url.as_deref()).await,
        Commands::Plan {
            command: PlanCommands::Validate { file },
        } => {
            // Validation is stateless; no database connection needed.
            let resolved = MlcpConfig::resolve(cli.database_url.as_deref());
            plan_cmds::cmd_validate(&resolved.limits, &file)
        }
        Commands::Plan { command } => {
            let cp = connect(cli.database_url.as_deref()).await?;
            let result = plan_cmds::run_plan_command(command, &cp).await;
            cp.pool().close().await;
            result
        }
        Commands::Run { command } => {
            let cp = connect(cli.database_url.as_deref()).await?;
            let result = run_cmds::run_run_command(command, &cp).await;
            cp.pool().close().await;
            result
        }
        Commands::Frontier { run_id, version } => {
            let cp = connect(cli.database_url.as_deref()).await?;
            let result = task_cmds::cmd_frontier(&cp, &run_id, version).await;
            cp.pool().close().await;
            result
        }
        Commands::Task { command } => {
            let cp = connect(cli.database_url.as_deref()).await?;
            let result = task_cmds::run_task_command(command, &cp).await;
            cp.pool().close().await;
            result
        }
    }
}

/// Resolve configuration and build the control plane over a fresh pool.
async fn connect(cli_db_url: Option<&str>) -> anyhow::Result<ControlPlane> {
    let resolved = MlcpConfig::resolve(cli_db_url);
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    Ok(ControlPlane::new(db_pool, resolved.limits))
}

/// Execute the `mlcp init` command: write config file.
fn cmd_init(db_url: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        limits: mlcp_core::PlanLimits::default(),
    };
    config::save_config(&cfg)?;

    tracing::info!(path = %path.display(), "config written; next run `mlcp db-init`");
    print_json(&serde_json::json!({
        "config_path": path.display().to_string(),
        "database_url": db_url,
        "limits": cfg.limits,
    }))
}

/// Execute the `mlcp db-init` command: create the database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = MlcpConfig::resolve(cli_db_url);

    tracing::info!(url = %resolved.db_config.database_url, "initializing database");
    let db_pool = pool::connect_and_migrate(&resolved.db_config).await?;

    let counts = pool::table_counts(&db_pool).await;
    db_pool.close().await;

    let tables: serde_json::Map<String, serde_json::Value> = counts?
        .into_iter()
        .map(|(table, count)| (table, count.into()))
        .collect();
    print_json(&serde_json::json!({
        "database_url": resolved.db_config.database_url,
        "database_path": resolved.db_config.database_path(),
        "tables": tables,
    }))
}


#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_seal_with_global_database_url() {
        let cli = Cli::try_parse_from([
            "mlcp",
            "plan",
            "seal",
            "run_1_abc",
            "plan.yaml",
            "--database-url",
            "sqlite://t.db",
        ])
        .unwrap();
        assert_eq!(cli.database_url.as_deref(), Some("sqlite://t.db"));
        assert!(matches!(
            cli.command,
            Commands::Plan {
                command: PlanCommands::Seal { .. }
            }
        ));
    }

    #[test]
    fn parses_task_version_flag() {
        let cli = Cli::try_parse_from(["mlcp", "task", "fail", "r", "n", "--version", "2"]).unwrap();
        match cli.command {
            Commands::Task {
                command: TaskCommands::Fail { version, .. },
            } => assert_eq!(version, Some(2)),
            _ => panic!("expected task fail"),
        }
    }
}
