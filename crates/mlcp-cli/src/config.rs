//! Configuration file management for mlcp.
//!
//! Provides a TOML config file at `~/.config/mlcp/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use mlcp_core::PlanLimits;
use mlcp_db::config::DbConfig;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    #[serde(default)]
    pub limits: PlanLimits,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the mlcp config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/mlcp` or `~/.config/mlcp`,
/// on every platform.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("mlcp");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("mlcp")
}

/// Return the path to the mlcp config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    load_config_from(&config_path())
}

fn load_config_from(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct MlcpConfig {
    pub db_config: DbConfig,
    pub limits: PlanLimits,
}

impl MlcpConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `MLCP_DATABASE_URL` env > `config_file.database.url` > `DbConfig::DEFAULT_URL`
    /// - Limits: `MLCP_PLAN_MAX_*` env > `config_file.limits` > `PlanLimits::default()`, per field
    pub fn resolve(cli_db_url: Option<&str>) -> Self {
        let file_config = match load_config() {
            Ok(cfg) => Some(cfg),
            Err(e) => {
                tracing::debug!("no usable config file: {e:#}");
                None
            }
        };

        let db_config = if let Some(url) = cli_db_url {
            DbConfig::new(url)
        } else if std::env::var_os("MLCP_DATABASE_URL").is_some() {
            DbConfig::from_env()
        } else if let Some(ref cfg) = file_config {
            DbConfig::new(cfg.database.url.as_str())
        } else {
            DbConfig::new(DbConfig::DEFAULT_URL)
        };

        let limits = file_config
            .map(|cfg| cfg.limits)
            .unwrap_or_default()
            .with_env_overrides();

        Self { db_config, limits }
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
