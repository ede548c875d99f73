//! Configuration loading and path resolution
//!
//! The ledger is configured from a TOML file:
//!
//! ```toml
//! database_path = "/var/lib/pledge-ledger/ledger.db"
//!
//! [registry]
//! valid_names = ["Eli", "Matthew"]
//!
//! [registry.aliases]
//! Matt = "Matthew"
//! ```
//!
//! The registry section is expected to change every deployment period, so it
//! lives in data rather than code.

use crate::registry::NameRegistry;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "PLEDGE_LEDGER_CONFIG";

/// Environment variable overriding the database path
pub const DATABASE_ENV_VAR: &str = "PLEDGE_LEDGER_DB";

const APP_DIR: &str = "pledge-ledger";

/// Top-level ledger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// SQLite database file; see [`LedgerConfig::database_path`]
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    pub registry: RegistryConfig,
}

/// Valid subject names and their aliases
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub valid_names: Vec<String>,

    /// Alternate spelling -> canonical name
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

impl LedgerConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: LedgerConfig = toml::from_str(content)?;
        if config.registry.valid_names.is_empty() {
            return Err(Error::Config(
                "registry.valid_names must list at least one name".to_string(),
            ));
        }
        Ok(config)
    }

    /// Read and parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Locate and load the config file (see [`resolve_config_path`])
    pub fn discover(cli_arg: Option<&Path>) -> Result<Self> {
        let path = resolve_config_path(cli_arg)?;
        tracing::info!(path = %path.display(), "Loading ledger configuration");
        Self::load(&path)
    }

    /// Database path resolution order:
    /// 1. `PLEDGE_LEDGER_DB` environment variable
    /// 2. `database_path` from the config file
    /// 3. OS-dependent default data directory
    pub fn database_path(&self) -> PathBuf {
        if let Ok(path) = std::env::var(DATABASE_ENV_VAR) {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.database_path {
            return path.clone();
        }

        default_database_path()
    }

    /// Build the name registry described by this config
    pub fn name_registry(&self) -> Result<NameRegistry> {
        NameRegistry::from_config(&self.registry)
    }
}

/// Config file resolution order:
/// 1. Explicit path (highest priority)
/// 2. `PLEDGE_LEDGER_CONFIG` environment variable
/// 3. `<user config dir>/pledge-ledger/config.toml`
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = cli_arg {
        return Ok(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    let user_config = dirs::config_dir()
        .map(|d| d.join(APP_DIR).join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

    if user_config.exists() {
        Ok(user_config)
    } else {
        Err(Error::Config(format!(
            "Config file not found: {}",
            user_config.display()
        )))
    }
}

/// OS-dependent default database location
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("./pledge_ledger_data"))
        .join("ledger.db")
}
