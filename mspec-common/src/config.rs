//! Bootstrap configuration loading
//!
//! Settings are resolved in priority order:
//! 1. Command-line arguments (applied by the binary through [`ConfigOverrides`])
//! 2. Environment variables (`MSPEC_CONFIG` selects the TOML file)
//! 3. TOML configuration file
//! 4. Compiled defaults
//!
//! A missing TOML file is not an error: a warning is logged and defaults
//! are used. A TOML file that exists but cannot be parsed is an error.

use crate::mapping::FieldErrorPolicy;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the TOML configuration file
pub const CONFIG_ENV_VAR: &str = "MSPEC_CONFIG";

/// Bootstrap configuration loaded from TOML
///
/// Cannot change while the service runs; mapping documents are the only
/// configuration that reloads at runtime.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TomlConfig {
    /// Address the HTTP server binds to
    pub bind_address: String,

    /// SQLite database file; defaults to `<data dir>/mspec/machines.db`
    pub database_path: Option<PathBuf>,

    /// Mapping document (JSON, or TOML by extension)
    pub mappings_path: PathBuf,

    /// Origins allowed by CORS
    pub cors_origins: Vec<String>,

    pub field_error_policy: FieldErrorPolicy,

    /// Upper bound on records returned per page
    pub max_page_size: i64,

    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            database_path: None,
            mappings_path: PathBuf::from("mappings.json"),
            cors_origins: vec!["http://localhost:5173".to_string()],
            field_error_policy: FieldErrorPolicy::default(),
            max_page_size: 100,
            logging: LoggingConfig::default(),
        }
    }
}

/// Values given on the command line (or their environment fallbacks)
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind_address: Option<String>,
    pub database_path: Option<PathBuf>,
    pub mappings_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file that must exist
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load from the resolved config file, or fall back to defaults if none exists
    pub fn load_or_default(cli_path: Option<&Path>) -> Result<Self> {
        match resolve_config_path(cli_path) {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                Self::load(&path)
            }
            Some(path) => {
                warn!("Config file {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            None => {
                warn!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Apply command-line values on top of file/default values
    pub fn apply_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(bind_address) = overrides.bind_address {
            self.bind_address = bind_address;
        }
        if let Some(database_path) = overrides.database_path {
            self.database_path = Some(database_path);
        }
        if let Some(mappings_path) = overrides.mappings_path {
            self.mappings_path = mappings_path;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        self
    }

    /// Database path, falling back to the platform data directory
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| default_data_dir().join("machines.db"))
    }

    fn validate(&self) -> Result<()> {
        if self.max_page_size < 1 {
            return Err(Error::Config(format!(
                "max_page_size must be at least 1, got {}",
                self.max_page_size
            )));
        }
        if self.bind_address.trim().is_empty() {
            return Err(Error::Config("bind_address must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Locate the TOML configuration file
///
/// Priority: explicit path, then `MSPEC_CONFIG`, then the user config
/// directory, then `/etc/mspec/config.toml` on Linux. Returns the explicit
/// or environment path even if it does not exist, so the caller can warn.
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let user_config = dirs::config_dir().map(|d| d.join("mspec").join("config.toml"));
    if let Some(path) = user_config.filter(|p| p.exists()) {
        return Some(path);
    }

    let system_config = PathBuf::from("/etc/mspec/config.toml");
    if cfg!(target_os = "linux") && system_config.exists() {
        return Some(system_config);
    }

    None
}

/// OS-dependent default data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("mspec"))
        .unwrap_or_else(|| PathBuf::from("./mspec_data"))
}
