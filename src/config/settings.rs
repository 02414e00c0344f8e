//! TOML-based configuration (§6.5).
//!
//! Example configuration:
//! ```toml
//! [scheduler]
//! cadence_seconds = 60
//! rate_limit_window_hours = 24
//! max_parallel_groups = 32
//!
//! [compiler]
//! default_limit = 100
//! max_nesting_depth = 5
//!
//! [validator]
//! strict_mode = true
//!
//! [database]
//! connection_string = "${SCREENER_DATABASE_URL}"
//! max_connections = 10
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Settings {
    pub scheduler: SchedulerSettings,
    pub compiler: CompilerSettings,
    pub validator: ValidatorConfig,
    pub database: DatabaseSettings,
}

/// Alert scheduler tuning (§4.6, §5).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerSettings {
    /// Interval between scheduler ticks (`tokio::time::interval`).
    pub cadence_seconds: u64,
    /// Minimum gap between two firings of the same subscription.
    pub rate_limit_window_hours: u64,
    /// Upper bound on concurrently-evaluating cadence groups
    /// (`tokio::sync::Semaphore` permits).
    pub max_parallel_groups: usize,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            cadence_seconds: 60,
            rate_limit_window_hours: 24,
            max_parallel_groups: 32,
        }
    }
}

/// Compiler tuning (§4.4).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompilerSettings {
    pub default_limit: u32,
    pub max_nesting_depth: usize,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            default_limit: 100,
            max_nesting_depth: crate::dsl::DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}

/// Validator tuning (§4.3).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub strict_mode: bool,
    pub max_limit: u32,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            strict_mode: true,
            max_limit: 1000,
        }
    }
}

impl From<&ValidatorConfig> for crate::validation::ValidatorSettings {
    fn from(cfg: &ValidatorConfig) -> Self {
        crate::validation::ValidatorSettings {
            max_nesting_depth: crate::dsl::DEFAULT_MAX_NESTING_DEPTH,
            max_limit: cfg.max_limit,
            strict_mode: cfg.strict_mode,
        }
    }
}

/// Database connection settings (§6.5, sqlx `PgPool`).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Connection string (supports `${ENV_VAR}` expansion).
    pub connection_string: String,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            connection_string: "${SCREENER_DATABASE_URL}".to_string(),
            max_connections: 10,
        }
    }
}

impl DatabaseSettings {
    pub fn resolved_connection_string(&self) -> Result<String, SettingsError> {
        expand_env_vars(&self.connection_string)
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. `SCREENER_CONFIG` environment variable
    /// 2. `./screener.toml`
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("SCREENER_CONFIG") {
            return Self::from_file(path);
        }
        let local_config = PathBuf::from("screener.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }
        Ok(Settings::default())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' {
            if chars.peek() == Some(&'{') {
                chars.next();
                let mut var_name = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch == '}' {
                        chars.next();
                        break;
                    }
                    var_name.push(chars.next().unwrap());
                }
                let value = env::var(&var_name)
                    .map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
                result.push_str(&value);
            } else {
                let mut var_name = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_alphanumeric() || ch == '_' {
                        var_name.push(chars.next().unwrap());
                    } else {
                        break;
                    }
                }
                if var_name.is_empty() {
                    result.push('$');
                } else {
                    let value = env::var(&var_name)
                        .map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
                    result.push_str(&value);
                }
            }
        } else {
            result.push(c);
        }
    }

    Ok(result)
}
