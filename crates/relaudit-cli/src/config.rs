use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use relaudit_audit::AuditOptions;
use relaudit_introspect::ConnectOptions;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "relaudit.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Contents of `relaudit.toml`.
///
/// ```toml
/// [audit]
/// schema = "public"
/// max_parallelism = 4
///
/// [[audit.conventions]]
/// kind = "id_suffix"
///
/// [pool]
/// statement_timeout_secs = 30
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuditConfig {
    pub audit: AuditOptions,
    pub pool: PoolConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub statement_timeout_secs: Option<u64>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        let defaults = ConnectOptions::default();
        Self {
            max_connections: defaults.max_connections,
            acquire_timeout_secs: defaults.acquire_timeout.as_secs(),
            statement_timeout_secs: None,
        }
    }
}

impl PoolConfig {
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            max_connections: self.max_connections.max(1),
            acquire_timeout: Duration::from_secs(self.acquire_timeout_secs),
            statement_timeout: self.statement_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Flag values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub schema: Option<String>,
    pub max_parallelism: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub audit_column: Option<String>,
    pub trigger_name: Option<String>,
    pub candidate_tables: Vec<String>,
}

impl AuditConfig {
    pub fn apply(&mut self, overrides: Overrides) {
        let audit = &mut self.audit;
        if let Some(schema) = overrides.schema {
            audit.schema = schema;
        }
        if let Some(parallelism) = overrides.max_parallelism {
            audit.max_parallelism = parallelism;
        }
        if let Some(timeout) = overrides.timeout_secs {
            audit.timeout_secs = Some(timeout);
        }
        if let Some(column) = overrides.audit_column {
            audit.audit_column = column;
        }
        if let Some(name) = overrides.trigger_name {
            audit.trigger_name = Some(name);
        }
        if !overrides.candidate_tables.is_empty() {
            audit.candidate_tables = Some(overrides.candidate_tables);
        }
        self.fit_parallelism_to_pool();
    }

    /// Cap per-table parallelism at the pool size.
    pub fn fit_parallelism_to_pool(&mut self) {
        let connections = usize::try_from(self.pool.max_connections.max(1)).unwrap_or(usize::MAX);
        if self.audit.max_parallelism > connections {
            tracing::debug!(
                event = "parallelism_capped",
                requested = self.audit.max_parallelism,
                max_connections = connections
            );
            self.audit.max_parallelism = connections;
        }
    }
}

/// Read `explicit` when given (it must exist), otherwise `fallback` when it
/// exists, otherwise defaults.
pub fn load_config(explicit: Option<&Path>, fallback: &Path) -> Result<AuditConfig, ConfigError> {
    let path = match explicit {
        Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.to_path_buf())),
        Some(path) => path,
        None if fallback.exists() => fallback,
        None => return Ok(AuditConfig::default()),
    };

    let content = std::fs::read_to_string(path)?;
    let config: AuditConfig = toml::from_str(&content)?;
    Ok(config)
}
