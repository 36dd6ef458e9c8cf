//! Compiler configuration: pagination defaults, pivot null-label, and
//! parameter prefix override, loaded the way the teacher loads its own
//! TOML config.

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{CompileError, Result};

/// Threaded through compilation as `&CompilerConfig`, the way the
/// teacher threads `&SqlitePool` — read-only, shared across a whole
/// request.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub struct CompilerConfig {
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub pivot: PivotConfig,
    #[serde(default)]
    pub parameters: ParameterConfig,
}

impl CompilerConfig {
    /// Loads config from a TOML file, mirroring the teacher's
    /// `GraphSQLConfig::from_path`/`load_config` pattern: existence
    /// check, `tracing::debug!` at each step, fail with a descriptive
    /// `CompileError` rather than panicking.
    pub fn from_path(path: &str) -> Result<Self> {
        debug!("loading compiler config from: {}", path);

        if !std::path::Path::new(path).exists() {
            return Err(CompileError::invalid_argument(format!(
                "config file not found: {path}"
            )));
        }

        info!("config file found, loading from: {}", path);

        let contents = std::fs::read_to_string(path).map_err(|e| {
            debug!("failed to read config file: {}", e);
            CompileError::invalid_argument(format!("failed to read '{path}': {e}"))
        })?;

        let config: CompilerConfig = toml::from_str(&contents).map_err(|e| {
            debug!("failed to parse config file: {}", e);
            CompileError::invalid_argument(format!("failed to parse '{path}': {e}"))
        })?;

        debug!("compiler config loaded successfully");
        Ok(config)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct PaginationConfig {
    pub default_limit: Option<i64>,
    pub max_limit: Option<i64>,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: Some(100),
            max_limit: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct PivotConfig {
    pub null_label: Option<String>,
}

impl Default for PivotConfig {
    fn default() -> Self {
        Self {
            null_label: Some("_null_".to_string()),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub struct ParameterConfig {
    pub prefix_override: Option<String>,
}

/// Installs a `tracing` subscriber for tests — the library itself
/// never calls this, since initializing global logging is a
/// process-level decision that belongs to the host binary, not a
/// compiler crate.
#[cfg(test)]
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_file_is_invalid_argument() {
        let err = CompilerConfig::from_path("/nonexistent/path/config.toml").unwrap_err();
        assert!(matches!(err, CompileError::InvalidArgument { .. }));
    }

    #[test]
    fn defaults_are_sensible() {
        let config = CompilerConfig::default();
        assert_eq!(config.pagination.default_limit, Some(100));
        assert_eq!(config.pivot.null_label.as_deref(), Some("_null_"));
    }
}
