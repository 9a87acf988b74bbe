//! Runtime configuration.
//!
//! Loaded from an optional `magick.toml`. User values are merged over the
//! stock defaults, unknown keys are rejected, and the result is validated.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [pool]
//! # max_workers = 4           # Async worker threads (omit for auto = CPU cores)
//! thread_name = "magick-worker"
//!
//! [output]
//! # default_format = "PNG"    # Used by write() when nothing else names a format
//! ```
//!
//! The process-wide configuration is fixed by [`install`]. Until then every
//! reader sees [`MagickConfig::default`].

use crate::coder;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

/// File name looked up by [`load_config`].
pub const CONFIG_FILE: &str = "magick.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MagickConfig {
    /// Async worker pool settings.
    pub pool: PoolConfig,
    /// Defaults applied when writing images.
    pub output: OutputConfig,
}

impl MagickConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool.max_workers == Some(0) {
            return Err(ConfigError::Validation("pool.max_workers must be at least 1".into()));
        }
        if self.pool.thread_name.trim().is_empty() {
            return Err(ConfigError::Validation("pool.thread_name must not be empty".into()));
        }
        match &self.output.default_format {
            Some(format) if coder::lookup(format).is_none() => Err(ConfigError::Validation(format!(
                "output.default_format '{format}' is not a known format"
            ))),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
    /// Maximum number of worker threads.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_workers: Option<usize>,
    /// Worker threads are named `{thread_name}-{index}`.
    pub thread_name: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers: None,
            thread_name: "magick-worker".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub default_format: Option<String>,
}

/// Resolve the effective worker count.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_workers(config: &PoolConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_workers.map(|n| n.min(cores)).unwrap_or(cores).max(1)
}

/// The stock defaults as a `toml::Value::Table`, the base layer for merging.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(MagickConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a TOML file as a raw value. `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(base: toml::Value, overlay: Option<toml::Value>) -> Result<MagickConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: MagickConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load `magick.toml` from `dir`, falling back to defaults when absent.
pub fn load_config(dir: &Path) -> Result<MagickConfig, ConfigError> {
    load_config_file(&dir.join(CONFIG_FILE))
}

/// Load an explicit config file path, falling back to defaults when absent.
pub fn load_config_file(path: &Path) -> Result<MagickConfig, ConfigError> {
    resolve_config(stock_defaults_value()?, load_raw_config(path)?)
}

static ACTIVE: OnceLock<MagickConfig> = OnceLock::new();

/// Fix the process-wide configuration and size the worker pool from it.
///
/// Only the first call takes effect; later calls return `false`.
pub fn install(config: MagickConfig) -> bool {
    let pool = config.pool.clone();
    if ACTIVE.set(config).is_err() {
        return false;
    }
    crate::pool::init(&pool);
    true
}

/// The installed configuration, or the defaults.
pub fn active() -> &'static MagickConfig {
    ACTIVE.get_or_init(MagickConfig::default)
}

/// A fully-commented stock `magick.toml`. Used by the `gen-config` command.
pub fn stock_config_toml() -> &'static str {
    r##"# magick-bind configuration
# ==========================
# All keys are optional. Omitted keys keep the defaults shown here.

[pool]
# Number of worker threads that run the *_async operations.
# Omit to use one worker per CPU core. Larger values are clamped to the
# core count.
# max_workers = 4

# Worker threads are named "<thread_name>-<index>".
thread_name = "magick-worker"

[output]
# Format used by write() when the path has no "FMT:" prefix, no known
# extension, and the image has no format set with magick().
# default_format = "PNG"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config() {
        let config = MagickConfig::default();
        assert_eq!(config.pool.max_workers, None);
        assert_eq!(config.pool.thread_name, "magick-worker");
        assert_eq!(config.output.default_format, None);
        config.validate().unwrap();
    }

    #[test]
    fn parse_partial_config() {
        let config: MagickConfig = toml::from_str("[pool]\nmax_workers = 2\n").unwrap();
        assert_eq!(config.pool.max_workers, Some(2));
        assert_eq!(config.pool.thread_name, "magick-worker");
    }

    #[test]
    fn effective_workers_auto() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_workers(&PoolConfig::default()), cores);
    }

    #[test]
    fn effective_workers_clamped_to_cores() {
        let config = PoolConfig {
            max_workers: Some(99999),
            ..PoolConfig::default()
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_workers(&config), cores);
    }

    #[test]
    fn effective_workers_user_constrains_down() {
        let config = PoolConfig {
            max_workers: Some(1),
            ..PoolConfig::default()
        };
        assert_eq!(effective_workers(&config), 1);
    }

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str("[pool]\nthread_name = \"a\"\nmax_workers = 3\n").unwrap();
        let overlay: toml::Value = toml::from_str("[pool]\nmax_workers = 1\n").unwrap();
        let merged = merge_toml(base, overlay);
        let pool = merged.get("pool").unwrap();
        assert_eq!(pool.get("max_workers").unwrap().as_integer(), Some(1));
        assert_eq!(pool.get("thread_name").unwrap().as_str(), Some("a"));
    }

    #[test]
    fn merge_toml_scalar_replaces_table() {
        let base: toml::Value = toml::from_str("[output]\ndefault_format = \"PNG\"\n").unwrap();
        let overlay: toml::Value = toml::from_str("output = 3\n").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("output").unwrap().as_integer(), Some(3));
    }

    #[test]
    fn unknown_key_rejected() {
        let result: Result<MagickConfig, _> = toml::from_str("[pool]\nworkers = 2\n");
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<MagickConfig, _> = toml::from_str("[poool]\nmax_workers = 2\n");
        assert!(result.is_err());
    }

    #[test]
    fn validate_zero_workers() {
        let config = MagickConfig {
            pool: PoolConfig {
                max_workers: Some(0),
                ..PoolConfig::default()
            },
            ..MagickConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_empty_thread_name() {
        let mut config = MagickConfig::default();
        config.pool.thread_name = "  ".into();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_default_format() {
        let mut config = MagickConfig::default();
        config.output.default_format = Some("png".into());
        config.validate().unwrap();
        config.output.default_format = Some("NOPE".into());
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(load_config(tmp.path()).unwrap(), MagickConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            "[pool]\nmax_workers = 2\n\n[output]\ndefault_format = \"JPEG\"\n",
        )
        .unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.pool.max_workers, Some(2));
        assert_eq!(config.pool.thread_name, "magick-worker");
        assert_eq!(config.output.default_format.as_deref(), Some("JPEG"));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "[pool\n").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "[pool]\nmax_workers = 0\n").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn load_raw_config_returns_none_when_no_file() {
        let tmp = TempDir::new().unwrap();
        assert!(load_raw_config(&tmp.path().join(CONFIG_FILE)).unwrap().is_none());
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: MagickConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, MagickConfig::default());
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        assert!(content.contains("[pool]"));
        assert!(content.contains("[output]"));
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value().unwrap();
        assert!(val.is_table());
        assert!(val.get("pool").is_some());
        assert!(val.get("output").is_some());
    }
}
