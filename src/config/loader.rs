// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::DEFAULT_YIELD_INTERVAL;
use crate::errors::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Engine configuration applied to a pipeline run.
///
/// Every field is optional in the file; omitted fields fall back to the
/// sequential executor with lenient routing.
///
/// # Example
/// ```yaml
/// mode: concurrent
/// routing: strict
/// options:
///   yield_interval: 128
/// ```
///
/// or, equivalently, in TOML:
/// ```toml
/// mode = "concurrent"
/// routing = "strict"
///
/// [options]
/// yield_interval = 128
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    #[serde(default)]
    pub mode: ExecutionMode,
    #[serde(default)]
    pub routing: RoutingMode,
    #[serde(default)]
    pub options: EngineOptions,
}

/// How the engine schedules unit invocations.
///
/// # Variants
/// * `Sequential` - One step at a time on a single task, deterministic breadth-first order
/// * `Concurrent` - One sequential worker per independent source-to-sink component
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    Sequential,
    Concurrent,
}

/// What happens to a record whose relationship has no consumer.
///
/// # Variants
/// * `Lenient` - The record is dropped and counted
/// * `Strict` - The run fails with an `UnroutedOutputError`
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoutingMode {
    #[default]
    Lenient,
    Strict,
}

/// Executor tuning knobs.
///
/// # Fields
/// * `yield_interval` - Steps between cooperative yields to the runtime (optional, defaults to 64)
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct EngineOptions {
    pub yield_interval: Option<usize>,
}

impl EngineOptions {
    pub fn yield_interval(&self) -> usize {
        self.yield_interval.unwrap_or(DEFAULT_YIELD_INTERVAL)
    }
}

impl EngineConfig {
    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.options.yield_interval == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "options.yield_interval",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Load a config from a YAML or TOML file, chosen by extension
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    let parse: fn(&str, &Path) -> Result<EngineConfig, ConfigError> = match extension.as_deref() {
        Some("yaml") | Some("yml") => |content, path| {
            serde_yaml::from_str(content).map_err(|source| ConfigError::Yaml {
                path: path.to_path_buf(),
                source,
            })
        },
        Some("toml") => |content, path| {
            toml::from_str(content).map_err(|source| ConfigError::Toml {
                path: path.to_path_buf(),
                source,
            })
        },
        _ => {
            return Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    };

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse(&content, path)
}

/// Load a config and reject invalid values
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let cfg = load_config(path)?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new()
            .suffix(suffix)
            .tempfile()
            .expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write temp file");
        file
    }

    #[test]
    fn test_load_yaml_config() {
        let file = write_temp(
            ".yaml",
            "mode: concurrent\nrouting: strict\noptions:\n  yield_interval: 8\n",
        );

        let cfg = load_config(file.path()).expect("YAML config should load");
        assert_eq!(cfg.mode, ExecutionMode::Concurrent);
        assert_eq!(cfg.routing, RoutingMode::Strict);
        assert_eq!(cfg.options.yield_interval(), 8);
    }

    #[test]
    fn test_load_toml_config() {
        let file = write_temp(".toml", "routing = \"strict\"\n");

        let cfg = load_config(file.path()).expect("TOML config should load");
        assert_eq!(cfg.mode, ExecutionMode::Sequential);
        assert_eq!(cfg.routing, RoutingMode::Strict);
        assert_eq!(cfg.options.yield_interval(), DEFAULT_YIELD_INTERVAL);
    }

    #[test]
    fn test_empty_yaml_mapping_uses_defaults() {
        let file = write_temp(".yml", "{}\n");

        let cfg = load_config(file.path()).expect("Empty config should load");
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let file = write_temp(".yaml", "mode: hybrid\n");

        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn test_unsupported_extension() {
        let file = write_temp(".json", "{}");

        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat { .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = load_config("/definitely/not/here.yaml");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_zero_yield_interval_fails_validation() {
        let file = write_temp(".yaml", "options:\n  yield_interval: 0\n");

        let result = load_and_validate_config(file.path());
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                field: "options.yield_interval",
                ..
            })
        ));
    }
}
