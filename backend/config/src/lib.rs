//! `advlog-config`: settings file support for advlog.
//!
//! Provides:
//! - Typed YAML schema for the `logging` section
//! - `${ENV_VAR}` substitution
//! - `ADVLOG_*` environment overrides
//! - Default value application
//! - Validation

pub mod defaults;
pub mod env;
pub mod io;
pub mod overrides;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{contains_env_var_reference, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_config, write_config};
pub use overrides::{apply_env_overrides, apply_env_overrides_with};
pub use schema::{AdvlogConfig, LoggingConfig, StreamTarget, UnknownStreamError};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::Path;

/// Load a config file and prepare it for use with the process environment.
pub fn load_and_prepare(path: &Path) -> Result<AdvlogConfig> {
    load_and_prepare_with(path, &std::env::vars().collect())
}

/// Load, substitute env vars, apply overrides and defaults, then validate.
/// Validation errors fail the load; warnings are logged.
pub fn load_and_prepare_with(path: &Path, env: &HashMap<String, String>) -> Result<AdvlogConfig> {
    let raw_config = load_config(path)?;

    let value = serde_json::to_value(&raw_config)
        .context("Failed to serialize config for processing")?;
    let value = resolve_env_vars_with(&value, env).context("Failed to resolve env vars in config")?;
    let config: AdvlogConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;

    let config = apply_env_overrides_with(config, env)?;
    let config = apply_all_defaults(config);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if let Some(first) = report.errors.into_iter().next() {
        bail!(first);
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn full_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "logging:\n  namePrefix: \"${SERVICE}.\"\n  projectDirName: myproject\n",
        )
        .unwrap();

        let config = load_and_prepare_with(
            &path,
            &env(&[("SERVICE", "billing"), ("ADVLOG_STREAM", "stderr")]),
        )
        .unwrap();

        let logging = config.logging.unwrap();
        assert_eq!(logging.name_prefix.as_deref(), Some("billing."));
        assert_eq!(logging.project_dir_name.as_deref(), Some("myproject"));
        assert_eq!(logging.stream.as_deref(), Some("stderr"));
        assert_eq!(logging.level.as_deref(), Some(defaults::DEFAULT_LEVEL));
    }

    #[test]
    fn missing_file_gets_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_and_prepare_with(&dir.path().join("config.yaml"), &HashMap::new()).unwrap();
        let logging = config.logging.unwrap();
        assert_eq!(logging.level.as_deref(), Some("debug"));
        assert_eq!(logging.stream.as_deref(), Some("stdout"));
    }

    #[test]
    fn invalid_override_fails_the_load() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_and_prepare_with(
            &dir.path().join("config.yaml"),
            &env(&[("ADVLOG_LEVEL", "shouting")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("logging.level"));
    }
}
