//! `ADVLOG_*` environment overrides for the `logging` section.

use crate::schema::{AdvlogConfig, LoggingConfig};
use anyhow::{bail, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

pub const ENV_LEVEL: &str = "ADVLOG_LEVEL";
pub const ENV_NAME_PREFIX: &str = "ADVLOG_NAME_PREFIX";
pub const ENV_PROJECT_DIR_NAME: &str = "ADVLOG_PROJECT_DIR_NAME";
pub const ENV_STREAM: &str = "ADVLOG_STREAM";
pub const ENV_FILE: &str = "ADVLOG_FILE";
pub const ENV_TESTING: &str = "ADVLOG_TESTING";

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: AdvlogConfig) -> Result<AdvlogConfig> {
    apply_env_overrides_with(config, &std::env::vars().collect())
}

/// Apply overrides from `env`. Set variables replace file values; empty ones
/// are ignored.
pub fn apply_env_overrides_with(
    mut config: AdvlogConfig,
    env: &HashMap<String, String>,
) -> Result<AdvlogConfig> {
    let get = |key: &str| env.get(key).filter(|v| !v.is_empty()).cloned();
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);

    if let Some(level) = get(ENV_LEVEL) {
        logging.level = Some(level);
    }
    if let Some(prefix) = get(ENV_NAME_PREFIX) {
        logging.name_prefix = Some(prefix);
    }
    if let Some(dir) = get(ENV_PROJECT_DIR_NAME) {
        logging.project_dir_name = Some(dir);
    }
    if let Some(stream) = get(ENV_STREAM) {
        logging.stream = Some(stream);
    }
    if let Some(file) = get(ENV_FILE) {
        logging.file = Some(PathBuf::from(file));
    }
    if let Some(testing) = get(ENV_TESTING) {
        logging.testing = Some(parse_flag(&testing)?);
    }

    debug!(?logging, "Applied environment overrides");
    Ok(config)
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("{ENV_TESTING} must be a boolean, got '{other}'"),
    }
}
