//! Config validation with user-friendly error messages.

use crate::schema::{AdvlogConfig, StreamTarget};
use advlog_core::Level;
use thiserror::Error;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &AdvlogConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_logging(config, &mut report);
    report
}

fn validate_logging(config: &AdvlogConfig, report: &mut ValidationReport) {
    let Some(logging) = &config.logging else { return };

    if let Some(level) = &logging.level {
        if let Err(e) = level.parse::<Level>() {
            report.error("logging.level", e.to_string());
        }
    }
    if let Some(stream) = &logging.stream {
        if let Err(e) = stream.parse::<StreamTarget>() {
            report.error("logging.stream", e.to_string());
        }
    }
    if let Some(prefix) = &logging.name_prefix {
        if !prefix.is_empty() && prefix.trim().is_empty() {
            report.warn("logging.namePrefix", "Name prefix is only whitespace");
        }
    }
    if let Some(dir) = &logging.project_dir_name {
        if dir.contains('/') || dir.contains('\\') {
            report.warn(
                "logging.projectDirName",
                "Project dir name should be a single path component",
            );
        }
    }
    if let Some(file) = &logging.file {
        if file.as_os_str().is_empty() {
            report.error("logging.file", "Log file path cannot be empty");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::LoggingConfig;

    fn with_logging(logging: LoggingConfig) -> AdvlogConfig {
        AdvlogConfig {
            logging: Some(logging),
        }
    }

    #[test]
    fn empty_config_is_valid() {
        let report = validate(&AdvlogConfig::default());
        assert!(report.is_valid(), "errors: {:?}", report.errors);
    }

    #[test]
    fn unknown_level_and_stream_are_errors() {
        let report = validate(&with_logging(LoggingConfig {
            level: Some("loud".into()),
            stream: Some("syslog".into()),
            ..Default::default()
        }));
        assert!(!report.is_valid());
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.errors[0].path, "logging.level");
        assert_eq!(report.errors[1].path, "logging.stream");
    }

    #[test]
    fn numeric_level_is_accepted() {
        let report = validate(&with_logging(LoggingConfig {
            level: Some("25".into()),
            ..Default::default()
        }));
        assert!(report.is_valid());
    }

    #[test]
    fn whitespace_prefix_is_a_warning() {
        let report = validate(&with_logging(LoggingConfig {
            name_prefix: Some("   ".into()),
            ..Default::default()
        }));
        assert!(report.is_valid());
        assert_eq!(report.warnings[0].path, "logging.namePrefix");
    }
}
