//! Config file schema.
//!
//! ```yaml
//! logging:
//!   level: info
//!   namePrefix: "svc."
//!   projectDirName: myproject
//!   stream: stdout
//!   file: /var/log/app.log
//!   testing: false
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Root of the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvlogConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Level name (`debug`, `info`, ...) or number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_dir_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<String>, // "stdout" | "stderr" | "none"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub testing: Option<bool>,
}

/// Parsed value of `logging.stream`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamTarget {
    Stdout,
    Stderr,
    None,
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown stream '{0}'. Use 'stdout', 'stderr', or 'none'")]
pub struct UnknownStreamError(pub String);

impl FromStr for StreamTarget {
    type Err = UnknownStreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdout" => Ok(StreamTarget::Stdout),
            "stderr" => Ok(StreamTarget::Stderr),
            "none" | "off" => Ok(StreamTarget::None),
            _ => Err(UnknownStreamError(s.to_string())),
        }
    }
}

impl fmt::Display for StreamTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StreamTarget::Stdout => "stdout",
            StreamTarget::Stderr => "stderr",
            StreamTarget::None => "none",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_yaml() {
        let yaml = "logging:\n  level: info\n  namePrefix: svc.\n  projectDirName: app\n  stream: stderr\n  testing: true\n";
        let config: AdvlogConfig = serde_yaml::from_str(yaml).unwrap();
        let logging = config.logging.unwrap();
        assert_eq!(logging.level.as_deref(), Some("info"));
        assert_eq!(logging.name_prefix.as_deref(), Some("svc."));
        assert_eq!(logging.project_dir_name.as_deref(), Some("app"));
        assert_eq!(logging.testing, Some(true));
        assert!(logging.file.is_none());
    }

    #[test]
    fn stream_names() {
        assert_eq!("STDOUT".parse::<StreamTarget>().unwrap(), StreamTarget::Stdout);
        assert_eq!("none".parse::<StreamTarget>().unwrap(), StreamTarget::None);
        assert!("syslog".parse::<StreamTarget>().is_err());
        assert_eq!(StreamTarget::Stderr.to_string(), "stderr");
    }
}
