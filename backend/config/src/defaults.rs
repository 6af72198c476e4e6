//! Config defaults applied after loading.

use crate::schema::{AdvlogConfig, LoggingConfig};

/// Default level name.
pub const DEFAULT_LEVEL: &str = "debug";

/// Default stream name.
pub const DEFAULT_STREAM: &str = "stdout";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: AdvlogConfig) -> AdvlogConfig {
    apply_logging_defaults(config)
}

fn apply_logging_defaults(mut config: AdvlogConfig) -> AdvlogConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    if logging.level.is_none() {
        logging.level = Some(DEFAULT_LEVEL.to_string());
    }
    if logging.stream.is_none() {
        logging.stream = Some(DEFAULT_STREAM.to_string());
    }
    config
}
