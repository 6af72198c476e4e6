//! JSON-structured logging with named loggers.
//!
//! Every record is a single JSON document: `{"meta": {...}, "msg": ...}` for
//! ordinary calls and `{"e", "traceback", "msg"}` for exceptions, where the
//! traceback is parsed into nested frames. Loggers live in a
//! [`LoggerContext`]; [`LoggerContext::global`] is the process-wide one.

pub mod context;
pub mod emitter;
pub mod encoder;
pub mod exception;
pub mod logger;
pub mod record;
pub mod sampling;
pub mod settings;
pub mod subscriber;
pub mod traceback;
pub mod value;

pub use advlog_core::{Level, LogError};
pub use context::{ClearFilter, LoggerContext};
pub use emitter::{
    EmitRecord, Emitter, FileDestination, SharedWriter, StreamDestination, TracingEmitter,
    WriterEmitter,
};
pub use encoder::{BSON_REGEX_SUPPORTED, encode};
pub use exception::{Exception, Frame};
pub use logger::{EXCEPTION_LEVEL, Logger};
pub use record::{
    ExceptionArg, ExceptionEnvelope, LogEnvelope, LogOptions, NO_EXCEPTION, Traceback,
};
pub use sampling::{Sampling, random_chance};
pub use settings::{Hook, IsTesting, Settings, SettingsUpdate};
pub use subscriber::init_tracing;
pub use traceback::{TraceBlock, TraceElement, TraceFrame, format_traceback, format_traceback_line};
pub use value::{LogValue, RegexValue};

/// Apply the `logging` section of the user's config file to the global context.
pub fn init_from_config() -> anyhow::Result<()> {
    let path = advlog_config::config_file_path(&advlog_config::config_dir());
    let config = advlog_config::load_and_prepare(&path)?;
    let update = SettingsUpdate::from_file_config(&config.logging.unwrap_or_default())?;
    LoggerContext::global().initialize(update)?;
    Ok(())
}
