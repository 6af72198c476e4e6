//! Record emission.
//!
//! An [`Emitter`] is the host primitive a logger hands its rendered JSON to.
//! [`WriterEmitter`] writes one line per record to the configured stream and
//! file; [`TracingEmitter`] forwards records into `tracing`.

use std::backtrace::Backtrace;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

use advlog_core::{Level, LogError};

use crate::exception::Exception;
use crate::value::LogValue;

/// Everything an emitter receives for one log call.
#[derive(Debug, Clone, Copy)]
pub struct EmitRecord<'a> {
    pub logger: &'a str,
    pub level: Level,
    /// Rendered JSON.
    pub message: &'a str,
    pub args: &'a [LogValue],
    pub exc_info: Option<&'a Exception>,
    pub extra: Option<&'a serde_json::Map<String, serde_json::Value>>,
    pub stack_info: bool,
}

pub trait Emitter: Send + Sync {
    fn emit(&self, record: &EmitRecord<'_>);
}

pub type SharedWriter = Arc<Mutex<dyn Write + Send>>;

/// Where the default emitter writes its stream output.
#[derive(Clone, Default)]
pub enum StreamDestination {
    #[default]
    Stdout,
    Stderr,
    Writer(SharedWriter),
    Disabled,
}

impl StreamDestination {
    pub fn writer<W: Write + Send + 'static>(writer: W) -> Self {
        StreamDestination::Writer(Arc::new(Mutex::new(writer)))
    }

    fn write_line(&self, text: &str) -> std::io::Result<()> {
        match self {
            StreamDestination::Stdout => std::io::stdout().lock().write_all(text.as_bytes()),
            StreamDestination::Stderr => std::io::stderr().lock().write_all(text.as_bytes()),
            StreamDestination::Writer(writer) => {
                let mut writer = writer.lock().unwrap_or_else(PoisonError::into_inner);
                writer.write_all(text.as_bytes())?;
                writer.flush()
            }
            StreamDestination::Disabled => Ok(()),
        }
    }
}

impl fmt::Debug for StreamDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamDestination::Stdout => f.write_str("Stdout"),
            StreamDestination::Stderr => f.write_str("Stderr"),
            StreamDestination::Writer(_) => f.write_str("Writer(..)"),
            StreamDestination::Disabled => f.write_str("Disabled"),
        }
    }
}

/// A log file opened for appending.
#[derive(Debug, Clone)]
pub struct FileDestination {
    path: PathBuf,
    file: Arc<Mutex<File>>,
}

impl FileDestination {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LogError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| LogError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&self, text: &str) -> std::io::Result<()> {
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.write_all(text.as_bytes())
    }
}

/// Default emitter: the rendered message on its own line.
#[derive(Debug, Clone, Default)]
pub struct WriterEmitter {
    stream: StreamDestination,
    file: Option<FileDestination>,
}

impl WriterEmitter {
    pub fn new(stream: StreamDestination, file: Option<FileDestination>) -> Self {
        Self { stream, file }
    }

    fn render(record: &EmitRecord<'_>) -> String {
        let mut text = record.message.to_string();
        if let Some(exc) = record.exc_info {
            text.push('\n');
            text.push_str(exc.format_exception().concat().trim_end());
        }
        if record.stack_info {
            text.push_str("\nStack (most recent call last):\n");
            text.push_str(Backtrace::force_capture().to_string().trim_end());
        }
        text.push('\n');
        text
    }
}

impl Emitter for WriterEmitter {
    fn emit(&self, record: &EmitRecord<'_>) {
        let text = Self::render(record);

        if let Err(e) = self.stream.write_line(&text) {
            warn!(logger = record.logger, error = %e, "Failed to write log record to stream");
        }
        if let Some(file) = &self.file {
            if let Err(e) = file.write_line(&text) {
                warn!(
                    logger = record.logger,
                    path = %file.path().display(),
                    error = %e,
                    "Failed to write log record to file"
                );
            }
        }
    }
}

/// Forwards records as `tracing` events under the `advlog` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEmitter;

impl Emitter for TracingEmitter {
    fn emit(&self, record: &EmitRecord<'_>) {
        let level_name = record.level.name();
        let extra = record
            .extra
            .map(|map| serde_json::Value::Object(map.clone()).to_string())
            .unwrap_or_default();
        let args = record
            .args
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");

        macro_rules! forward {
            ($lvl:expr) => {
                tracing::event!(
                    target: "advlog",
                    $lvl,
                    logger = record.logger,
                    level_name = %level_name,
                    args = %args,
                    extra = %extra,
                    "{}",
                    record.message
                )
            };
        }

        if record.level >= Level::ERROR {
            forward!(tracing::Level::ERROR);
        } else if record.level >= Level::WARNING {
            forward!(tracing::Level::WARN);
        } else if record.level >= Level::INFO {
            forward!(tracing::Level::INFO);
        } else if record.level >= Level::DEBUG {
            forward!(tracing::Level::DEBUG);
        } else {
            forward!(tracing::Level::TRACE);
        }
    }
}
