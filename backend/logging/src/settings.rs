//! Process-wide logger settings and the update operation that mutates them.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use advlog_config::{LoggingConfig, StreamTarget};
use advlog_core::{Level, LogError};

use crate::emitter::{Emitter, FileDestination, StreamDestination, WriterEmitter};
use crate::value::LogValue;

/// Callback invoked with the message of a log call.
pub type Hook = Arc<dyn Fn(&LogValue) + Send + Sync>;

/// Level in effect before any settings update.
pub const DEFAULT_LOG_LEVEL: Level = Level::DEBUG;

/// Level restored by `reset_values_if_not_argument`.
pub const RESET_LOG_LEVEL: Level = Level::INFO;

/// Decides whether the testing hook should fire.
#[derive(Clone)]
pub enum IsTesting {
    Fixed(bool),
    Predicate(Arc<dyn Fn() -> bool + Send + Sync>),
}

impl IsTesting {
    pub fn predicate(f: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        IsTesting::Predicate(Arc::new(f))
    }

    pub fn check(&self) -> bool {
        match self {
            IsTesting::Fixed(value) => *value,
            IsTesting::Predicate(f) => f(),
        }
    }
}

impl Default for IsTesting {
    fn default() -> Self {
        IsTesting::Fixed(false)
    }
}

impl From<bool> for IsTesting {
    fn from(value: bool) -> Self {
        IsTesting::Fixed(value)
    }
}

impl fmt::Debug for IsTesting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IsTesting::Fixed(value) => write!(f, "Fixed({value})"),
            IsTesting::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

#[derive(Clone)]
pub struct Settings {
    log_level: Level,
    stream: StreamDestination,
    file: Option<FileDestination>,
    name_prefix: String,
    project_dir_name: Option<String>,
    is_testing: IsTesting,
    testing_hook: Option<Hook>,
    debug_hook: Option<Hook>,
    base_emitter: Option<Arc<dyn Emitter>>,
    writer: Arc<WriterEmitter>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL,
            stream: StreamDestination::default(),
            file: None,
            name_prefix: String::new(),
            project_dir_name: None,
            is_testing: IsTesting::default(),
            testing_hook: None,
            debug_hook: None,
            base_emitter: None,
            writer: Arc::new(WriterEmitter::default()),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("log_level", &self.log_level)
            .field("stream", &self.stream)
            .field("file", &self.file.as_ref().map(FileDestination::path))
            .field("name_prefix", &self.name_prefix)
            .field("project_dir_name", &self.project_dir_name)
            .field("is_testing", &self.is_testing)
            .field("testing_hook", &self.testing_hook.is_some())
            .field("debug_hook", &self.debug_hook.is_some())
            .field("base_emitter", &self.base_emitter.is_some())
            .finish()
    }
}

/// Which hooks an update replaced, for propagation to live loggers.
#[derive(Default)]
pub(crate) struct HookChanges {
    pub testing_hook: Option<Option<Hook>>,
    pub debug_hook: Option<Option<Hook>>,
}

impl Settings {
    pub fn log_level(&self) -> Level {
        self.log_level
    }

    pub fn name_prefix(&self) -> &str {
        &self.name_prefix
    }

    pub fn project_dir_name(&self) -> Option<&str> {
        self.project_dir_name.as_deref().filter(|dir| !dir.is_empty())
    }

    pub fn stream(&self) -> &StreamDestination {
        &self.stream
    }

    pub fn file(&self) -> Option<&FileDestination> {
        self.file.as_ref()
    }

    pub fn is_testing(&self) -> bool {
        self.is_testing.check()
    }

    pub fn testing_hook(&self) -> Option<Hook> {
        self.testing_hook.clone()
    }

    pub fn debug_hook(&self) -> Option<Hook> {
        self.debug_hook.clone()
    }

    pub(crate) fn set_log_level(&mut self, level: Level) {
        self.log_level = level;
    }

    /// The configured base emitter, or the writer over stream and file.
    pub fn emitter(&self) -> Arc<dyn Emitter> {
        match &self.base_emitter {
            Some(emitter) => Arc::clone(emitter),
            None => self.writer.clone() as Arc<dyn Emitter>,
        }
    }

    /// Apply an update. Each field is replaced if supplied, or reset to its
    /// default when `reset_values_if_not_argument` is set. The log file is
    /// opened before anything changes.
    pub(crate) fn apply(&mut self, update: SettingsUpdate) -> Result<HookChanges, LogError> {
        let reset = update.reset_values_if_not_argument;
        let file = match update.log_file_destination {
            Some(path) => Some(Some(FileDestination::open(path)?)),
            None if reset => Some(None),
            None => None,
        };

        let mut rebuild_writer = false;
        if let Some(stream) = update.log_stream_destination {
            self.stream = stream;
            rebuild_writer = true;
        } else if reset {
            self.stream = StreamDestination::default();
            rebuild_writer = true;
        }
        if let Some(file) = file {
            self.file = file;
            rebuild_writer = true;
        }
        if rebuild_writer {
            self.writer = Arc::new(WriterEmitter::new(self.stream.clone(), self.file.clone()));
        }

        if let Some(level) = update.global_log_level {
            self.log_level = level;
        } else if reset {
            self.log_level = RESET_LOG_LEVEL;
        }
        if update.global_log_name_prefix.is_some() || reset {
            self.name_prefix = update.global_log_name_prefix.unwrap_or_default();
        }
        if update.project_dir_name.is_some() || reset {
            self.project_dir_name = update.project_dir_name;
        }

        let mut changes = HookChanges::default();
        if update.testing_hook.is_some() || reset {
            self.testing_hook = update.testing_hook;
            changes.testing_hook = Some(self.testing_hook.clone());
        }
        if update.debug_hook.is_some() || reset {
            self.debug_hook = update.debug_hook;
            changes.debug_hook = Some(self.debug_hook.clone());
        }
        if update.is_testing.is_some() || reset {
            self.is_testing = update.is_testing.unwrap_or_default();
        }
        if update.base_emitter.is_some() || reset {
            self.base_emitter = update.base_emitter;
        }

        Ok(changes)
    }
}

/// Arguments to a settings update. Unset fields are left alone unless
/// `reset_values_if_not_argument` is true.
#[derive(Clone, Default)]
pub struct SettingsUpdate {
    pub global_log_level: Option<Level>,
    pub global_log_name_prefix: Option<String>,
    pub project_dir_name: Option<String>,
    pub log_stream_destination: Option<StreamDestination>,
    pub log_file_destination: Option<PathBuf>,
    pub is_testing: Option<IsTesting>,
    pub testing_hook: Option<Hook>,
    pub debug_hook: Option<Hook>,
    pub reset_values_if_not_argument: bool,
    /// Push replaced hooks to loggers that are already registered.
    pub update_existing: bool,
    pub base_emitter: Option<Arc<dyn Emitter>>,
}

impl SettingsUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global_log_level(mut self, level: Level) -> Self {
        self.global_log_level = Some(level);
        self
    }

    pub fn global_log_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.global_log_name_prefix = Some(prefix.into());
        self
    }

    pub fn project_dir_name(mut self, name: impl Into<String>) -> Self {
        self.project_dir_name = Some(name.into());
        self
    }

    pub fn log_stream_destination(mut self, stream: StreamDestination) -> Self {
        self.log_stream_destination = Some(stream);
        self
    }

    pub fn log_file_destination(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file_destination = Some(path.into());
        self
    }

    pub fn is_testing(mut self, is_testing: impl Into<IsTesting>) -> Self {
        self.is_testing = Some(is_testing.into());
        self
    }

    pub fn testing_hook(mut self, hook: impl Fn(&LogValue) + Send + Sync + 'static) -> Self {
        self.testing_hook = Some(Arc::new(hook));
        self
    }

    pub fn debug_hook(mut self, hook: impl Fn(&LogValue) + Send + Sync + 'static) -> Self {
        self.debug_hook = Some(Arc::new(hook));
        self
    }

    pub fn reset_values_if_not_argument(mut self, reset: bool) -> Self {
        self.reset_values_if_not_argument = reset;
        self
    }

    pub fn update_existing(mut self, update_existing: bool) -> Self {
        self.update_existing = update_existing;
        self
    }

    pub fn base_emitter(mut self, emitter: Arc<dyn Emitter>) -> Self {
        self.base_emitter = Some(emitter);
        self
    }

    /// Translate a loaded config file section into an update.
    pub fn from_file_config(config: &LoggingConfig) -> Result<Self, LogError> {
        let global_log_level = config
            .level
            .as_deref()
            .map(str::parse::<Level>)
            .transpose()
            .map_err(|e| LogError::Config(e.to_string()))?;

        let log_stream_destination = config
            .stream
            .as_deref()
            .map(str::parse::<StreamTarget>)
            .transpose()
            .map_err(|e| LogError::Config(e.to_string()))?
            .map(|target| match target {
                StreamTarget::Stdout => StreamDestination::Stdout,
                StreamTarget::Stderr => StreamDestination::Stderr,
                StreamTarget::None => StreamDestination::Disabled,
            });

        Ok(Self {
            global_log_level,
            global_log_name_prefix: config.name_prefix.clone(),
            project_dir_name: config.project_dir_name.clone(),
            log_stream_destination,
            log_file_destination: config.file.clone(),
            is_testing: config.testing.map(IsTesting::Fixed),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_fields_are_left_alone() {
        let mut settings = Settings::default();
        settings
            .apply(SettingsUpdate::new().global_log_name_prefix("svc.").project_dir_name("app"))
            .unwrap();
        settings
            .apply(SettingsUpdate::new().global_log_level(Level::WARNING))
            .unwrap();

        assert_eq!(settings.name_prefix(), "svc.");
        assert_eq!(settings.project_dir_name(), Some("app"));
        assert_eq!(settings.log_level(), Level::WARNING);
    }

    #[test]
    fn reset_restores_defaults() {
        let mut settings = Settings::default();
        settings
            .apply(
                SettingsUpdate::new()
                    .global_log_name_prefix("svc.")
                    .is_testing(true)
                    .log_stream_destination(StreamDestination::Stderr)
                    .debug_hook(|_| {}),
            )
            .unwrap();
        assert!(matches!(settings.stream(), StreamDestination::Stderr));

        let changes = settings
            .apply(SettingsUpdate::new().reset_values_if_not_argument(true))
            .unwrap();

        assert_eq!(settings.name_prefix(), "");
        assert_eq!(settings.log_level(), RESET_LOG_LEVEL);
        assert!(!settings.is_testing());
        assert!(settings.debug_hook().is_none());
        assert!(matches!(changes.debug_hook, Some(None)));
        assert!(matches!(settings.stream(), StreamDestination::Stdout));
    }

    #[test]
    fn predicate_is_evaluated_each_check() {
        let flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let observed = flag.clone();
        let mut settings = Settings::default();
        settings
            .apply(SettingsUpdate::new().is_testing(IsTesting::predicate(move || {
                observed.load(std::sync::atomic::Ordering::SeqCst)
            })))
            .unwrap();

        assert!(!settings.is_testing());
        flag.store(true, std::sync::atomic::Ordering::SeqCst);
        assert!(settings.is_testing());
    }

    #[test]
    fn bad_file_path_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        let result = settings.apply(
            SettingsUpdate::new()
                .global_log_level(Level::ERROR)
                .log_file_destination(dir.path().join("missing").join("app.log")),
        );

        assert!(result.is_err());
        assert_eq!(settings.log_level(), DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn file_config_translates_to_update() {
        let config = LoggingConfig {
            level: Some("warning".into()),
            stream: Some("none".into()),
            testing: Some(true),
            ..Default::default()
        };
        let update = SettingsUpdate::from_file_config(&config).unwrap();
        assert_eq!(update.global_log_level, Some(Level::WARNING));
        assert!(matches!(update.log_stream_destination, Some(StreamDestination::Disabled)));
        assert!(update.is_testing.unwrap().check());

        let bad = LoggingConfig {
            level: Some("loud".into()),
            ..Default::default()
        };
        assert!(matches!(SettingsUpdate::from_file_config(&bad), Err(LogError::Config(_))));
    }
}
