//! Registered loggers and the record builder.
//!
//! Every log method follows the same path: level gate, sampling gate,
//! envelope, JSON encoding (falling back to the message's string form), then
//! emission through the configured [`Emitter`](crate::Emitter). Nothing on
//! this path returns an error to the caller.

use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, Weak};

use tracing::warn;

use advlog_core::{Level, LogError};

use crate::context::{Registry, remove_registered};
use crate::emitter::EmitRecord;
use crate::encoder::encode;
use crate::exception::Exception;
use crate::record::{
    ENCODE_FAILURE_MSG, ExceptionArg, ExceptionEnvelope, LogEnvelope, LogOptions, Traceback,
};
use crate::settings::{Hook, Settings};
use crate::traceback::format_traceback;
use crate::value::LogValue;

/// Level an exception record must be enabled for, and is emitted at.
pub const EXCEPTION_LEVEL: Level = Level::CRITICAL;

struct LoggerState {
    level: Level,
    disabled: bool,
    testing_hook: Option<Hook>,
    debug_hook: Option<Hook>,
}

pub struct Logger {
    name: String,
    state: RwLock<LoggerState>,
    settings: Arc<RwLock<Settings>>,
    registry: Weak<Mutex<Registry>>,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level", &state.level)
            .field("disabled", &state.disabled)
            .finish()
    }
}

impl Logger {
    pub(crate) fn new(
        name: String,
        level: Level,
        settings: Arc<RwLock<Settings>>,
        registry: Weak<Mutex<Registry>>,
    ) -> Self {
        let (testing_hook, debug_hook) = {
            let settings = settings.read().unwrap_or_else(PoisonError::into_inner);
            (settings.testing_hook(), settings.debug_hook())
        };
        Self {
            name,
            state: RwLock::new(LoggerState {
                level,
                disabled: false,
                testing_hook,
                debug_hook,
            }),
            settings,
            registry,
        }
    }

    fn state(&self) -> RwLockReadGuard<'_, LoggerState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn update_state(&self, f: impl FnOnce(&mut LoggerState)) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut state);
    }

    fn settings(&self) -> RwLockReadGuard<'_, Settings> {
        self.settings.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Full name, including the prefix in effect at registration.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> Level {
        self.state().level
    }

    pub fn set_level(&self, level: Level) {
        self.update_state(|state| state.level = level);
    }

    pub fn is_disabled(&self) -> bool {
        self.state().disabled
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.update_state(|state| state.disabled = disabled);
    }

    pub fn set_testing_hook(&self, hook: Option<Hook>) {
        self.update_state(|state| state.testing_hook = hook);
    }

    pub fn set_debug_hook(&self, hook: Option<Hook>) {
        self.update_state(|state| state.debug_hook = hook);
    }

    /// The logger's own level, or the global level when it is `NOTSET`.
    pub fn effective_level(&self) -> Level {
        match self.level() {
            Level::NOTSET => self.settings().log_level(),
            level => level,
        }
    }

    pub fn is_enabled_for(&self, level: Level) -> bool {
        !self.is_disabled() && level >= self.effective_level()
    }

    /// Remove this logger from its registry and disable it.
    pub fn deregister(&self) -> Result<(), LogError> {
        let Some(registry) = self.registry.upgrade() else {
            return Err(LogError::NotFound(format!(
                "logger '{}' belongs to a dropped context",
                self.name
            )));
        };
        remove_registered(&registry, self)
    }

    // -----------------------------------------------------------------------
    // Leveled helpers
    // -----------------------------------------------------------------------

    pub fn debug(&self, msg: impl Into<LogValue>) -> Option<String> {
        self.debug_with(msg, &LogOptions::default())
    }

    pub fn debug_with(&self, msg: impl Into<LogValue>, options: &LogOptions) -> Option<String> {
        if !self.is_enabled_for(Level::DEBUG) {
            return None;
        }
        let msg = msg.into();
        let hook = self.state().debug_hook.clone();
        if let Some(hook) = hook {
            hook(&msg);
        }
        self.log_value(Level::DEBUG, msg, options)
    }

    pub fn info(&self, msg: impl Into<LogValue>) -> Option<String> {
        self.info_with(msg, &LogOptions::default())
    }

    pub fn info_with(&self, msg: impl Into<LogValue>, options: &LogOptions) -> Option<String> {
        self.leveled(Level::INFO, msg.into(), options)
    }

    pub fn warning(&self, msg: impl Into<LogValue>) -> Option<String> {
        self.warning_with(msg, &LogOptions::default())
    }

    pub fn warning_with(&self, msg: impl Into<LogValue>, options: &LogOptions) -> Option<String> {
        self.leveled(Level::WARNING, msg.into(), options)
    }

    pub fn warn(&self, msg: impl Into<LogValue>) -> Option<String> {
        self.warning(msg)
    }

    pub fn warn_with(&self, msg: impl Into<LogValue>, options: &LogOptions) -> Option<String> {
        self.warning_with(msg, options)
    }

    pub fn error(&self, msg: impl Into<LogValue>) -> Option<String> {
        self.error_with(msg, &LogOptions::default())
    }

    pub fn error_with(&self, msg: impl Into<LogValue>, options: &LogOptions) -> Option<String> {
        self.leveled(Level::ERROR, msg.into(), options)
    }

    pub fn critical(&self, msg: impl Into<LogValue>) -> Option<String> {
        self.critical_with(msg, &LogOptions::default())
    }

    pub fn critical_with(&self, msg: impl Into<LogValue>, options: &LogOptions) -> Option<String> {
        self.leveled(Level::CRITICAL, msg.into(), options)
    }

    fn leveled(&self, level: Level, msg: LogValue, options: &LogOptions) -> Option<String> {
        if !self.is_enabled_for(level) {
            return None;
        }
        self.log_value(level, msg, options)
    }

    // -----------------------------------------------------------------------
    // Record builder
    // -----------------------------------------------------------------------

    pub fn log(&self, level: Level, msg: impl Into<LogValue>) -> Option<String> {
        self.log_with(level, msg, &LogOptions::default())
    }

    /// Log `msg` at `level`. Returns the rendered record if `return_it` is set
    /// and the record passed the level and sampling gates.
    pub fn log_with(&self, level: Level, msg: impl Into<LogValue>, options: &LogOptions) -> Option<String> {
        self.log_value(level, msg.into(), options)
    }

    fn log_value(&self, level: Level, msg: LogValue, options: &LogOptions) -> Option<String> {
        let testing_hook = self.state().testing_hook.clone();
        if let Some(hook) = testing_hook {
            if self.settings().is_testing() {
                hook(&msg);
            }
        }

        if !self.is_enabled_for(level) || !options.sampling.should_log() {
            return None;
        }

        let mut envelope = LogEnvelope::new(self.name.as_str(), level, msg);
        let rendered = match encode(&envelope, None) {
            Ok(rendered) => rendered,
            Err(err) => {
                self.exception_with(
                    Exception::from_error(&err),
                    Some(ENCODE_FAILURE_MSG),
                    &LogOptions::default(),
                );
                envelope.msg = LogValue::Str(envelope.msg.to_string());
                encode(&envelope, None).unwrap_or_else(|err| {
                    warn!(logger = %self.name, error = %err, "Log record could not be encoded");
                    String::new()
                })
            }
        };

        if options.log_it {
            let emitter = self.settings().emitter();
            emitter.emit(&EmitRecord {
                logger: &self.name,
                level,
                message: &rendered,
                args: &options.args,
                exc_info: options.exc_info.as_ref(),
                extra: options.extra.as_ref(),
                stack_info: options.stack_info,
            });
        }

        options.return_it.then_some(rendered)
    }

    // -----------------------------------------------------------------------
    // Exception records
    // -----------------------------------------------------------------------

    pub fn exception<'a>(&self, e: impl Into<ExceptionArg<'a>>) -> Option<ExceptionEnvelope> {
        self.exception_with(e, None, &LogOptions::default())
    }

    /// Log an exception as `{"e", "traceback", "msg"}`. Gated on
    /// [`EXCEPTION_LEVEL`] regardless of any other level; returns the
    /// structured envelope when `return_it` is set.
    pub fn exception_with<'a>(
        &self,
        e: impl Into<ExceptionArg<'a>>,
        msg: Option<&str>,
        options: &LogOptions,
    ) -> Option<ExceptionEnvelope> {
        if !self.is_enabled_for(EXCEPTION_LEVEL) || !options.sampling.should_log() {
            return None;
        }

        let e = e.into();
        let traceback = match &e {
            ExceptionArg::Exception(exc) => {
                let project_dir_name = self.settings().project_dir_name().map(str::to_owned);
                Traceback::Formatted(format_traceback(
                    exc.format_exception(),
                    project_dir_name.as_deref(),
                ))
            }
            ExceptionArg::None | ExceptionArg::Message(_) => Traceback::NotProvided,
        };

        let envelope = ExceptionEnvelope {
            e: e.describe(),
            traceback,
            msg: msg.map(str::to_owned),
        };

        if options.log_it {
            match encode(&envelope, options.indent) {
                Ok(rendered) => {
                    let emitter = self.settings().emitter();
                    emitter.emit(&EmitRecord {
                        logger: &self.name,
                        level: EXCEPTION_LEVEL,
                        message: &rendered,
                        args: &options.args,
                        exc_info: None,
                        extra: None,
                        stack_info: false,
                    });
                }
                Err(err) => {
                    warn!(logger = %self.name, error = %err, "Exception record could not be encoded");
                }
            }
        }

        options.return_it.then_some(envelope)
    }

    /// Alias of [`Logger::exception_with`].
    pub fn log_exception_info<'a>(
        &self,
        e: impl Into<ExceptionArg<'a>>,
        msg: Option<&str>,
        options: &LogOptions,
    ) -> Option<ExceptionEnvelope> {
        self.exception_with(e, msg, options)
    }
}
