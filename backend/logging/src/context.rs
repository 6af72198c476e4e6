//! Logger context: shared settings plus the registry of named loggers.
//!
//! A [`LoggerContext`] is a cheap handle; clones share the same settings and
//! registry. Loggers hold the settings directly and the registry weakly, so
//! dropping every context handle releases the registry.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError, RwLock};

use regex::Regex;
use tracing::debug;

use advlog_core::{Level, LogError};

use crate::logger::Logger;
use crate::settings::{Settings, SettingsUpdate};

pub(crate) type Registry = HashMap<String, Arc<Logger>>;

static GLOBAL: LazyLock<LoggerContext> = LazyLock::new(LoggerContext::new);

/// Selects loggers for [`LoggerContext::clear_all`]. Empty filters count as
/// absent; with none set every logger matches. Names are matched with their
/// prefix.
#[derive(Debug, Clone, Default)]
pub struct ClearFilter {
    pub exact: Option<String>,
    pub substring: Option<String>,
    pub regex: Option<Regex>,
}

impl ClearFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn exact(name: impl Into<String>) -> Self {
        Self {
            exact: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn substring(needle: impl Into<String>) -> Self {
        Self {
            substring: Some(needle.into()),
            ..Default::default()
        }
    }

    pub fn regex(pattern: Regex) -> Self {
        Self {
            regex: Some(pattern),
            ..Default::default()
        }
    }

    fn exact_name(&self) -> Option<&str> {
        self.exact.as_deref().filter(|s| !s.is_empty())
    }

    fn needle(&self) -> Option<&str> {
        self.substring.as_deref().filter(|s| !s.is_empty())
    }

    fn validate(&self) -> Result<(), LogError> {
        if self.needle().is_some() && self.regex.is_some() {
            return Err(LogError::InvalidArgument(
                "can't use both substring and regex filters".to_string(),
            ));
        }
        Ok(())
    }

    fn matches(&self, name: &str) -> bool {
        if let Some(exact) = self.exact_name() {
            name == exact
        } else if let Some(needle) = self.needle() {
            name.contains(needle)
        } else if let Some(re) = &self.regex {
            re.is_match(name)
        } else {
            true
        }
    }
}

#[derive(Clone, Default)]
pub struct LoggerContext {
    settings: Arc<RwLock<Settings>>,
    registry: Arc<Mutex<Registry>>,
}

impl std::fmt::Debug for LoggerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggerContext")
            .field("settings", &self.settings())
            .field("loggers", &self.registered_names())
            .finish()
    }
}

impl LoggerContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide context, created on first use.
    pub fn global() -> &'static LoggerContext {
        &GLOBAL
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the current settings.
    pub fn settings(&self) -> Settings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn global_level(&self) -> Level {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .log_level()
    }

    /// Apply a settings update, pushing replaced hooks and a supplied level to
    /// live loggers when `update_existing` is set.
    pub fn initialize(&self, update: SettingsUpdate) -> Result<(), LogError> {
        let update_existing = update.update_existing;
        let new_level = update.global_log_level;
        let changes = self
            .settings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .apply(update)?;

        if update_existing {
            for logger in self.registry().values() {
                if let Some(level) = new_level {
                    logger.set_level(level);
                }
                if let Some(hook) = &changes.testing_hook {
                    logger.set_testing_hook(hook.clone());
                }
                if let Some(hook) = &changes.debug_hook {
                    logger.set_debug_hook(hook.clone());
                }
            }
        }

        debug!(update_existing, "Logger settings updated");
        Ok(())
    }

    /// Change the default level, and optionally every registered logger's level.
    pub fn set_global_level(&self, level: Level, update_existing: bool) {
        self.settings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set_log_level(level);

        if update_existing {
            for logger in self.registry().values() {
                logger.set_level(level);
            }
        }
    }

    /// Get or create the logger named `name` (with the current prefix). The
    /// logger is re-enabled and its level reset to `level`, or the global
    /// level when `level` is absent or `NOTSET`.
    pub fn register(&self, name: &str, level: Option<Level>) -> Result<Arc<Logger>, LogError> {
        if name.is_empty() {
            return Err(LogError::InvalidArgument(
                "logger name must not be empty".to_string(),
            ));
        }

        let (full_name, global_level) = {
            let settings = self.settings.read().unwrap_or_else(PoisonError::into_inner);
            (format!("{}{name}", settings.name_prefix()), settings.log_level())
        };
        let level = level.filter(|l| *l != Level::NOTSET).unwrap_or(global_level);

        let logger = {
            let mut registry = self.registry();
            Arc::clone(registry.entry(full_name.clone()).or_insert_with(|| {
                debug!(logger = %full_name, "Registered logger");
                Arc::new(Logger::new(
                    full_name.clone(),
                    level,
                    Arc::clone(&self.settings),
                    Arc::downgrade(&self.registry),
                ))
            }))
        };

        logger.set_disabled(false);
        logger.set_level(level);
        Ok(logger)
    }

    /// Look up a registered logger by its unprefixed name.
    pub fn get(&self, name: &str) -> Result<Arc<Logger>, LogError> {
        let full_name = self.prefixed(name);
        self.registry()
            .get(&full_name)
            .cloned()
            .ok_or_else(|| not_found(&full_name))
    }

    pub fn deregister(&self, logger: &Logger) -> Result<(), LogError> {
        remove_registered(&self.registry, logger)
    }

    /// Deregister by unprefixed name.
    pub fn deregister_name(&self, name: &str) -> Result<(), LogError> {
        let full_name = self.prefixed(name);
        let logger = self.registry().remove(&full_name).ok_or_else(|| not_found(&full_name))?;
        logger.set_disabled(true);
        debug!(logger = %full_name, "Deregistered logger");
        Ok(())
    }

    /// Deregister every logger the filter matches. Returns how many were removed.
    pub fn clear_all(&self, filter: &ClearFilter) -> Result<usize, LogError> {
        filter.validate()?;

        let removed: Vec<Arc<Logger>> = {
            let mut registry = self.registry();
            let names: Vec<String> = registry
                .keys()
                .filter(|name| filter.matches(name))
                .cloned()
                .collect();
            names.iter().filter_map(|name| registry.remove(name)).collect()
        };

        for logger in &removed {
            logger.set_disabled(true);
        }
        debug!(count = removed.len(), "Cleared loggers");
        Ok(removed.len())
    }

    /// Full names of all registered loggers, sorted.
    pub fn registered_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registry().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.registry().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry().is_empty()
    }

    fn prefixed(&self, name: &str) -> String {
        let settings = self.settings.read().unwrap_or_else(PoisonError::into_inner);
        format!("{}{name}", settings.name_prefix())
    }
}

/// Remove `logger` if it is the instance registered under its name, then disable it.
pub(crate) fn remove_registered(registry: &Mutex<Registry>, logger: &Logger) -> Result<(), LogError> {
    let mut registry = registry.lock().unwrap_or_else(PoisonError::into_inner);
    let is_registered = registry
        .get(logger.name())
        .is_some_and(|entry| std::ptr::eq(Arc::as_ptr(entry), logger));
    if !is_registered {
        return Err(not_found(logger.name()));
    }
    registry.remove(logger.name());
    drop(registry);

    logger.set_disabled(true);
    debug!(logger = %logger.name(), "Deregistered logger");
    Ok(())
}

fn not_found(name: &str) -> LogError {
    LogError::NotFound(format!("Could not find logger matching name {name}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::StreamDestination;

    fn quiet_context() -> LoggerContext {
        let ctx = LoggerContext::new();
        ctx.initialize(SettingsUpdate::new().log_stream_destination(StreamDestination::Disabled))
            .unwrap();
        ctx
    }

    fn register_all(ctx: &LoggerContext, names: &[&str]) {
        for name in names {
            ctx.register(name, None).unwrap();
        }
    }

    #[test]
    fn register_is_idempotent_until_deregistered() {
        let ctx = quiet_context();
        let first = ctx.register("test_logger", None).unwrap();
        let again = ctx.register("test_logger", None).unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(ctx.len(), 1);

        first.deregister().unwrap();
        assert!(first.is_disabled());
        let fresh = ctx.register("test_logger", None).unwrap();
        assert!(!Arc::ptr_eq(&first, &fresh));
        assert!(!fresh.is_disabled());
    }

    #[test]
    fn re_registering_resets_level_and_enables() {
        let ctx = quiet_context();
        let logger = ctx.register("svc", Some(Level::ERROR)).unwrap();
        logger.set_disabled(true);

        ctx.set_global_level(Level::WARNING, false);
        let same = ctx.register("svc", Some(Level::NOTSET)).unwrap();
        assert!(Arc::ptr_eq(&logger, &same));
        assert_eq!(same.level(), Level::WARNING);
        assert!(!same.is_disabled());
    }

    #[test]
    fn empty_name_is_rejected() {
        let ctx = quiet_context();
        assert!(matches!(ctx.register("", None), Err(LogError::InvalidArgument(_))));
    }

    #[test]
    fn deregistering_unknown_loggers_fails() {
        let ctx = quiet_context();
        let logger = ctx.register("once", None).unwrap();
        ctx.deregister(&logger).unwrap();

        assert!(matches!(ctx.deregister(&logger), Err(LogError::NotFound(_))));
        assert!(matches!(logger.deregister(), Err(LogError::NotFound(_))));
        let err = ctx.deregister_name("never").unwrap_err();
        assert_eq!(err.to_string(), "not found: Could not find logger matching name never");
    }

    #[test]
    fn stale_handle_does_not_remove_newer_logger() {
        let ctx = quiet_context();
        let stale = ctx.register("shared", None).unwrap();
        ctx.deregister_name("shared").unwrap();
        let current = ctx.register("shared", None).unwrap();

        assert!(stale.deregister().is_err());
        assert_eq!(ctx.get("shared").unwrap().name(), current.name());
        assert!(!current.is_disabled());
    }

    #[test]
    fn clear_all_by_substring() {
        let ctx = quiet_context();
        register_all(&ctx, &["test1", "test2", "test3", "foobar3", "foobar4", "leftover"]);

        assert_eq!(ctx.clear_all(&ClearFilter::substring("test")).unwrap(), 3);
        assert_eq!(ctx.registered_names(), vec!["foobar3", "foobar4", "leftover"]);
        assert_eq!(ctx.clear_all(&ClearFilter::substring("foobar")).unwrap(), 2);
        assert_eq!(ctx.registered_names(), vec!["leftover"]);
    }

    #[test]
    fn clear_all_by_exact_and_regex() {
        let ctx = quiet_context();
        register_all(&ctx, &["api", "api.v1", "api.v2", "worker"]);

        assert_eq!(ctx.clear_all(&ClearFilter::exact("api")).unwrap(), 1);
        let pattern = Regex::new(r"^api\.v\d$").unwrap();
        assert_eq!(ctx.clear_all(&ClearFilter::regex(pattern)).unwrap(), 2);
        assert_eq!(ctx.registered_names(), vec!["worker"]);
    }

    #[test]
    fn exact_filter_takes_precedence() {
        let ctx = quiet_context();
        register_all(&ctx, &["alpha", "alphabet"]);
        let filter = ClearFilter {
            exact: Some("alpha".into()),
            substring: Some("alph".into()),
            regex: None,
        };

        assert_eq!(ctx.clear_all(&filter).unwrap(), 1);
        assert_eq!(ctx.registered_names(), vec!["alphabet"]);
    }

    #[test]
    fn clear_all_without_filters_removes_everything() {
        let ctx = quiet_context();
        register_all(&ctx, &["a", "b"]);
        let a = ctx.get("a").unwrap();

        let filter = ClearFilter {
            substring: Some(String::new()),
            ..ClearFilter::all()
        };
        assert_eq!(ctx.clear_all(&filter).unwrap(), 2);
        assert!(ctx.is_empty());
        assert!(a.is_disabled());
    }

    #[test]
    fn conflicting_filters_change_nothing() {
        let ctx = quiet_context();
        register_all(&ctx, &["test1", "test2"]);
        let filter = ClearFilter {
            substring: Some("test".into()),
            regex: Some(Regex::new("test").unwrap()),
            ..Default::default()
        };

        assert!(matches!(ctx.clear_all(&filter), Err(LogError::InvalidArgument(_))));
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn prefixed_lookup() {
        let ctx = quiet_context();
        ctx.initialize(SettingsUpdate::new().global_log_name_prefix("app."))
            .unwrap();
        ctx.register("db", None).unwrap();

        assert_eq!(ctx.registered_names(), vec!["app.db"]);
        assert_eq!(ctx.get("db").unwrap().name(), "app.db");
        ctx.deregister_name("db").unwrap();
        assert!(ctx.is_empty());
    }

    #[test]
    fn global_context_is_shared() {
        let a = LoggerContext::global();
        let b = LoggerContext::global();
        assert!(Arc::ptr_eq(&a.registry, &b.registry));
    }

    #[test]
    fn dropping_the_context_orphans_loggers() {
        let logger = {
            let ctx = quiet_context();
            ctx.register("orphan", None).unwrap()
        };
        assert!(matches!(logger.deregister(), Err(LogError::NotFound(_))));
    }
}
