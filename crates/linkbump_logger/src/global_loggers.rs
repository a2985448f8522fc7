use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, OnceLock, PoisonError},
};

use crate::{
    log_errors::LogError,
    log_level::LogLevel,
    logger_impl::{Logger, CORE_LOGGER_NAME},
};

static LOGGERS: OnceLock<Mutex<HashMap<&'static str, Logger>>> = OnceLock::new();

fn loggers() -> MutexGuard<'static, HashMap<&'static str, Logger>> {
    LOGGERS
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Registers `logger` under `name`. Each name can be initialized once per process.
pub fn logger_init(name: &'static str, logger: Logger) -> Result<(), LogError> {
    let mut loggers = loggers();
    if loggers.contains_key(name) {
        return Err(LogError::AlreadyInitialized(name.into()));
    }
    loggers.insert(name, logger);
    Ok(())
}

pub fn core_logger_init(logger: Option<Logger>) -> Result<(), LogError> {
    logger_init(CORE_LOGGER_NAME, logger.unwrap_or_else(Logger::default_core))
}

/// Whether a message of `level` sent to `name` would be written anywhere.
/// Loggers that were never initialized accept nothing.
pub fn is_enabled(name: &str, level: LogLevel) -> bool {
    loggers()
        .get(name)
        .map(|logger| logger.accepts(level))
        .unwrap_or(false)
}

pub fn log_to(name: &str, level: LogLevel, msg: String) {
    if let Some(logger) = loggers().get(name) {
        logger.log(level, &msg);
    }
}
