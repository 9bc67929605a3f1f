//! Process-wide registry

use super::error::{LoggerError, Result};
use super::logger::Logger;
use super::registry::LoggerRegistry;
use once_cell::sync::OnceCell;

static GLOBAL: OnceCell<LoggerRegistry> = OnceCell::new();

/// Install `registry` as the process-wide registry.
///
/// Fails with [`LoggerError::AlreadyInitialized`] if a registry was
/// installed before, or if [`global`] already created the default one.
pub fn install(registry: LoggerRegistry) -> Result<()> {
    GLOBAL
        .set(registry)
        .map_err(|_| LoggerError::AlreadyInitialized)
}

/// The process-wide registry, created with defaults (JSON to stdout) on
/// first use if none was installed
pub fn global() -> &'static LoggerRegistry {
    GLOBAL.get_or_init(LoggerRegistry::new)
}

pub fn is_installed() -> bool {
    GLOBAL.get().is_some()
}

/// Logger from the process-wide registry
///
/// # Example
///
/// ```
/// let logger = rust_json_logger::get_logger("app.startup");
/// assert_eq!(logger.name(), "app.startup");
/// ```
pub fn get_logger(name: &str) -> Logger {
    global().get_logger(name)
}
