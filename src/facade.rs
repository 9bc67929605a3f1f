//! Bridge from the `log` crate facade
//!
//! Installs a [`log::Log`] implementation so `log::info!` and friends from
//! any crate end up in a [`LoggerRegistry`]. Targets are mapped to logger
//! names by replacing `::` with `.`, so `my_app::db` logs through the
//! `my_app.db` logger and honours its config.
//!
//! ```no_run
//! use rust_json_logger::prelude::*;
//!
//! let registry = LoggerRegistry::builder().build().unwrap();
//! rust_json_logger::facade::init(registry.clone()).unwrap();
//!
//! log::info!(target: "my_app::db", retries = 3; "connected");
//! ```

use crate::core::{global, FieldValue, LogLevel, Logger, LoggerError, LoggerRegistry, Result};
use log::kv::{self, VisitSource};
use std::borrow::Cow;

/// Convert a `log` key-value into a field value, keeping numbers and booleans typed
fn field_value(value: &kv::Value<'_>) -> FieldValue {
    if let Some(v) = value.to_i64() {
        FieldValue::Int(v)
    } else if let Some(v) = value.to_u64() {
        FieldValue::UInt(v)
    } else if let Some(v) = value.to_f64() {
        FieldValue::Float(v)
    } else if let Some(v) = value.to_bool() {
        FieldValue::Bool(v)
    } else if let Some(v) = value.to_borrowed_str() {
        FieldValue::String(v.to_string())
    } else {
        FieldValue::String(value.to_string())
    }
}

struct KeyValues(Vec<(String, FieldValue)>);

impl<'kvs> VisitSource<'kvs> for KeyValues {
    fn visit_pair(
        &mut self,
        key: kv::Key<'kvs>,
        value: kv::Value<'kvs>,
    ) -> std::result::Result<(), kv::Error> {
        self.0.push((key.as_str().to_string(), field_value(&value)));
        Ok(())
    }
}

/// Logger name for a `log` target
pub fn logger_name(target: &str) -> Cow<'_, str> {
    if target.contains("::") {
        Cow::Owned(target.replace("::", "."))
    } else {
        Cow::Borrowed(target)
    }
}

/// [`log::Log`] implementation writing to a registry
#[derive(Debug, Clone)]
pub struct LogBridge {
    registry: LoggerRegistry,
}

impl LogBridge {
    pub fn new(registry: LoggerRegistry) -> Self {
        Self { registry }
    }

    fn logger(&self, target: &str) -> Logger {
        self.registry.get_logger(&logger_name(target))
    }
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        self.logger(metadata.target())
            .is_enabled(LogLevel::from(metadata.level()))
    }

    fn log(&self, record: &log::Record<'_>) {
        let logger = self.logger(record.target());
        let level = LogLevel::from(record.level());
        if !logger.is_enabled(level) {
            return;
        }

        let mut key_values = KeyValues(Vec::new());
        if record.key_values().visit(&mut key_values).is_err() {
            crate::core::diagnostic::warn(format!(
                "dropped key-values of a record from '{}'",
                record.target()
            ));
        }

        let message = match record.args().as_str() {
            Some(message) => FieldValue::from(message),
            None => FieldValue::String(record.args().to_string()),
        };

        let mut builder = logger.at(level).add_argument(message);
        for (key, value) in key_values.0 {
            builder = builder.add_key_value(key, value);
        }
        // the formatted text is the only argument, so braces in it stay literal
        builder.log("{}");
    }

    fn flush(&self) {}
}

/// Route the `log` facade to `registry`.
///
/// Fails with [`LoggerError::AlreadyInitialized`] if a `log` logger is
/// already installed.
pub fn init(registry: LoggerRegistry) -> Result<()> {
    log::set_boxed_logger(Box::new(LogBridge::new(registry)))
        .map_err(|_| LoggerError::AlreadyInitialized)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}

/// Route the `log` facade to the process-wide registry
pub fn init_global() -> Result<()> {
    init(global().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::SinkTarget;
    use log::Log;

    #[test]
    fn test_logger_name() {
        assert_eq!(logger_name("my_app::db::pool"), "my_app.db.pool");
        assert_eq!(logger_name("plain"), "plain");
    }

    #[test]
    fn test_bridge_writes_records() {
        let (target, buffer) = SinkTarget::memory();
        let registry = LoggerRegistry::builder().target(target).build().unwrap();
        registry.set_level("quiet", LogLevel::Error).unwrap();
        let bridge = LogBridge::new(registry.clone());

        let kvs = ("retries", 3i64);
        bridge.log(
            &log::Record::builder()
                .args(format_args!("connected {}", "{}"))
                .level(log::Level::Info)
                .target("my_app::db")
                .key_values(&kvs)
                .build(),
        );
        bridge.log(
            &log::Record::builder()
                .args(format_args!("hidden"))
                .level(log::Level::Warn)
                .target("quiet::inner")
                .build(),
        );

        let lines = buffer.lines();
        assert_eq!(lines.len(), 1);
        let record: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(record["logger"], "my_app.db");
        assert_eq!(record["message"], "connected {}");
        assert_eq!(record["data"]["retries"], 3);
        assert!(registry.find("quiet.inner").is_some());
    }

    #[test]
    fn test_enabled_consults_logger_guard() {
        let registry = LoggerRegistry::builder()
            .target(SinkTarget::memory().0)
            .build()
            .unwrap();
        registry.set_level("verbose", LogLevel::Trace).unwrap();
        let bridge = LogBridge::new(registry);

        let metadata = |target: &'static str| {
            log::Metadata::builder()
                .level(log::Level::Debug)
                .target(target)
                .build()
        };
        assert!(bridge.enabled(&metadata("verbose::x")));
        assert!(!bridge.enabled(&metadata("other")));
    }
}
