//! Logging macros for ergonomic log calls.
//!
//! The macros check the logger's level first; arguments are only evaluated
//! when the level is enabled. Arguments fill the `{}` placeholders of the
//! message template in order and must convert into
//! [`FieldValue`](crate::FieldValue).
//!
//! # Examples
//!
//! ```
//! use rust_json_logger::prelude::*;
//! use rust_json_logger::info;
//!
//! let (target, buffer) = SinkTarget::memory();
//! let registry = LoggerRegistry::builder().target(target).build().unwrap();
//! let logger = registry.get_logger("server");
//!
//! info!(logger, "Server started");
//!
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//!
//! assert_eq!(buffer.lines().len(), 2);
//! ```

/// Log a message at a given level.
///
/// # Examples
///
/// ```
/// # use rust_json_logger::prelude::*;
/// # let registry = LoggerRegistry::builder().backend(SinkBackend::Discard).build().unwrap();
/// # let logger = registry.get_logger("app");
/// use rust_json_logger::log;
/// log!(logger, LogLevel::Info, "Simple message");
/// log!(logger, LogLevel::Error, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $template:expr $(,)?) => {{
        let logger = &$logger;
        let level = $level;
        if logger.is_enabled(level) {
            logger.at(level).log($template);
        }
    }};
    ($logger:expr, $level:expr, $template:expr, $($arg:expr),+ $(,)?) => {{
        let logger = &$logger;
        let level = $level;
        if logger.is_enabled(level) {
            logger.at(level)$(.add_argument($arg))+.log($template);
        }
    }};
}

/// Log a trace-level message.
///
/// # Examples
///
/// ```
/// # use rust_json_logger::prelude::*;
/// # let registry = LoggerRegistry::builder().backend(SinkBackend::Discard).build().unwrap();
/// # registry.set_level("", LogLevel::Trace).unwrap();
/// # let logger = registry.get_logger("app");
/// use rust_json_logger::trace;
/// trace!(logger, "Entering function: calculate()");
/// trace!(logger, "Variable value: {}", 42);
/// ```
#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Trace, $($arg)+)
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
///
/// # Examples
///
/// ```
/// # use rust_json_logger::prelude::*;
/// # let registry = LoggerRegistry::builder().backend(SinkBackend::Discard).build().unwrap();
/// # let logger = registry.get_logger("app");
/// use rust_json_logger::warn;
/// let usage = 85.5;
/// warn!(logger, "High memory usage: {}%", usage);
/// ```
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warn, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use std::cell::Cell;

    #[test]
    fn test_macros_write_records() {
        let (target, buffer) = SinkTarget::memory();
        let registry = LoggerRegistry::builder().target(target).build().unwrap();
        let logger = registry.get_logger("macros");

        crate::info!(logger, "plain");
        crate::warn!(logger, "{} + {} = {}", 1, 1, 2);
        crate::error!(logger, "trailing comma {}", "ok",);

        let lines = buffer.lines();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("\"message\":\"1 + 1 = 2\""));
        assert!(lines[2].contains("\"level\":\"ERROR\""));
    }

    #[test]
    fn test_arguments_not_evaluated_when_disabled() {
        let (target, buffer) = SinkTarget::memory();
        let registry = LoggerRegistry::builder().target(target).build().unwrap();
        let logger = registry.get_logger("macros");
        let calls = Cell::new(0);
        let expensive = || {
            calls.set(calls.get() + 1);
            "value"
        };

        crate::debug!(logger, "skipped {}", expensive());
        crate::trace!(logger, "skipped {}", expensive());
        assert_eq!(calls.get(), 0);

        crate::info!(logger, "kept {}", expensive());
        assert_eq!(calls.get(), 1);
        assert_eq!(buffer.lines().len(), 1);
    }
}
