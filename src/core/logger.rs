//! Logger handle
//!
//! A [`Logger`] is a cheap handle on one node of a
//! [`LoggerRegistry`](super::LoggerRegistry). It never caches the node's
//! config, so runtime updates apply to existing handles immediately.

use super::config::Config;
use super::event_builder::EventBuilder;
use super::level_guard::LevelGuard;
use super::log_level::LogLevel;
use super::registry::{LoggerNode, LoggerState, Shared};
use std::error::Error;
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub struct Logger {
    node: Arc<LoggerNode>,
    shared: Arc<Shared>,
}

impl Logger {
    pub(crate) fn new(node: Arc<LoggerNode>, shared: Arc<Shared>) -> Self {
        Self { node, shared }
    }

    /// Full dotted name; empty for the root logger
    pub fn name(&self) -> &str {
        &self.node.name
    }

    /// Whether both handles refer to the same registry node
    pub fn same_node(&self, other: &Logger) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    pub fn guard(&self) -> LevelGuard {
        self.node.guard()
    }

    /// Snapshot of the current config
    pub fn config(&self) -> Config {
        self.node.state().config.clone()
    }

    pub(crate) fn state(&self) -> Arc<LoggerState> {
        self.node.state()
    }

    #[inline]
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        self.node.guard().is_enabled(level)
    }

    #[inline]
    pub fn is_trace_enabled(&self) -> bool {
        self.node.guard().is_trace_enabled()
    }

    #[inline]
    pub fn is_debug_enabled(&self) -> bool {
        self.node.guard().is_debug_enabled()
    }

    #[inline]
    pub fn is_info_enabled(&self) -> bool {
        self.node.guard().is_info_enabled()
    }

    #[inline]
    pub fn is_warn_enabled(&self) -> bool {
        self.node.guard().is_warn_enabled()
    }

    #[inline]
    pub fn is_error_enabled(&self) -> bool {
        self.node.guard().is_error_enabled()
    }

    /// Start a record at `level`.
    ///
    /// When the level is disabled the returned builder is inert: the event
    /// pool and the sink are not touched.
    pub fn at(&self, level: LogLevel) -> EventBuilder<'_> {
        let state = self.node.state();
        if !state.guard.is_enabled(level) {
            return EventBuilder::disabled();
        }
        EventBuilder::new(level, &self.node.name, state, &self.shared)
    }

    pub fn at_trace(&self) -> EventBuilder<'_> {
        self.at(LogLevel::Trace)
    }

    pub fn at_debug(&self) -> EventBuilder<'_> {
        self.at(LogLevel::Debug)
    }

    pub fn at_info(&self) -> EventBuilder<'_> {
        self.at(LogLevel::Info)
    }

    pub fn at_warn(&self) -> EventBuilder<'_> {
        self.at(LogLevel::Warn)
    }

    pub fn at_error(&self) -> EventBuilder<'_> {
        self.at(LogLevel::Error)
    }

    /// Log a plain message; `{}` placeholders stay as they are
    pub fn log(&self, level: LogLevel, message: &str) {
        self.at(level).log(message);
    }

    pub fn trace(&self, message: &str) {
        self.log(LogLevel::Trace, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    /// Log `message` at error level with `error` as the cause
    pub fn error_with<E: Error + ?Sized>(&self, message: &str, error: &E) {
        self.at_error().set_error(error).log(message);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name())
            .field("guard", &self.guard())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EventPool, LogField, LoggerRegistry, StackFrame, Throwable};
    use crate::sinks::{MemoryBuffer, SinkTarget};
    use serde_json::Value;

    fn registry() -> (LoggerRegistry, MemoryBuffer) {
        let (target, buffer) = SinkTarget::memory();
        let registry = LoggerRegistry::builder().target(target).build().unwrap();
        (registry, buffer)
    }

    fn records(buffer: &MemoryBuffer) -> Vec<Value> {
        buffer
            .lines()
            .iter()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_disabled_level_touches_nothing() {
        let (registry, buffer) = registry();
        let logger = registry.get_logger("service.orders");

        let outer = logger.at_debug();
        assert!(!outer.is_enabled());
        // the pool slot was not borrowed
        assert!(EventPool::is_available());
        outer.add_argument(1).log("x");

        assert!(buffer.is_empty());
        assert_eq!(registry.metrics().records_written(), 0);
    }

    #[test]
    fn test_info_record() {
        let (registry, buffer) = registry();
        let logger = registry.get_logger("service.orders");

        logger.at_info().add_argument(42).log("order {} placed");

        let records = records(&buffer);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["message"], "order 42 placed");
        assert_eq!(records[0]["level"], "INFO");
        assert_eq!(records[0]["logger"], "service.orders");
        assert!(records[0]["timestamp"].as_i64().unwrap() > 0);
        assert!(buffer.contents().contains("\"level\":\"INFO\""));
    }

    #[test]
    fn test_log_with_and_emit() {
        let (registry, buffer) = registry();
        let logger = registry.get_logger("svc");

        logger.at_warn().log_with("{} of {}", [1, 3]);
        logger.at_error().set_message("set {}").add_argument("later").emit();
        logger.at_error().add_argument_with(|| "lazy").log("{}");

        let records = records(&buffer);
        assert_eq!(records[0]["message"], "1 of 3");
        assert_eq!(records[1]["message"], "set later");
        assert_eq!(records[2]["message"], "lazy");
    }

    #[test]
    fn test_lazy_argument_not_evaluated_when_disabled() {
        let (registry, _buffer) = registry();
        let logger = registry.get_logger("svc");
        let mut evaluated = false;
        logger
            .at_trace()
            .add_argument_with(|| {
                evaluated = true;
                1
            })
            .log("{}");
        assert!(!evaluated);
    }

    #[test]
    fn test_handles_see_updates() {
        let (registry, buffer) = registry();
        let logger = registry.get_logger("a.b");
        assert!(!logger.is_debug_enabled());

        registry.set_level("a", LogLevel::Debug).unwrap();
        assert!(logger.is_debug_enabled());
        logger.debug("now visible");

        registry
            .update_config("a.b", |config| config.with_fields([LogField::Message]))
            .unwrap();
        logger.info("only message");

        let lines = buffer.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "{\"message\":\"only message\"}");
    }

    #[test]
    fn test_counter_increases() {
        let (registry, buffer) = registry();
        registry.set_config("", Config::default().with_fields([LogField::Counter])).unwrap();
        let logger = registry.get_logger("c");
        logger.info("one");
        logger.info("two");

        let records = records(&buffer);
        let first = records[0]["counter"].as_u64().unwrap();
        let second = records[1]["counter"].as_u64().unwrap();
        assert!(second > first);
    }

    #[test]
    fn test_error_with_cause_chain() {
        let (registry, buffer) = registry();
        let logger = registry.get_logger("db");
        let error = std::io::Error::new(std::io::ErrorKind::TimedOut, "db timeout");

        logger.error_with("query failed", &error);

        let records = records(&buffer);
        assert_eq!(records[0]["throwable"]["message"], "db timeout");
        assert_eq!(records[0]["level"], "ERROR");
    }

    #[test]
    fn test_reentrant_logging_from_argument() {
        struct Noisy(Logger);

        impl fmt::Display for Noisy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.info("inner");
                f.write_str("outer-arg")
            }
        }

        let (registry, buffer) = registry();
        let logger = registry.get_logger("re");
        let noisy = Noisy(logger.clone());

        // Display runs while the outer builder holds the pooled event
        let builder = logger.at_info();
        let builder = builder.add_argument(crate::core::FieldValue::display(&noisy));
        builder.log("{}");

        let messages: Vec<_> = records(&buffer)
            .iter()
            .map(|r| r["message"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(messages, vec!["inner", "outer-arg"]);
        assert_eq!(registry.metrics().pool_misses(), 1);
    }

    #[test]
    fn test_dedup_through_logger() {
        let (target, buffer) = SinkTarget::memory();
        let registry = LoggerRegistry::builder()
            .target(target)
            .deduplicate_stack_traces(true)
            .build()
            .unwrap();
        let logger = registry.get_logger("retry");
        let failure = || {
            Throwable::new("Timeout")
                .with_frame(StackFrame::new("net.Client", "send", Some("client.rs"), Some(10)))
        };

        logger.at_error().set_cause(failure()).log("attempt failed");
        logger.at_error().set_cause(failure()).log("attempt failed");

        let records = records(&buffer);
        assert!(records[0]["throwable"]["stacktrace"].is_array());
        assert_eq!(
            records[1]["throwable"]["stacktrace"],
            crate::sinks::ELIDED_STACKTRACE
        );
        assert_eq!(registry.metrics().traces_elided(), 1);
    }
}
