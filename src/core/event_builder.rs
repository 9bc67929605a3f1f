//! Fluent construction of a single log record
//!
//! A builder for an enabled level holds the thread's pooled event; a builder
//! for a disabled level holds nothing and every method is a no-op.

use super::event_pool::{EventPool, PooledEvent};
use super::field_value::{FieldValue, Marker};
use super::log_event::LogEvent;
use super::log_level::LogLevel;
use super::registry::{LoggerState, Shared};
use super::throwable::Throwable;
use chrono::Utc;
use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static RECORD_COUNTER: AtomicU64 = AtomicU64::new(0);

struct ActiveEvent<'a> {
    event: PooledEvent,
    state: Arc<LoggerState>,
    shared: &'a Shared,
}

/// Builder for one log record
///
/// Obtained from [`Logger::at`](super::Logger::at) and friends; terminated by
/// [`log`](EventBuilder::log), [`log_with`](EventBuilder::log_with) or
/// [`emit`](EventBuilder::emit). Dropping it without terminating discards
/// the record.
///
/// # Example
///
/// ```
/// use rust_json_logger::prelude::*;
///
/// let (target, buffer) = SinkTarget::memory();
/// let registry = LoggerRegistry::builder().target(target).build().unwrap();
/// let logger = registry.get_logger("payments");
///
/// logger
///     .at_warn()
///     .add_marker("AUDIT")
///     .add_key_value("amount", 120.5)
///     .add_argument("card")
///     .log("{} payment retried");
///
/// assert!(buffer.contents().contains("\"message\":\"card payment retried\""));
/// ```
#[must_use = "a log record is only written by log(), log_with() or emit()"]
pub struct EventBuilder<'a> {
    active: Option<ActiveEvent<'a>>,
}

impl<'a> EventBuilder<'a> {
    pub(crate) fn new(
        level: LogLevel,
        logger: &Arc<str>,
        state: Arc<LoggerState>,
        shared: &'a Shared,
    ) -> Self {
        let event = EventPool::acquire(level, logger, &shared.metrics);
        Self {
            active: Some(ActiveEvent {
                event,
                state,
                shared,
            }),
        }
    }

    /// Builder that ignores everything
    pub fn disabled() -> Self {
        Self { active: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.active.is_some()
    }

    #[inline]
    fn event_mut(&mut self) -> Option<&mut LogEvent> {
        self.active.as_mut().and_then(|active| active.event.get_mut())
    }

    /// Append an argument for the next `{}` placeholder of the message
    pub fn add_argument(mut self, value: impl Into<FieldValue>) -> Self {
        if let Some(event) = self.event_mut() {
            event.args.push(value.into());
        }
        self
    }

    /// Append an argument computed only if the level is enabled
    pub fn add_argument_with<V, F>(mut self, value: F) -> Self
    where
        V: Into<FieldValue>,
        F: FnOnce() -> V,
    {
        if let Some(event) = self.event_mut() {
            event.args.push(value().into());
        }
        self
    }

    pub fn add_marker(mut self, marker: impl Into<Marker>) -> Self {
        if let Some(event) = self.event_mut() {
            event.add_marker(marker.into());
        }
        self
    }

    /// Append a key-value pair, emitted under `data` in insertion order
    pub fn add_key_value(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        if let Some(event) = self.event_mut() {
            event.key_values.push((key.into(), value.into()));
        }
        self
    }

    pub fn set_cause(mut self, cause: Throwable) -> Self {
        if let Some(event) = self.event_mut() {
            event.cause = Some(cause);
        }
        self
    }

    /// Attach an error and its `source()` chain as the cause
    pub fn set_error<E: Error + ?Sized>(mut self, error: &E) -> Self {
        if let Some(event) = self.event_mut() {
            event.cause = Some(Throwable::from_error(error));
        }
        self
    }

    /// Set the message template, for use with [`emit`](EventBuilder::emit)
    pub fn set_message(mut self, template: &str) -> Self {
        if let Some(event) = self.event_mut() {
            event.template.clear();
            event.template.push_str(template);
        }
        self
    }

    /// Write the record with `template` as its message
    pub fn log(self, template: &str) {
        self.set_message(template).emit();
    }

    /// Write the record, appending `args` to the arguments first
    pub fn log_with<I, V>(mut self, template: &str, args: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        if let Some(event) = self.event_mut() {
            event.args.extend(args.into_iter().map(Into::into));
        }
        self.log(template);
    }

    /// Write the record with the message set so far
    pub fn emit(mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        let Some(event) = active.event.get_mut() else {
            return;
        };

        event.timestamp = Utc::now().timestamp_millis();
        event.counter = RECORD_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;

        let state = &active.state;
        active
            .shared
            .sinks
            .dispatch(event, &state.config, &state.filter, &active.shared.metrics);
        // dropping `active` returns the event to the pool
    }
}
