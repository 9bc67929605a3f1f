//! Mutable log record reused across log calls

use super::field_value::{FieldValue, Marker};
use super::log_level::LogLevel;
use super::throwable::Throwable;
use std::cell::RefCell;
use std::sync::Arc;

// Computed once per thread; events allocated on re-entrant calls share it
thread_local! {
    static THREAD_NAME_CACHE: RefCell<Option<Arc<str>>> = const { RefCell::new(None) };
}

fn current_thread_name() -> Arc<str> {
    let compute = || -> Arc<str> {
        let thread = std::thread::current();
        match thread.name() {
            Some(name) => Arc::from(name),
            None => Arc::from(format!("{:?}", thread.id())),
        }
    };

    THREAD_NAME_CACHE
        .try_with(|cache| match cache.try_borrow_mut() {
            Ok(mut cache) => cache.get_or_insert_with(compute).clone(),
            Err(_) => compute(),
        })
        .unwrap_or_else(|_| compute())
}

/// One log record being assembled.
///
/// Events live in the per-thread pool (see [`EventPool`](super::event_pool::EventPool)).
/// Between uses the collected data is cleared; the collections keep their
/// capacity and the thread name never changes.
#[derive(Debug)]
pub struct LogEvent {
    pub level: LogLevel,
    pub logger: Arc<str>,
    /// Message template with `{}` placeholders
    pub template: String,
    pub args: Vec<FieldValue>,
    pub markers: Vec<Marker>,
    pub key_values: Vec<(String, FieldValue)>,
    pub cause: Option<Throwable>,
    /// Epoch milliseconds, stamped when the event is finalized
    pub timestamp: i64,
    /// Process-wide sequence number, stamped when the event is finalized
    pub counter: u64,
    thread_name: Arc<str>,
}

impl LogEvent {
    /// Create an empty event owned by the current thread
    pub fn new() -> Self {
        Self {
            level: LogLevel::Info,
            logger: Arc::from(""),
            template: String::new(),
            args: Vec::new(),
            markers: Vec::new(),
            key_values: Vec::new(),
            cause: None,
            timestamp: 0,
            counter: 0,
            thread_name: current_thread_name(),
        }
    }

    /// Name of the thread the event was created on
    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    /// Add a marker unless one with the same name is already present
    pub fn add_marker(&mut self, marker: Marker) {
        if !self.markers.contains(&marker) {
            self.markers.push(marker);
        }
    }

    /// Clear the collected data.
    ///
    /// Level and logger are overwritten on every borrow and are left alone.
    pub fn reset(&mut self) {
        self.template.clear();
        self.args.clear();
        self.markers.clear();
        self.key_values.clear();
        self.cause = None;
        self.timestamp = 0;
        self.counter = 0;
    }

    pub fn is_reset(&self) -> bool {
        self.template.is_empty()
            && self.args.is_empty()
            && self.markers.is_empty()
            && self.key_values.is_empty()
            && self.cause.is_none()
            && self.timestamp == 0
            && self.counter == 0
    }
}

impl Default for LogEvent {
    fn default() -> Self {
        Self::new()
    }
}
