//! Sinks turn finalized events into bytes on an output target.
//!
//! A registry owns one [`SinkFactory`]. Every thread lazily creates its own
//! [`Sink`] from it and keeps it in a thread-local cache, so the hot path
//! never takes a lock of the logging system (the target's own write lock
//! aside).

#[cfg(feature = "console")]
pub mod console;
pub mod json;
pub mod target;

#[cfg(feature = "console")]
pub use console::ConsoleSink;
pub use json::{JsonSink, JsonWriter, ELIDED_STACKTRACE, TRUNCATED_STACKTRACE};
pub use target::{MemoryBuffer, SinkTarget, TargetWriter};

use crate::core::diagnostic;
use crate::core::{
    render_template, Config, ExceptionHandling, Fingerprint, LogEvent, LoggerError,
    LoggerMetrics, Result, StackTraceFilter, Throwable,
};
use std::cell::RefCell;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};

/// Serialization backends that can be compiled in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkBackend {
    /// One compact JSON object per line
    #[default]
    Json,
    /// Human-readable coloured lines (`console` feature)
    Console,
    /// Drop every record
    Discard,
}

impl SinkBackend {
    /// Return `preferred` if it is available in this build
    pub fn probe(preferred: SinkBackend) -> Result<SinkBackend> {
        match preferred {
            SinkBackend::Console if !cfg!(feature = "console") => Err(LoggerError::sink_unavailable(
                preferred.name(),
                "built without the `console` feature",
            )),
            available => Ok(available),
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            SinkBackend::Json => "json",
            SinkBackend::Console => "console",
            SinkBackend::Discard => "discard",
        }
    }
}

impl fmt::Display for SinkBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Deduplication decision for the throwable of one record
///
/// The shape is looked up before the record is serialized and marked only
/// once the record reached its target, so a failed write never hides a trace.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TraceShape {
    fingerprint: Option<Fingerprint>,
    pub(crate) elided: bool,
}

impl TraceShape {
    pub(crate) fn of(
        throwable: &Throwable,
        handling: &ExceptionHandling,
        filter: &StackTraceFilter,
    ) -> Self {
        let fingerprint =
            Fingerprint::of_throwable(throwable, handling.max_depth, handling.traverse_depth);
        Self {
            fingerprint,
            elided: fingerprint.is_some_and(|fp| filter.check(&fp)),
        }
    }

    /// Record the outcome after a successful write
    pub(crate) fn written(&self, filter: &StackTraceFilter, metrics: &LoggerMetrics) {
        if self.elided {
            metrics.record_elided();
        } else if let Some(fingerprint) = &self.fingerprint {
            filter.mark(fingerprint);
        }
    }
}

/// One thread's sink
pub enum Sink {
    Json(JsonSink),
    #[cfg(feature = "console")]
    Console(ConsoleSink),
    Discard,
    /// Fixed-format fallback through the diagnostic writer
    Diagnostic(String),
}

impl Sink {
    pub fn write(
        &mut self,
        event: &LogEvent,
        config: &Config,
        filter: &StackTraceFilter,
        metrics: &LoggerMetrics,
    ) -> Result<()> {
        match self {
            Sink::Json(sink) => sink.write(event, config, filter, metrics),
            #[cfg(feature = "console")]
            Sink::Console(sink) => sink.write(event, config, filter, metrics),
            Sink::Discard => Ok(()),
            Sink::Diagnostic(message) => {
                message.clear();
                render_template(&event.template, &event.args, message);
                diagnostic::record(event.level.to_str(), &event.logger, message);
                Ok(())
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Sink::Json(_) => "json",
            #[cfg(feature = "console")]
            Sink::Console(_) => "console",
            Sink::Discard => "discard",
            Sink::Diagnostic(_) => "diagnostic",
        }
    }
}

static NEXT_FACTORY_ID: AtomicU64 = AtomicU64::new(1);

struct CachedSink {
    factory_id: u64,
    sink: Sink,
}

thread_local! {
    static THREAD_SINK: RefCell<Option<CachedSink>> = const { RefCell::new(None) };
}

/// Creates per-thread sinks for one registry
#[derive(Debug)]
pub struct SinkFactory {
    id: u64,
    /// `None` once probing failed: every sink is a diagnostic sink
    backend: Option<SinkBackend>,
    target: SinkTarget,
    use_colors: bool,
}

impl SinkFactory {
    /// Probe `backend`, falling back to the diagnostic writer if it is unavailable
    pub fn new(backend: SinkBackend, target: SinkTarget) -> Self {
        let backend = match SinkBackend::probe(backend) {
            Ok(backend) => Some(backend),
            Err(e) => {
                diagnostic::error_with("falling back to diagnostic output", &e);
                None
            }
        };
        let use_colors = target.is_terminal();

        Self {
            id: NEXT_FACTORY_ID.fetch_add(1, Ordering::Relaxed),
            backend,
            target,
            use_colors,
        }
    }

    /// Factory whose sinks only write through the diagnostic writer
    pub fn diagnostic() -> Self {
        Self {
            id: NEXT_FACTORY_ID.fetch_add(1, Ordering::Relaxed),
            backend: None,
            target: SinkTarget::Stderr,
            use_colors: false,
        }
    }

    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn backend(&self) -> Option<SinkBackend> {
        self.backend
    }

    pub fn target(&self) -> &SinkTarget {
        &self.target
    }

    pub fn create(&self) -> Sink {
        match self.backend {
            Some(SinkBackend::Json) => Sink::Json(JsonSink::new(self.target.writer())),
            #[cfg(feature = "console")]
            Some(SinkBackend::Console) => {
                Sink::Console(ConsoleSink::new(self.target.writer(), self.use_colors))
            }
            Some(SinkBackend::Discard) => Sink::Discard,
            _ => Sink::Diagnostic(String::new()),
        }
    }

    /// Write `event` through the calling thread's sink.
    ///
    /// Never fails and never panics: write errors and panics inside the sink
    /// are reported through the diagnostic writer.
    pub fn dispatch(
        &self,
        event: &LogEvent,
        config: &Config,
        filter: &StackTraceFilter,
        metrics: &LoggerMetrics,
    ) {
        let handled = THREAD_SINK
            .try_with(|cell| match cell.try_borrow_mut() {
                Ok(mut cached) => {
                    let current = match cached.take() {
                        Some(current) if current.factory_id == self.id => current,
                        _ => CachedSink {
                            factory_id: self.id,
                            sink: self.create(),
                        },
                    };
                    let current = cached.insert(current);
                    Self::write_isolated(&mut current.sink, event, config, filter, metrics);
                    true
                }
                // re-entrant call from inside this thread's sink
                Err(_) => false,
            })
            .unwrap_or(false);

        if !handled {
            let mut sink = self.create();
            Self::write_isolated(&mut sink, event, config, filter, metrics);
        }
    }

    fn write_isolated(
        sink: &mut Sink,
        event: &LogEvent,
        config: &Config,
        filter: &StackTraceFilter,
        metrics: &LoggerMetrics,
    ) {
        let result = catch_unwind(AssertUnwindSafe(|| sink.write(event, config, filter, metrics)));

        match result {
            Ok(Ok(())) => {
                metrics.record_written();
            }
            Ok(Err(e)) => {
                metrics.record_write_failure();
                diagnostic::error_with(
                    &format!("{} sink dropped a record from '{}'", sink.name(), event.logger),
                    &e,
                );
            }
            Err(panic_info) => {
                metrics.record_write_failure();
                diagnostic::error(format!(
                    "{} sink panicked on a record from '{}': {}",
                    sink.name(),
                    event.logger,
                    diagnostic::panic_message(panic_info.as_ref())
                ));
            }
        }
    }
}
