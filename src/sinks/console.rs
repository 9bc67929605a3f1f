//! Human-readable console sink

use super::json::ELIDED_STACKTRACE;
use super::target::TargetWriter;
use super::TraceShape;
use crate::core::{
    render_template, Config, ExceptionHandling, LogEvent, LogField, LoggerError, LoggerMetrics,
    Mdc, Result, StackTraceFilter, Throwable,
};
use chrono::{TimeZone, Utc};
use colored::Colorize;
use std::fmt::Write as _;

/// Per-thread sink writing one coloured text line per record
///
/// The configured fields choose what is shown; their order is fixed:
/// `[timestamp] [LEVEL] thread logger - message {markers} data mdc`, followed
/// by indented throwable lines.
pub struct ConsoleSink {
    writer: TargetWriter,
    use_colors: bool,
    line: String,
    message: String,
}

impl ConsoleSink {
    pub fn new(writer: TargetWriter, use_colors: bool) -> Self {
        Self {
            writer,
            use_colors,
            line: String::with_capacity(256),
            message: String::with_capacity(128),
        }
    }

    /// Replace line breaks so one record stays on one line
    ///
    /// Applied to every piece of caller-supplied text: the message, data and
    /// MDC entries, and the class, message and frames of throwables.
    fn sanitize(text: &str) -> String {
        text
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    pub fn write(
        &mut self,
        event: &LogEvent,
        config: &Config,
        filter: &StackTraceFilter,
        metrics: &LoggerMetrics,
    ) -> Result<()> {
        let has = |field: LogField| config.fields.contains(&field);
        self.line.clear();

        if has(LogField::Timestamp) {
            match Utc.timestamp_millis_opt(event.timestamp).single() {
                Some(time) => {
                    let _ = write!(self.line, "[{}] ", time.format("%Y-%m-%d %H:%M:%S%.3f"));
                }
                None => {
                    let _ = write!(self.line, "[{}] ", event.timestamp);
                }
            }
        }
        if has(LogField::Level) {
            let level = format!("{:5}", event.level.to_str());
            if self.use_colors {
                let _ = write!(self.line, "[{}] ", level.color(event.level.color_code()));
            } else {
                let _ = write!(self.line, "[{}] ", level);
            }
        }
        if has(LogField::Counter) {
            let _ = write!(self.line, "#{} ", event.counter);
        }
        if has(LogField::ThreadName) {
            let _ = write!(self.line, "{} ", event.thread_name());
        }
        if has(LogField::Logger) {
            let _ = write!(self.line, "{} ", event.logger);
        }
        if has(LogField::Message) {
            self.message.clear();
            render_template(&event.template, &event.args, &mut self.message);
            let _ = write!(self.line, "- {}", Self::sanitize(&self.message));
        }
        if has(LogField::Markers) && !event.markers.is_empty() {
            let names: Vec<_> = event.markers.iter().map(|m| m.name()).collect();
            let _ = write!(self.line, " {{{}}}", names.join(","));
        }
        if has(LogField::KeyValuePairs) {
            for (key, value) in &event.key_values {
                let _ = write!(
                    self.line,
                    " {}={}",
                    Self::sanitize(key),
                    Self::sanitize(&value.to_string())
                );
            }
        }
        if has(LogField::Mdc) {
            let line = &mut self.line;
            Mdc::for_each(|key, value| {
                let _ = write!(line, " {}={}", Self::sanitize(key), Self::sanitize(value));
            });
        }
        self.line.push('\n');

        let mut shape = None;
        if has(LogField::Throwable) {
            if let Some(throwable) = &event.cause {
                let handling = &config.exception_handling;
                let traced = TraceShape::of(throwable, handling, filter);
                self.write_throwable(throwable, handling, traced.elided, 0, "");
                shape = Some(traced);
            }
        }

        self.writer
            .write_record(self.line.as_bytes())
            .map_err(|e| LoggerError::sink_write("console record", e))?;
        if let Some(shape) = shape {
            shape.written(filter, metrics);
        }
        Ok(())
    }

    fn write_throwable(
        &mut self,
        throwable: &Throwable,
        handling: &ExceptionHandling,
        elided: bool,
        depth: usize,
        prefix: &str,
    ) {
        let indent = "    ".repeat(depth + 1);
        let _ = writeln!(
            self.line,
            "{}{}{}",
            indent,
            prefix,
            Self::sanitize(&throwable.to_string())
        );

        if elided {
            let _ = writeln!(self.line, "{}    {}", indent, ELIDED_STACKTRACE);
            return;
        }

        for frame in throwable.frames.iter().take(handling.max_depth) {
            let _ = writeln!(self.line, "{}    at {}", indent, Self::sanitize(&frame.to_string()));
        }
        if throwable.frames.len() > handling.max_depth {
            let more = throwable.frames.len() - handling.max_depth;
            let _ = writeln!(self.line, "{}    ... {} more", indent, more);
        }

        if depth < handling.traverse_depth {
            for suppressed in &throwable.suppressed {
                self.write_throwable(suppressed, handling, false, depth + 1, "Suppressed: ");
            }
            if let Some(cause) = &throwable.cause {
                self.write_throwable(cause, handling, false, depth + 1, "Caused by: ");
            }
        }
    }
}
