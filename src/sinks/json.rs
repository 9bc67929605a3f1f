//! JSON sink for structured logging
//!
//! Each record is written as a single-line JSON object (JSONL format),
//! compatible with line-oriented collectors such as ELK or Loki.
//!
//! Records are produced through [`JsonWriter`], a small streaming protocol
//! (start/end object or array, scalar with or without a key) over a reused
//! byte buffer; nothing builds an intermediate `serde_json::Value`.

use super::target::TargetWriter;
use super::TraceShape;
use crate::core::{
    render_template, Config, ExceptionHandling, FieldValue, LogEvent, LogField, LoggerError,
    LoggerMetrics, Mdc, Result, StackTraceFilter, Throwable,
};
use serde::Serializer as _;
use std::fmt;

/// Replaces the frame array of a throwable whose stack shape was already logged
pub const ELIDED_STACKTRACE: &str = "... repeated stacktrace omitted";

/// Last element of a frame array cut at `max_depth`
pub const TRUNCATED_STACKTRACE: &str = "...";

/// Streaming writer for compact JSON
///
/// Separators are inserted automatically; callers only describe structure.
///
/// # Example
///
/// ```
/// use rust_json_logger::sinks::JsonWriter;
///
/// let mut out = Vec::new();
/// let mut writer = JsonWriter::new(&mut out);
/// writer.start_object().unwrap();
/// writer.string_field("level", "INFO").unwrap();
/// writer.start_array_field("markers").unwrap();
/// writer.string("AUDIT").unwrap();
/// writer.end_array().unwrap();
/// writer.end_object().unwrap();
///
/// assert_eq!(out, br#"{"level":"INFO","markers":["AUDIT"]}"#);
/// ```
pub struct JsonWriter<'a> {
    out: &'a mut Vec<u8>,
    first: bool,
    after_key: bool,
}

impl<'a> JsonWriter<'a> {
    pub fn new(out: &'a mut Vec<u8>) -> Self {
        Self {
            out,
            first: true,
            after_key: false,
        }
    }

    fn begin_value(&mut self) {
        if self.after_key {
            self.after_key = false;
        } else if !self.first {
            self.out.push(b',');
        }
        self.first = false;
    }

    pub fn key(&mut self, key: &str) -> Result<()> {
        if !self.first {
            self.out.push(b',');
        }
        self.first = false;
        serde_json::to_writer(&mut *self.out, key)?;
        self.out.push(b':');
        self.after_key = true;
        Ok(())
    }

    pub fn start_object(&mut self) -> Result<()> {
        self.begin_value();
        self.out.push(b'{');
        self.first = true;
        Ok(())
    }

    pub fn start_object_field(&mut self, key: &str) -> Result<()> {
        self.key(key)?;
        self.start_object()
    }

    pub fn end_object(&mut self) -> Result<()> {
        self.out.push(b'}');
        self.first = false;
        Ok(())
    }

    pub fn start_array(&mut self) -> Result<()> {
        self.begin_value();
        self.out.push(b'[');
        self.first = true;
        Ok(())
    }

    pub fn start_array_field(&mut self, key: &str) -> Result<()> {
        self.key(key)?;
        self.start_array()
    }

    pub fn end_array(&mut self) -> Result<()> {
        self.out.push(b']');
        self.first = false;
        Ok(())
    }

    pub fn string(&mut self, value: &str) -> Result<()> {
        self.begin_value();
        serde_json::to_writer(&mut *self.out, value)?;
        Ok(())
    }

    /// Write a `Display` value as an escaped string without an intermediate `String`
    pub fn display<T: fmt::Display + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.begin_value();
        let mut serializer = serde_json::Serializer::new(&mut *self.out);
        (&mut serializer).collect_str(value)?;
        Ok(())
    }

    pub fn number<T: serde::Serialize>(&mut self, value: T) -> Result<()> {
        self.begin_value();
        serde_json::to_writer(&mut *self.out, &value)?;
        Ok(())
    }

    /// Write any [`FieldValue`], recursing into lists and maps
    pub fn value(&mut self, value: &FieldValue) -> Result<()> {
        match value {
            FieldValue::String(s) => self.string(s),
            FieldValue::Int(i) => self.number(*i),
            FieldValue::UInt(u) => self.number(*u),
            FieldValue::Float(f) => self.number(*f),
            FieldValue::Bool(b) => self.number(*b),
            FieldValue::Null => {
                self.begin_value();
                self.out.extend_from_slice(b"null");
                Ok(())
            }
            FieldValue::List(items) => {
                self.start_array()?;
                for item in items {
                    self.value(item)?;
                }
                self.end_array()
            }
            FieldValue::Map(entries) => {
                self.start_object()?;
                for (key, item) in entries {
                    self.value_field(key, item)?;
                }
                self.end_object()
            }
        }
    }

    pub fn string_field(&mut self, key: &str, value: &str) -> Result<()> {
        self.key(key)?;
        self.string(value)
    }

    pub fn number_field<T: serde::Serialize>(&mut self, key: &str, value: T) -> Result<()> {
        self.key(key)?;
        self.number(value)
    }

    pub fn value_field(&mut self, key: &str, value: &FieldValue) -> Result<()> {
        self.key(key)?;
        self.value(value)
    }
}

/// Per-thread JSON sink
pub struct JsonSink {
    writer: TargetWriter,
    line: Vec<u8>,
    message: String,
}

impl JsonSink {
    pub fn new(writer: TargetWriter) -> Self {
        Self {
            writer,
            line: Vec::with_capacity(512),
            message: String::with_capacity(128),
        }
    }

    /// Serialize `event` with the fields of `config` and write it as one line
    pub fn write(
        &mut self,
        event: &LogEvent,
        config: &Config,
        filter: &StackTraceFilter,
        metrics: &LoggerMetrics,
    ) -> Result<()> {
        let shape = event
            .cause
            .as_ref()
            .filter(|_| config.fields.contains(&LogField::Throwable))
            .map(|throwable| TraceShape::of(throwable, &config.exception_handling, filter));

        self.line.clear();
        let mut json = JsonWriter::new(&mut self.line);
        json.start_object()?;

        for field in &config.fields {
            match field {
                LogField::Timestamp => json.number_field(field.key(), event.timestamp)?,
                LogField::Level => json.string_field(field.key(), event.level.to_str())?,
                LogField::Message => {
                    self.message.clear();
                    render_template(&event.template, &event.args, &mut self.message);
                    json.string_field(field.key(), &self.message)?;
                }
                LogField::Logger => json.string_field(field.key(), &event.logger)?,
                LogField::ThreadName => json.string_field(field.key(), event.thread_name())?,
                LogField::Markers if !event.markers.is_empty() => {
                    json.start_array_field(field.key())?;
                    for marker in &event.markers {
                        json.string(marker.name())?;
                    }
                    json.end_array()?;
                }
                LogField::KeyValuePairs if !event.key_values.is_empty() => {
                    json.start_object_field(field.key())?;
                    for (key, value) in &event.key_values {
                        json.value_field(key, value)?;
                    }
                    json.end_object()?;
                }
                LogField::Throwable => {
                    if let (Some(throwable), Some(shape)) = (&event.cause, &shape) {
                        json.key(field.key())?;
                        write_throwable(
                            &mut json,
                            throwable,
                            &config.exception_handling,
                            shape.elided,
                        )?;
                    }
                }
                LogField::Mdc => write_mdc(&mut json, field.key())?,
                LogField::Counter => json.number_field(field.key(), event.counter)?,
                LogField::Markers | LogField::KeyValuePairs => {}
            }
        }

        json.end_object()?;
        self.line.push(b'\n');

        self.writer
            .write_record(&self.line)
            .map_err(|e| LoggerError::sink_write("JSON record", e))?;
        if let Some(shape) = shape {
            shape.written(filter, metrics);
        }
        Ok(())
    }
}

fn write_mdc(json: &mut JsonWriter<'_>, key: &str) -> Result<()> {
    let mut started = false;
    let mut result = Ok(());
    Mdc::for_each(|name, value| {
        if result.is_err() {
            return;
        }
        if !started {
            started = true;
            result = json.start_object_field(key);
        }
        if result.is_ok() {
            result = json.string_field(name, value);
        }
    });
    result?;
    if started {
        json.end_object()?;
    }
    Ok(())
}

/// Write a throwable; an `elided` one keeps its class and message only
pub fn write_throwable(
    json: &mut JsonWriter<'_>,
    throwable: &Throwable,
    handling: &ExceptionHandling,
    elided: bool,
) -> Result<()> {
    write_throwable_body(json, throwable, handling, elided, 0)
}

fn write_throwable_body(
    json: &mut JsonWriter<'_>,
    throwable: &Throwable,
    handling: &ExceptionHandling,
    elided: bool,
    depth: usize,
) -> Result<()> {
    json.start_object()?;
    json.string_field("class", &throwable.class)?;
    if let Some(message) = &throwable.message {
        json.string_field("message", message)?;
    }

    if elided {
        json.string_field("stacktrace", ELIDED_STACKTRACE)?;
        return json.end_object();
    }

    json.start_array_field("stacktrace")?;
    for frame in throwable.frames.iter().take(handling.max_depth) {
        json.display(frame)?;
    }
    if throwable.frames.len() > handling.max_depth {
        json.string(TRUNCATED_STACKTRACE)?;
    }
    json.end_array()?;

    if depth < handling.traverse_depth {
        if !throwable.suppressed.is_empty() {
            json.start_array_field("suppressed")?;
            for suppressed in &throwable.suppressed {
                write_throwable_body(json, suppressed, handling, false, depth + 1)?;
            }
            json.end_array()?;
        }
        if let Some(cause) = &throwable.cause {
            json.key("cause")?;
            write_throwable_body(json, cause, handling, false, depth + 1)?;
        }
    }

    json.end_object()
}
