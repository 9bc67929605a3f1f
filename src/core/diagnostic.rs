//! Fallback writer for failures of the logging pipeline itself
//!
//! Writes fixed-format lines straight to the process error stream. Nothing
//! here allocates beyond formatting the message, touches the event pool or
//! goes through a sink, so it keeps working when those are broken.

use std::any::Any;
use std::error::Error;
use std::fmt;
use std::io::{self, Write};

const ERROR_TAG: &str = "[LOGGER ERROR]";
const WARNING_TAG: &str = "[LOGGER WARNING]";
const DEBUG_TAG: &str = "[LOGGER DEBUG]";
const RECORD_TAG: &str = "[LOGGER FALLBACK]";

fn write_line<W: Write>(out: &mut W, tag: &str, message: fmt::Arguments<'_>) {
    // a failing error stream has nowhere left to report to
    let _ = writeln!(out, "{} {}", tag, message);
}

fn write_error_chain<W: Write>(out: &mut W, message: &str, error: &dyn Error) {
    write_line(out, ERROR_TAG, format_args!("{}: {}", message, error));
    let mut source = error.source();
    while let Some(cause) = source {
        write_line(out, ERROR_TAG, format_args!("  caused by: {}", cause));
        source = cause.source();
    }
}

pub fn error(message: impl fmt::Display) {
    write_line(&mut io::stderr().lock(), ERROR_TAG, format_args!("{}", message));
}

/// Report an error together with its `source()` chain
pub fn error_with(message: &str, error: &dyn Error) {
    write_error_chain(&mut io::stderr().lock(), message, error);
}

pub fn warn(message: impl fmt::Display) {
    write_line(&mut io::stderr().lock(), WARNING_TAG, format_args!("{}", message));
}

pub fn debug(message: impl fmt::Display) {
    write_line(&mut io::stderr().lock(), DEBUG_TAG, format_args!("{}", message));
}

/// Write a log record in the fixed fallback format
pub fn record(level: &str, logger: &str, message: &str) {
    write_line(
        &mut io::stderr().lock(),
        RECORD_TAG,
        format_args!("{} {} - {}", level, logger, message),
    );
}

/// Best-effort text of a caught panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
