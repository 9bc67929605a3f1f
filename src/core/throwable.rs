//! Exception-like values attached to log events

use std::error::Error;
use std::fmt;

/// One frame of a stack trace
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StackFrame {
    pub class: String,
    pub method: String,
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl StackFrame {
    pub fn new(
        class: impl Into<String>,
        method: impl Into<String>,
        file: Option<&str>,
        line: Option<u32>,
    ) -> Self {
        Self {
            class: class.into(),
            method: method.into(),
            file: file.map(str::to_string),
            line,
        }
    }
}

impl fmt::Display for StackFrame {
    /// `class.method(file:line)`, or `(Unknown Source)` when the file is not known
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}(", self.class, self.method)?;
        match (&self.file, self.line) {
            (Some(file), Some(line)) if !file.is_empty() && line > 0 => {
                write!(f, "{}:{}", file, line)?
            }
            (Some(file), _) if !file.is_empty() => f.write_str(file)?,
            _ => f.write_str("Unknown Source")?,
        }
        f.write_str(")")
    }
}

/// An error with a stack shape, a cause chain and suppressed siblings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Throwable {
    pub class: String,
    pub message: Option<String>,
    pub frames: Vec<StackFrame>,
    pub cause: Option<Box<Throwable>>,
    pub suppressed: Vec<Throwable>,
}

impl Throwable {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            message: None,
            frames: Vec::new(),
            cause: None,
            suppressed: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_frame(mut self, frame: StackFrame) -> Self {
        self.frames.push(frame);
        self
    }

    #[must_use]
    pub fn with_frames<I>(mut self, frames: I) -> Self
    where
        I: IntoIterator<Item = StackFrame>,
    {
        self.frames.extend(frames);
        self
    }

    #[must_use]
    pub fn with_cause(mut self, cause: Throwable) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    #[must_use]
    pub fn with_suppressed(mut self, suppressed: Throwable) -> Self {
        self.suppressed.push(suppressed);
        self
    }

    /// Convert an error and its `source()` chain into a cause chain.
    ///
    /// The outer error is named after its Rust type; sources are only known
    /// as `dyn Error` and are named generically.
    pub fn from_error<E: Error + ?Sized>(error: &E) -> Self {
        let mut throwable =
            Throwable::new(std::any::type_name::<E>()).with_message(error.to_string());
        if let Some(source) = error.source() {
            throwable.cause = Some(Box::new(Self::from_source(source)));
        }
        throwable
    }

    fn from_source(error: &(dyn Error + 'static)) -> Self {
        let mut throwable = Throwable::new("std::error::Error").with_message(error.to_string());
        if let Some(source) = error.source() {
            throwable.cause = Some(Box::new(Self::from_source(source)));
        }
        throwable
    }

    /// Iterate over this throwable and its causes, outermost first
    pub fn chain(&self) -> impl Iterator<Item = &Throwable> {
        std::iter::successors(Some(self), |t| t.cause.as_deref())
    }
}

impl fmt::Display for Throwable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.class, message),
            None => f.write_str(&self.class),
        }
    }
}
