//! Output targets shared by the per-thread sinks

use crate::core::{LoggerError, Result};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where records end up.
///
/// A target is shared; every thread's sink opens its own [`TargetWriter`]
/// on it and writes whole lines with a single `write_all`.
#[derive(Debug, Clone)]
pub enum SinkTarget {
    Stdout,
    Stderr,
    /// File opened in append mode
    File { path: PathBuf, file: Arc<File> },
    /// In-memory buffer, mostly for tests and benchmarks
    Memory(MemoryBuffer),
}

impl SinkTarget {
    /// Open (or create) `path` for appending
    pub fn file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| LoggerError::sink_write(format!("cannot open {}", path.display()), e))?;

        Ok(SinkTarget::File {
            path: path.to_path_buf(),
            file: Arc::new(file),
        })
    }

    pub fn memory() -> (Self, MemoryBuffer) {
        let buffer = MemoryBuffer::new();
        (SinkTarget::Memory(buffer.clone()), buffer)
    }

    /// Writer handle for one thread
    pub fn writer(&self) -> TargetWriter {
        match self {
            SinkTarget::Stdout => TargetWriter::Stdout(io::stdout()),
            SinkTarget::Stderr => TargetWriter::Stderr(io::stderr()),
            SinkTarget::File { file, .. } => TargetWriter::File(Arc::clone(file)),
            SinkTarget::Memory(buffer) => TargetWriter::Memory(buffer.clone()),
        }
    }

    /// Whether the target is an interactive stream
    pub fn is_terminal(&self) -> bool {
        use std::io::IsTerminal;
        match self {
            SinkTarget::Stdout => io::stdout().is_terminal(),
            SinkTarget::Stderr => io::stderr().is_terminal(),
            _ => false,
        }
    }

    pub fn name(&self) -> String {
        match self {
            SinkTarget::Stdout => "stdout".to_string(),
            SinkTarget::Stderr => "stderr".to_string(),
            SinkTarget::File { path, .. } => path.display().to_string(),
            SinkTarget::Memory(_) => "memory".to_string(),
        }
    }
}

/// Per-thread handle on a [`SinkTarget`]
#[derive(Debug)]
pub enum TargetWriter {
    Stdout(io::Stdout),
    Stderr(io::Stderr),
    File(Arc<File>),
    Memory(MemoryBuffer),
}

impl TargetWriter {
    /// Write one complete record
    pub fn write_record(&mut self, line: &[u8]) -> io::Result<()> {
        match self {
            TargetWriter::Stdout(out) => out.write_all(line),
            TargetWriter::Stderr(out) => out.write_all(line),
            TargetWriter::File(file) => (&**file).write_all(line),
            TargetWriter::Memory(buffer) => {
                buffer.append(line);
                Ok(())
            }
        }
    }
}

/// Shared in-memory record buffer
#[derive(Debug, Clone, Default)]
pub struct MemoryBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl MemoryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn append(&self, bytes: &[u8]) {
        self.inner.lock().extend_from_slice(bytes);
    }

    /// Everything written so far, lossily decoded
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock()).into_owned()
    }

    /// Written records, one per line
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}
