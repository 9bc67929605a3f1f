//! # Rust JSON Logger
//!
//! A hierarchical, structured logging backend that writes one compact JSON
//! object per record, synchronously, on the calling thread.
//!
//! ## Features
//!
//! - **Free when disabled**: a per-logger level guard short-circuits before
//!   any record is built
//! - **No per-call allocation**: each thread reuses one pooled event and owns
//!   its own sink
//! - **Live reconfiguration**: update a whole subtree of loggers at runtime
//!   while every logger keeps its own overrides
//! - **Bounded exception output**: repeated stack traces are recognised by a
//!   shared bloom filter and elided
//! - **`log` facade bridge**: records from `log::info!` and friends land in
//!   the same hierarchy
//!
//! ```
//! use rust_json_logger::prelude::*;
//!
//! let (target, buffer) = SinkTarget::memory();
//! let registry = LoggerRegistry::builder().target(target).build().unwrap();
//!
//! let logger = registry.get_logger("service.orders");
//! logger.at_info().add_argument(42).log("order {} placed");
//!
//! assert!(buffer.contents().contains("\"message\":\"order 42 placed\""));
//! ```

pub mod core;
pub mod facade;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        Config, ConfigUpdate, EventBuilder, ExceptionHandling, FieldValue, LevelGuard, LogField,
        LogLevel, Logger, LoggerError, LoggerMetrics, LoggerRegistry, Marker, Mdc, RegistryBuilder,
        Result, StackFrame, Throwable,
    };
    pub use crate::sinks::{MemoryBuffer, SinkBackend, SinkTarget};
}

pub use core::{
    get_logger, global, install, Config, ConfigUpdate, EventBuilder, ExceptionHandling,
    FieldValue, LevelGuard, LogField, LogLevel, Logger, LoggerError, LoggerMetrics,
    LoggerRegistry, Marker, Mdc, MdcGuard, RegistryBuilder, Result, StackFrame, StackTraceFilter,
    Throwable,
};
pub use sinks::{SinkBackend, SinkTarget};
