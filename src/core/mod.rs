//! Core logger types: registry, configuration, level gating, events and
//! stack trace deduplication

pub mod config;
pub mod diagnostic;
pub mod error;
pub mod event_builder;
pub mod event_pool;
pub mod field_value;
pub mod global;
pub mod level_guard;
pub mod log_event;
pub mod log_level;
pub mod logger;
pub mod mdc;
pub mod metrics;
pub mod registry;
pub mod stack_trace_filter;
pub mod throwable;

pub use config::{parse_level, Config, ConfigChange, ConfigUpdate, ExceptionHandling, LogField};
pub use error::{LoggerError, Result};
pub use event_builder::EventBuilder;
pub use event_pool::{EventPool, PooledEvent};
pub use field_value::{render_template, FieldValue, Marker};
pub use global::{get_logger, global, install, is_installed};
pub use level_guard::LevelGuard;
pub use log_event::LogEvent;
pub use log_level::LogLevel;
pub use logger::Logger;
pub use mdc::{Mdc, MdcGuard};
pub use metrics::LoggerMetrics;
pub use registry::{LoggerRegistry, RegistryBuilder};
pub use stack_trace_filter::{BloomFilter, Fingerprint, StackTraceFilter};
pub use throwable::{StackFrame, Throwable};
