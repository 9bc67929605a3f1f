//! Per-logger configuration
//!
//! A [`Config`] is an immutable value. Every node of the logger hierarchy owns
//! one; new nodes copy the config of their nearest ancestor, and runtime
//! updates hand each node its *own* config to transform (see
//! [`LoggerRegistry::update_config`](crate::core::LoggerRegistry::update_config)).

use super::error::{LoggerError, Result};
use super::log_level::LogLevel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// A field that can be emitted in a log record.
///
/// The order of fields in [`Config::fields`] is the order they appear in the
/// JSON object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogField {
    #[serde(rename = "timestamp")]
    Timestamp,
    #[serde(rename = "level")]
    Level,
    #[serde(rename = "message")]
    Message,
    #[serde(rename = "logger")]
    Logger,
    #[serde(rename = "thread")]
    ThreadName,
    #[serde(rename = "markers")]
    Markers,
    #[serde(rename = "data")]
    KeyValuePairs,
    #[serde(rename = "throwable")]
    Throwable,
    #[serde(rename = "mdc")]
    Mdc,
    /// Process-wide record counter
    #[serde(rename = "counter")]
    Counter,
}

impl LogField {
    pub const ALL: [LogField; 10] = [
        LogField::Timestamp,
        LogField::Level,
        LogField::Message,
        LogField::Logger,
        LogField::ThreadName,
        LogField::Markers,
        LogField::KeyValuePairs,
        LogField::Throwable,
        LogField::Mdc,
        LogField::Counter,
    ];

    /// JSON key used for this field
    pub const fn key(&self) -> &'static str {
        match self {
            LogField::Timestamp => "timestamp",
            LogField::Level => "level",
            LogField::Message => "message",
            LogField::Logger => "logger",
            LogField::ThreadName => "thread",
            LogField::Markers => "markers",
            LogField::KeyValuePairs => "data",
            LogField::Throwable => "throwable",
            LogField::Mdc => "mdc",
            LogField::Counter => "counter",
        }
    }
}

impl fmt::Display for LogField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for LogField {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self> {
        LogField::ALL
            .iter()
            .copied()
            .find(|field| field.key() == s)
            .ok_or_else(|| LoggerError::config("fields", format!("unknown field '{}'", s)))
    }
}

fn default_fields() -> Vec<LogField> {
    vec![
        LogField::Timestamp,
        LogField::Level,
        LogField::Message,
        LogField::Logger,
        LogField::ThreadName,
        LogField::Mdc,
        LogField::Markers,
        LogField::KeyValuePairs,
        LogField::Throwable,
    ]
}

fn default_level() -> Option<LogLevel> {
    Some(LogLevel::Info)
}

/// How throwables attached to events are serialized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExceptionHandling {
    /// Frames serialized per throwable before truncating with `"..."`
    pub max_depth: usize,
    /// Nested causes (and suppressed throwables) followed below the top one
    pub traverse_depth: usize,
    /// Elide stack traces already seen by the shared filter
    pub deduplicate: bool,
}

impl ExceptionHandling {
    pub const DEFAULT: ExceptionHandling = ExceptionHandling {
        max_depth: 64,
        traverse_depth: 2,
        deduplicate: false,
    };

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn with_traverse_depth(mut self, traverse_depth: usize) -> Self {
        self.traverse_depth = traverse_depth;
        self
    }

    #[must_use]
    pub fn with_deduplication(mut self, deduplicate: bool) -> Self {
        self.deduplicate = deduplicate;
        self
    }
}

impl Default for ExceptionHandling {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Configuration snapshot of one logger node
///
/// `level: None` disables the logger entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_level")]
    pub level: Option<LogLevel>,
    #[serde(default = "default_fields")]
    pub fields: Vec<LogField>,
    #[serde(default)]
    pub exception_handling: ExceptionHandling,
}

impl Config {
    #[must_use]
    pub fn with_level(&self, level: LogLevel) -> Self {
        Self {
            level: Some(level),
            ..self.clone()
        }
    }

    /// Copy of this config with logging turned off
    #[must_use]
    pub fn disabled(&self) -> Self {
        Self {
            level: None,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_fields<I>(&self, fields: I) -> Self
    where
        I: IntoIterator<Item = LogField>,
    {
        Self {
            fields: fields.into_iter().collect(),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_exception_handling(&self, exception_handling: ExceptionHandling) -> Self {
        Self {
            exception_handling,
            ..self.clone()
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.level.is_none()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            level: default_level(),
            fields: default_fields(),
            exception_handling: ExceptionHandling::DEFAULT,
        }
    }
}

/// Transformation applied to every node of a scope's subtree
pub type ConfigChange = Arc<dyn Fn(&Config) -> Config + Send + Sync>;

/// A `(scope, change)` pair as produced by a configuration source
///
/// Scopes are dotted logger-name prefixes; the empty scope is the root.
#[derive(Clone)]
pub struct ConfigUpdate {
    pub scope: String,
    pub change: ConfigChange,
}

impl ConfigUpdate {
    pub fn new<F>(scope: impl Into<String>, change: F) -> Self
    where
        F: Fn(&Config) -> Config + Send + Sync + 'static,
    {
        Self {
            scope: scope.into(),
            change: Arc::new(change),
        }
    }

    /// Change only the level, keeping each node's other settings
    pub fn level(scope: impl Into<String>, level: LogLevel) -> Self {
        Self::new(scope, move |config| config.with_level(level))
    }

    /// Replace the whole config of every node in the scope
    pub fn replace(scope: impl Into<String>, config: Config) -> Self {
        Self::new(scope, move |_| config.clone())
    }
}

impl fmt::Debug for ConfigUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigUpdate")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// Split a configuration scope into its segments, rejecting malformed input
pub(crate) fn parse_scope(scope: &str) -> Result<Vec<&str>> {
    if scope.is_empty() {
        return Ok(Vec::new());
    }

    scope
        .split('.')
        .map(|segment| {
            if segment.is_empty() {
                Err(LoggerError::config(
                    "scope",
                    format!("empty segment in '{}'", scope),
                ))
            } else if segment.chars().any(char::is_whitespace) {
                Err(LoggerError::config(
                    "scope",
                    format!("whitespace in segment '{}' of '{}'", segment, scope),
                ))
            } else {
                Ok(segment)
            }
        })
        .collect()
}

/// Split a logger name into segments, silently dropping empty ones
pub(crate) fn name_segments(name: &str) -> impl Iterator<Item = &str> {
    name.split('.').filter(|segment| !segment.is_empty())
}

/// Parse a level for a configuration update
pub fn parse_level(level: &str) -> Result<Option<LogLevel>> {
    match level.trim().to_uppercase().as_str() {
        "OFF" | "NONE" | "DISABLED" => Ok(None),
        _ => level
            .parse::<LogLevel>()
            .map(Some)
            .map_err(|message| LoggerError::config("level", message)),
    }
}
