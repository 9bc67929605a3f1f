//! Error types for the logger system

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Malformed scope, level or field during a configuration update
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// No usable serialization backend for the requested sink
    #[error("Sink backend '{backend}' unavailable: {reason}")]
    SinkUnavailable { backend: String, reason: String },

    /// IO failure while a sink was writing a record
    #[error("Sink write failed: {message}")]
    SinkWrite {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// A pooled event was handed out without having been reset
    #[error("Pool invariant violated: {0}")]
    PoolInvariant(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The `log` facade already has a logger installed
    #[error("A logger has already been installed")]
    AlreadyInitialized,

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a sink unavailable error
    pub fn sink_unavailable(backend: impl Into<String>, reason: impl Into<String>) -> Self {
        LoggerError::SinkUnavailable {
            backend: backend.into(),
            reason: reason.into(),
        }
    }

    /// Create a sink write error with context
    pub fn sink_write(message: impl Into<String>, source: std::io::Error) -> Self {
        LoggerError::SinkWrite {
            message: message.into(),
            source,
        }
    }

    /// Create a pool invariant error
    pub fn pool_invariant<S: Into<String>>(msg: S) -> Self {
        LoggerError::PoolInvariant(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }
}
