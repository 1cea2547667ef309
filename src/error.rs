//! Error types for resilient-rdbc
//!
//! Provides granular error classification for proper retry handling:
//! - Retriable errors (connection, timeout, pool exhaustion, failed validation)
//! - Non-retriable errors (configuration, query/command failures, closed pool)

use std::fmt;
use thiserror::Error;

/// Result type for resilient-rdbc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Configuration error (not retriable)
    Configuration,
    /// Connection-related errors (retriable)
    Connection,
    /// Query execution errors (not retriable)
    Query,
    /// Command execution errors (not retriable)
    Command,
    /// Timeout errors (retriable)
    Timeout,
    /// Pool exhausted (retriable with backoff)
    PoolExhausted,
    /// Pool closed (not retriable)
    PoolClosed,
    /// Connection failed a health probe (retriable)
    Validation,
    /// Retry budget exhausted (not retriable)
    RetryExhausted,
}

impl ErrorCategory {
    /// Whether errors in this category are generally retriable
    #[inline]
    pub const fn is_retriable(self) -> bool {
        matches!(
            self,
            Self::Connection | Self::Timeout | Self::PoolExhausted | Self::Validation
        )
    }
}

/// Main error type for resilient-rdbc
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum Error {
    /// Invalid or unusable configuration
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Connection failed or was used after close
    #[error("connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Query execution failed
    #[error("query error: {message}")]
    Query {
        message: String,
        sql: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Command execution failed (statement was rolled back)
    #[error("command error: {message}")]
    Command {
        message: String,
        sql: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out
    #[error("timeout: {message}")]
    Timeout { message: String },

    /// No pooled connection became available within the acquire timeout
    #[error("pool exhausted: {message}")]
    PoolExhausted { message: String },

    /// Pool has been closed; no further acquisitions are possible
    #[error("pool closed")]
    PoolClosed,

    /// A held connection failed its health probe
    #[error("connection validation failed: {message}")]
    ValidationFailed { message: String },

    /// All retry attempts were consumed without success
    #[error("retry exhausted after {attempts} attempts")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Connection { .. } => ErrorCategory::Connection,
            Self::Query { .. } => ErrorCategory::Query,
            Self::Command { .. } => ErrorCategory::Command,
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::PoolExhausted { .. } => ErrorCategory::PoolExhausted,
            Self::PoolClosed => ErrorCategory::PoolClosed,
            Self::ValidationFailed { .. } => ErrorCategory::Validation,
            Self::RetryExhausted { .. } => ErrorCategory::RetryExhausted,
        }
    }

    /// Whether this error is retriable
    #[inline]
    pub fn is_retriable(&self) -> bool {
        self.category().is_retriable()
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection error with source
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a query error
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
            sql: None,
            source: None,
        }
    }

    /// Create a query error with the offending SQL
    pub fn query_with_sql(message: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
            sql: Some(sql.into()),
            source: None,
        }
    }

    /// Create a command error
    pub fn command(message: impl Into<String>) -> Self {
        Self::Command {
            message: message.into(),
            sql: None,
            source: None,
        }
    }

    /// Create a command error with the offending SQL
    pub fn command_with_sql(message: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::Command {
            message: message.into(),
            sql: Some(sql.into()),
            source: None,
        }
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Create a pool exhausted error
    pub fn pool_exhausted(message: impl Into<String>) -> Self {
        Self::PoolExhausted {
            message: message.into(),
        }
    }

    /// Create a validation failure error
    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }

    /// Wrap the final cause after the retry budget is consumed
    pub fn retry_exhausted(attempts: u32, source: Error) -> Self {
        Self::RetryExhausted {
            attempts,
            source: Box::new(source),
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Connection => write!(f, "connection"),
            Self::Query => write!(f, "query"),
            Self::Command => write!(f, "command"),
            Self::Timeout => write!(f, "timeout"),
            Self::PoolExhausted => write!(f, "pool_exhausted"),
            Self::PoolClosed => write!(f, "pool_closed"),
            Self::Validation => write!(f, "validation"),
            Self::RetryExhausted => write!(f, "retry_exhausted"),
        }
    }
}
