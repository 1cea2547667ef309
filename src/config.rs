//! Connection configuration for resilient-rdbc
//!
//! A field-structured config selecting the backend kind plus the network,
//! credential and resilience settings shared by every backend.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Database backend identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-memory mock backend (testing, fallback)
    Mock,
    /// Embedded file-backed SQLite
    Sqlite,
    /// Networked PostgreSQL
    Postgres,
    /// Unrecognized kind (resolved to mock at the factory)
    Unknown,
}

impl BackendKind {
    /// Parse a kind string case-insensitively; unrecognized input is
    /// `Unknown`, never an error. The factory decides what Unknown means.
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "mock" => Self::Mock,
            "sqlite" => Self::Sqlite,
            "postgres" | "postgresql" => Self::Postgres,
            _ => Self::Unknown,
        }
    }
}

impl FromStr for BackendKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mock => write!(f, "mock"),
            Self::Sqlite => write!(f, "sqlite"),
            Self::Postgres => write!(f, "postgres"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Configuration for creating connections
///
/// Immutable once built; the `with_*` builders consume and return the
/// config, so shared copies never change under a running pool.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Backend kind to connect to
    pub kind: BackendKind,
    /// Server host (networked backends)
    pub host: String,
    /// Server port (networked backends)
    pub port: u16,
    /// Database name, or file path for the embedded backend
    pub database: String,
    /// User name
    pub user: String,
    /// Password (redacted from Debug output)
    pub password: String,
    /// Maximum pooled connections
    pub pool_size: usize,
    /// Timeout for establishing a connection and for pool acquisition
    pub connection_timeout: Duration,
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Redact credentials to prevent leaking passwords to logs.
        let password = if self.password.is_empty() { "" } else { "***" };

        f.debug_struct("ConnectionConfig")
            .field("kind", &self.kind)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &password)
            .field("pool_size", &self.pool_size)
            .field("connection_timeout", &self.connection_timeout)
            .finish()
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Sqlite,
            host: "localhost".into(),
            port: 5432,
            database: "yosai.db".into(),
            user: "user".into(),
            password: String::new(),
            pool_size: 5,
            connection_timeout: Duration::from_secs(10),
        }
    }
}

impl ConnectionConfig {
    /// Create configuration for a backend kind
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// Set server host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set server port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set database name (file path for the embedded backend)
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set user name
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Set password
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Set maximum pooled connections
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    /// Set connection/acquire timeout
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }
}
