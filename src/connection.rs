//! Connection traits for resilient-rdbc
//!
//! Core abstractions for database connectivity:
//! - Connection: query/command execution, health probing, close
//! - ConnectionFactory: builds connections for a configured backend
//! - BackendConnectionFactory: kind-dispatching factory with mock fallback

use async_trait::async_trait;
use tracing::warn;

use crate::config::{BackendKind, ConnectionConfig};
use crate::error::Result;
use crate::mock::MockConnection;
use crate::types::{Row, Value};

/// A connection to a database
///
/// Implementations are safe to share across tasks; all methods take `&self`.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Execute a query that returns rows
    async fn execute_query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Execute a statement that modifies data (INSERT, UPDATE, DELETE, DDL).
    /// Backends apply it transactionally: committed on success, rolled back
    /// on failure.
    async fn execute_command(&self, sql: &str, params: &[Value]) -> Result<()>;

    /// Check if the connection is alive. Never fails; any probe error
    /// collapses to `false`.
    async fn health_check(&self) -> bool;

    /// Close the connection. Safe to call repeatedly; after the first call
    /// the connection reports unhealthy and execution fails.
    async fn close(&self) -> Result<()>;
}

/// Factory for creating connections
///
/// A factory captures its configuration at construction, so pools and
/// managers can create connections without carrying config themselves.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    /// Create a new connection
    async fn connect(&self) -> Result<Box<dyn Connection>>;

    /// The backend kind this factory produces connections for
    fn backend_kind(&self) -> BackendKind;
}

/// Factory dispatching on the configured [`BackendKind`].
///
/// An unrecognized kind falls back to the mock backend with a warning on
/// every call; connectivity is preserved and the misconfiguration stays
/// visible in the logs. A kind whose backend was compiled out fails with a
/// configuration error instead.
#[derive(Debug, Clone)]
pub struct BackendConnectionFactory {
    config: ConnectionConfig,
}

impl BackendConnectionFactory {
    /// Create a factory for the given configuration
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }

    /// The configuration this factory connects with
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }
}

#[async_trait]
impl ConnectionFactory for BackendConnectionFactory {
    async fn connect(&self) -> Result<Box<dyn Connection>> {
        match self.config.kind {
            BackendKind::Mock => Ok(Box::new(MockConnection::new())),
            BackendKind::Sqlite => {
                #[cfg(feature = "sqlite")]
                {
                    let conn = crate::sqlite::SqliteConnection::connect(&self.config).await?;
                    Ok(Box::new(conn) as Box<dyn Connection>)
                }
                #[cfg(not(feature = "sqlite"))]
                {
                    Err(crate::error::Error::config(
                        "sqlite backend requested but the 'sqlite' feature is not enabled",
                    ))
                }
            }
            BackendKind::Postgres => {
                #[cfg(feature = "postgres")]
                {
                    let conn = crate::postgres::PgConnection::connect(&self.config).await?;
                    Ok(Box::new(conn) as Box<dyn Connection>)
                }
                #[cfg(not(feature = "postgres"))]
                {
                    Err(crate::error::Error::config(
                        "postgres backend requested but the 'postgres' feature is not enabled",
                    ))
                }
            }
            BackendKind::Unknown => {
                warn!(
                    database = %self.config.database,
                    "unknown backend kind, using mock"
                );
                Ok(Box::new(MockConnection::new()))
            }
        }
    }

    fn backend_kind(&self) -> BackendKind {
        self.config.kind
    }
}

/// Create a single connection for the given configuration.
///
/// One-shot convenience over [`BackendConnectionFactory`]; pools and
/// managers construct the factory themselves so they can reconnect.
pub async fn create_connection(config: &ConnectionConfig) -> Result<Box<dyn Connection>> {
    BackendConnectionFactory::new(config.clone()).connect().await
}
