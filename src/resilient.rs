//! Resilient database manager
//!
//! Wraps the plain [`ConnectionManager`] surface with pooling, bounded
//! retry, and text-safety encoding. The `_with_retry` operations encode
//! their inputs once, then borrow a pooled connection per attempt; the
//! borrow guard returns the connection on every exit path, so a failed
//! attempt can never leak capacity.
//!
//! # Example
//!
//! ```rust,ignore
//! use resilient_rdbc::config::{BackendKind, ConnectionConfig};
//! use resilient_rdbc::resilient::ResilientManager;
//!
//! let config = ConnectionConfig::new(BackendKind::Sqlite)
//!     .with_database("data/app.db");
//! let manager = ResilientManager::new(config);
//!
//! manager
//!     .execute_command_with_retry("CREATE TABLE IF NOT EXISTS t (id INTEGER)", &[])
//!     .await?;
//! let rows = manager.execute_query_with_retry("SELECT id FROM t", &[]).await?;
//! manager.close().await?;
//! ```

use std::sync::Arc;
use tracing::warn;

use crate::config::ConnectionConfig;
use crate::connection::{BackendConnectionFactory, ConnectionFactory};
use crate::encoding::{safe_encode_params, safe_encode_query};
use crate::error::{Error, Result};
use crate::manager::ConnectionManager;
use crate::pool::ConnectionPool;
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::types::{Row, Value};

/// Connection manager with pooling, retry, and input encoding.
///
/// The plain operations share the [`ConnectionManager`] contract; the
/// `_with_retry` variants route through the pool and retry only retriable
/// failures. One factory backs both, so the managed connection and the
/// pooled ones always target the same backend.
pub struct ResilientManager {
    inner: ConnectionManager,
    pool: Arc<ConnectionPool>,
    retry: RetryExecutor,
}

impl ResilientManager {
    /// Create a manager with the default retry policy
    pub fn new(config: ConnectionConfig) -> Self {
        Self::with_policy(config, RetryPolicy::default())
    }

    /// Create a manager with a custom retry policy
    pub fn with_policy(config: ConnectionConfig, policy: RetryPolicy) -> Self {
        let factory: Arc<dyn ConnectionFactory> =
            Arc::new(BackendConnectionFactory::new(config.clone()));
        Self::with_factory(&config, factory, policy)
    }

    /// Create a manager over a caller-supplied factory, shared by the
    /// managed connection and the pool
    pub fn with_factory(
        config: &ConnectionConfig,
        factory: Arc<dyn ConnectionFactory>,
        policy: RetryPolicy,
    ) -> Self {
        let pool = ConnectionPool::new(config, Arc::clone(&factory));
        Self {
            inner: ConnectionManager::with_factory(factory),
            pool,
            retry: RetryExecutor::new(policy),
        }
    }

    /// The pool backing the `_with_retry` operations
    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    /// The retry policy in effect
    pub fn retry_policy(&self) -> &RetryPolicy {
        self.retry.policy()
    }

    /// Run a query on the managed connection, without pooling or retry
    pub async fn execute_query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.inner.execute_query(sql, params).await
    }

    /// Run a statement on the managed connection, without pooling or retry
    pub async fn execute_command(&self, sql: &str, params: &[Value]) -> Result<()> {
        self.inner.execute_command(sql, params).await
    }

    /// Probe the managed connection. Never fails; errors collapse to `false`.
    pub async fn health_check(&self) -> bool {
        self.inner.health_check().await
    }

    /// Close the managed connection and shut the pool down.
    ///
    /// Idempotent. Both halves are closed even if the first fails.
    pub async fn close(&self) -> Result<()> {
        let inner = self.inner.close().await;
        let pool = self.pool.close_all().await;
        inner.and(pool)
    }

    /// Run a query through the pool with retry.
    ///
    /// The query text and string parameters are made text-safe once; each
    /// attempt borrows its own pooled connection.
    pub async fn execute_query_with_retry(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<Row>> {
        let sql = safe_encode_query(sql);
        let params = safe_encode_params(params);
        self.retry
            .run(|| async {
                let conn = self.pool.acquire().await?;
                conn.execute_query(&sql, &params).await
            })
            .await
    }

    /// Run a statement through the pool with retry
    pub async fn execute_command_with_retry(&self, sql: &str, params: &[Value]) -> Result<()> {
        let sql = safe_encode_query(sql);
        let params = safe_encode_params(params);
        self.retry
            .run(|| async {
                let conn = self.pool.acquire().await?;
                conn.execute_command(&sql, &params).await
            })
            .await
    }

    /// Probe a pooled connection with retry.
    ///
    /// A `false` probe is escalated to a retriable validation error so the
    /// retry loop replaces the connection; the final outcome collapses back
    /// to a boolean here and only here.
    pub async fn health_check_with_retry(&self) -> bool {
        let outcome = self
            .retry
            .run(|| async {
                let conn = self.pool.acquire().await?;
                if conn.health_check().await {
                    Ok(())
                } else {
                    Err(Error::validation_failed("connection failed liveness probe"))
                }
            })
            .await;

        match outcome {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "health check failed after retries");
                false
            }
        }
    }
}

impl std::fmt::Debug for ResilientManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientManager")
            .field("pool", &self.pool)
            .field("retry", &self.retry)
            .finish()
    }
}
