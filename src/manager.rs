//! Plain connection manager for resilient-rdbc
//!
//! Owns at most one shared connection, created lazily on first use. Errors
//! propagate to the caller on the execute paths; only `health_check`
//! collapses to a boolean.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::ConnectionConfig;
use crate::connection::{BackendConnectionFactory, Connection, ConnectionFactory};
use crate::error::Result;
use crate::types::{Row, Value};

/// Manager holding a single lazily created connection
pub struct ConnectionManager {
    factory: Arc<dyn ConnectionFactory>,
    slot: Mutex<Option<Arc<dyn Connection>>>,
}

impl ConnectionManager {
    /// Create a manager for the given configuration
    pub fn new(config: ConnectionConfig) -> Self {
        Self::with_factory(Arc::new(BackendConnectionFactory::new(config)))
    }

    /// Create a manager over a custom connection factory
    pub fn with_factory(factory: Arc<dyn ConnectionFactory>) -> Self {
        Self {
            factory,
            slot: Mutex::new(None),
        }
    }

    /// Get the managed connection, creating it on first access.
    ///
    /// Concurrent callers share the same instance; after [`close`] the next
    /// call reconnects.
    ///
    /// [`close`]: ConnectionManager::close
    pub async fn get_connection(&self) -> Result<Arc<dyn Connection>> {
        let mut slot = self.slot.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(Arc::clone(conn));
        }

        debug!(kind = %self.factory.backend_kind(), "creating managed connection");
        let conn: Arc<dyn Connection> = Arc::from(self.factory.connect().await?);
        *slot = Some(Arc::clone(&conn));
        Ok(conn)
    }

    /// Execute a query on the managed connection
    pub async fn execute_query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let conn = self.get_connection().await?;
        conn.execute_query(sql, params).await
    }

    /// Execute a command on the managed connection
    pub async fn execute_command(&self, sql: &str, params: &[Value]) -> Result<()> {
        let conn = self.get_connection().await?;
        conn.execute_command(sql, params).await
    }

    /// Check database health. Never fails: connection errors and failed
    /// probes both collapse to `false`.
    pub async fn health_check(&self) -> bool {
        match self.get_connection().await {
            Ok(conn) => conn.health_check().await,
            Err(_) => false,
        }
    }

    /// Close the managed connection and clear it, so the next access
    /// reconnects. Safe to call repeatedly.
    pub async fn close(&self) -> Result<()> {
        let taken = self.slot.lock().await.take();
        match taken {
            Some(conn) => conn.close().await,
            None => Ok(()),
        }
    }
}

/// Create a manager from config
pub fn create_manager(config: ConnectionConfig) -> ConnectionManager {
    ConnectionManager::new(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendKind;
    use crate::error::Error;
    use async_trait::async_trait;

    struct FailingFactory;

    #[async_trait]
    impl ConnectionFactory for FailingFactory {
        async fn connect(&self) -> Result<Box<dyn Connection>> {
            Err(Error::connection("backend unreachable"))
        }

        fn backend_kind(&self) -> BackendKind {
            BackendKind::Unknown
        }
    }

    fn mock_manager() -> ConnectionManager {
        ConnectionManager::new(ConnectionConfig::new(BackendKind::Mock))
    }

    #[tokio::test]
    async fn test_connection_is_lazy_and_shared() {
        let manager = mock_manager();

        let first = manager.get_connection().await.unwrap();
        let second = manager.get_connection().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_execute_delegates() {
        let manager = mock_manager();

        let rows = manager.execute_query("SELECT 1", &[]).await.unwrap();
        assert_eq!(rows.len(), 1);
        manager.execute_command("DELETE FROM t", &[]).await.unwrap();
    }

    #[tokio::test]
    async fn test_health_check_reflects_connection() {
        let manager = mock_manager();
        assert!(manager.health_check().await);
    }

    #[tokio::test]
    async fn test_health_check_false_when_factory_fails() {
        let manager = ConnectionManager::with_factory(Arc::new(FailingFactory));
        assert!(!manager.health_check().await);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_resets() {
        let manager = mock_manager();
        let first = manager.get_connection().await.unwrap();

        manager.close().await.unwrap();
        manager.close().await.unwrap();

        // Next access creates a fresh connection
        let second = manager.get_connection().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(second.health_check().await);
    }
}
