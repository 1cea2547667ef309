//! Mock backend for resilient-rdbc
//!
//! A storage-free connection used for testing and as the fail-open fallback
//! for unrecognized backend kinds. Queries return a fixed placeholder row;
//! commands succeed without effect.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::types::{Row, Value};

/// Mock database connection
pub struct MockConnection {
    connected: AtomicBool,
}

impl MockConnection {
    /// Create a new mock connection
    pub fn new() -> Self {
        info!("mock connection created");
        Self {
            connected: AtomicBool::new(true),
        }
    }
}

impl Default for MockConnection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn execute_query(&self, sql: &str, _params: &[Value]) -> Result<Vec<Row>> {
        if !self.connected.load(Ordering::Relaxed) {
            return Err(Error::connection("connection is closed"));
        }
        debug!(sql, "mock query");
        Ok(vec![Row::new(
            vec!["id".into(), "result".into()],
            vec![Value::Int32(1), Value::String("mock_data".into())],
        )])
    }

    async fn execute_command(&self, sql: &str, _params: &[Value]) -> Result<()> {
        if !self.connected.load(Ordering::Relaxed) {
            return Err(Error::connection("connection is closed"));
        }
        debug!(sql, "mock command");
        Ok(())
    }

    async fn health_check(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    async fn close(&self) -> Result<()> {
        if self.connected.swap(false, Ordering::Relaxed) {
            info!("mock connection closed");
        }
        Ok(())
    }
}
