//! # resilient-rdbc
//!
//! Resilient relational database connectivity with pooling, bounded retry,
//! and safe text handling.
//!
//! The crate fronts interchangeable backends behind one async [`Connection`]
//! trait and layers the operational machinery a long-running service needs
//! on top of it.
//!
//! ## Features
//!
//! - **Interchangeable Backends**: mock, embedded SQLite, and PostgreSQL
//!   behind a single async trait
//! - **Connection Pooling**: bounded pool with liveness validation on borrow
//!   and release
//! - **Bounded Retry**: deterministic capped exponential backoff that only
//!   retries transient failures
//! - **Text Safety**: idempotent encoding that keeps NUL bytes and invalid
//!   UTF-8 out of query text
//! - **Health Snapshots**: periodic background probes collected into a
//!   non-blocking status map
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use resilient_rdbc::prelude::*;
//!
//! // Configure the backend
//! let config = ConnectionConfig::new(BackendKind::Sqlite)
//!     .with_database("data/app.db")
//!     .with_pool_size(4);
//!
//! // Managed connection with pooling and retry
//! let manager = ResilientManager::new(config);
//! manager
//!     .execute_command_with_retry(
//!         "CREATE TABLE IF NOT EXISTS users (id INTEGER PRIMARY KEY, name TEXT)",
//!         &[],
//!     )
//!     .await?;
//!
//! let rows = manager
//!     .execute_query_with_retry(
//!         "SELECT id, name FROM users WHERE id = ?1",
//!         &[Value::Int64(1)],
//!     )
//!     .await?;
//!
//! manager.close().await?;
//! ```
//!
//! ## Feature Flags
//!
//! - `sqlite` - embedded SQLite support via rusqlite (bundled)
//! - `postgres` - PostgreSQL support via tokio-postgres
//!
//! Both are enabled by default; the mock backend is always available.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod connection;
pub mod encoding;
pub mod error;
pub mod health;
pub mod manager;
pub mod mock;
pub mod pool;
pub mod resilient;
pub mod retry;
pub mod types;

// Backend implementations (conditionally compiled)
#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "sqlite")]
pub mod sqlite;

/// Prelude module for convenient imports
pub mod prelude {
    // Error types
    pub use crate::error::{Error, ErrorCategory, Result};

    // Value and row types
    pub use crate::types::{Row, Value};

    // Configuration
    pub use crate::config::{BackendKind, ConnectionConfig};

    // Connection trait and factory
    pub use crate::connection::{
        create_connection, BackendConnectionFactory, Connection, ConnectionFactory,
    };

    // Always-available backend
    pub use crate::mock::MockConnection;

    // Managers
    pub use crate::manager::{create_manager, ConnectionManager};
    pub use crate::resilient::ResilientManager;

    // Pool types
    pub use crate::pool::{ConnectionPool, PoolStats, PooledConnection};

    // Retry types
    pub use crate::retry::{RetryExecutor, RetryPolicy};

    // Text safety
    pub use crate::encoding::{safe_encode_bytes, safe_encode_params, safe_encode_query};

    // Health types
    pub use crate::health::{HealthMonitor, HealthProbe, HealthStatus};
}

// Re-export commonly used items at crate root
pub use error::{Error, Result};
pub use types::Value;
