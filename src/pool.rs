//! Bounded connection pool
//!
//! Connections are created lazily up to `pool_size` and handed out as
//! [`PooledConnection`] guards that return themselves on drop. Borrow and
//! release both probe liveness, so a dead connection is closed and replaced
//! rather than recirculated.
//!
//! # Example
//!
//! ```rust,ignore
//! use resilient_rdbc::config::{BackendKind, ConnectionConfig};
//! use resilient_rdbc::connection::BackendConnectionFactory;
//! use resilient_rdbc::pool::ConnectionPool;
//!
//! let config = ConnectionConfig::new(BackendKind::Mock).with_pool_size(4);
//! let factory = Arc::new(BackendConnectionFactory::new(config.clone()));
//! let pool = ConnectionPool::new(&config, factory);
//!
//! let conn = pool.acquire().await?;
//! conn.execute_query("SELECT 1", &[]).await?;
//! // Returned to the pool when dropped
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ConnectionConfig;
use crate::connection::{Connection, ConnectionFactory};
use crate::error::{Error, Result};

/// A connection borrowed from the pool.
///
/// Dereferences to [`Connection`] and schedules its own return when dropped,
/// so release happens on every exit path including early `?` returns.
pub struct PooledConnection {
    conn: Option<Box<dyn Connection>>,
    pool: Arc<ConnectionPool>,
}

impl std::ops::Deref for PooledConnection {
    type Target = dyn Connection;

    fn deref(&self) -> &Self::Target {
        self.conn
            .as_ref()
            .expect("connection already returned")
            .as_ref()
    }
}

impl std::ops::DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn
            .as_mut()
            .expect("connection already returned")
            .as_mut()
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            let pool = Arc::clone(&self.pool);
            tokio::spawn(async move {
                pool.release(conn).await;
            });
        }
    }
}

/// Point-in-time pool counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Connections created by the factory
    pub connections_created: u64,
    /// Connections closed and discarded
    pub connections_closed: u64,
    /// Successful acquisitions
    pub acquisitions: u64,
    /// Acquisitions that timed out waiting for capacity
    pub exhausted_count: u64,
    /// Liveness probes that failed on borrow, release, or eviction
    pub validation_failures: u64,
}

#[derive(Debug, Default)]
struct AtomicPoolStats {
    connections_created: AtomicU64,
    connections_closed: AtomicU64,
    acquisitions: AtomicU64,
    exhausted_count: AtomicU64,
    validation_failures: AtomicU64,
}

impl AtomicPoolStats {
    fn record_created(&self) {
        self.connections_created.fetch_add(1, Ordering::Relaxed);
    }

    fn record_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_acquisition(&self) {
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
    }

    fn record_exhausted(&self) {
        self.exhausted_count.fetch_add(1, Ordering::Relaxed);
    }

    fn record_validation_failure(&self) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> PoolStats {
        PoolStats {
            connections_created: self.connections_created.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            acquisitions: self.acquisitions.load(Ordering::Relaxed),
            exhausted_count: self.exhausted_count.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
        }
    }
}

/// Bounded pool of database connections.
///
/// Capacity and the default acquire timeout are fixed at construction from
/// the connection configuration. A semaphore gates total connections; permits
/// for borrowed connections are restored on release, so at most `pool_size`
/// connections exist at any moment.
pub struct ConnectionPool {
    factory: Arc<dyn ConnectionFactory>,
    capacity: usize,
    acquire_timeout: Duration,
    /// Idle connections, LIFO
    idle: Mutex<Vec<Box<dyn Connection>>>,
    semaphore: Semaphore,
    total_connections: AtomicUsize,
    stats: AtomicPoolStats,
    closed: AtomicBool,
    reaper: parking_lot::Mutex<Option<JoinHandle<()>>>,
    /// Weak self-reference for handing out guards
    self_ref: OnceCell<Weak<Self>>,
}

impl ConnectionPool {
    /// Create a pool over `factory` sized by `config.pool_size`, with
    /// `config.connection_timeout` as the default acquire timeout.
    ///
    /// No connections are opened up front; they are created on demand.
    pub fn new(config: &ConnectionConfig, factory: Arc<dyn ConnectionFactory>) -> Arc<Self> {
        let capacity = config.pool_size;
        let pool = Arc::new(Self {
            factory,
            capacity,
            acquire_timeout: config.connection_timeout,
            idle: Mutex::new(Vec::with_capacity(capacity)),
            semaphore: Semaphore::new(capacity),
            total_connections: AtomicUsize::new(0),
            stats: AtomicPoolStats::default(),
            closed: AtomicBool::new(false),
            reaper: parking_lot::Mutex::new(None),
            self_ref: OnceCell::new(),
        });
        let _ = pool.self_ref.set(Arc::downgrade(&pool));
        pool
    }

    /// Borrow a connection, waiting up to the configured acquire timeout.
    pub async fn acquire(&self) -> Result<PooledConnection> {
        self.acquire_with_timeout(self.acquire_timeout).await
    }

    /// Borrow a connection, waiting up to `wait` for capacity.
    ///
    /// Order of outcomes: a closed pool fails [`Error::PoolClosed`]; waiting
    /// out `wait` fails [`Error::PoolExhausted`]; otherwise an idle connection
    /// that passes its liveness probe is reused, or a fresh one is created.
    /// A zero `wait` with no free capacity fails without blocking.
    pub async fn acquire_with_timeout(&self, wait: Duration) -> Result<PooledConnection> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::PoolClosed);
        }

        let permit = tokio::time::timeout(wait, self.semaphore.acquire())
            .await
            .map_err(|_| {
                self.stats.record_exhausted();
                Error::pool_exhausted(format!(
                    "timed out waiting for a connection ({}ms)",
                    wait.as_millis()
                ))
            })?
            .map_err(|_| Error::pool_exhausted("pool semaphore closed"))?;

        // Reuse an idle connection that still answers its liveness probe
        let conn = {
            let mut idle = self.idle.lock().await;
            loop {
                match idle.pop() {
                    Some(conn) => {
                        if conn.health_check().await {
                            break Some(conn);
                        }
                        debug!("discarding dead idle connection");
                        self.stats.record_validation_failure();
                        self.discard(conn).await;
                    }
                    None => break None,
                }
            }
        };

        let conn = match conn {
            Some(conn) => conn,
            None => match self.create_connection().await {
                Ok(conn) => conn,
                Err(e) => {
                    // Give the capacity back before surfacing the failure
                    drop(permit);
                    return Err(e);
                }
            },
        };

        self.stats.record_acquisition();

        // The permit travels with the connection; release() restores it
        std::mem::forget(permit);

        let pool = self
            .self_ref
            .get()
            .and_then(Weak::upgrade)
            .ok_or_else(|| Error::pool_exhausted("pool has been dropped"))?;

        Ok(PooledConnection {
            conn: Some(conn),
            pool,
        })
    }

    async fn create_connection(&self) -> Result<Box<dyn Connection>> {
        let conn = self.factory.connect().await?;
        self.total_connections.fetch_add(1, Ordering::Release);
        self.stats.record_created();
        debug!(
            kind = %self.factory.backend_kind(),
            total = self.total_connections.load(Ordering::Acquire),
            "created pooled connection"
        );
        Ok(conn)
    }

    /// Close `conn` and drop it from the accounting.
    async fn discard(&self, conn: Box<dyn Connection>) {
        if let Err(e) = conn.close().await {
            warn!(error = %e, "failed to close discarded connection");
        }
        self.total_connections.fetch_sub(1, Ordering::Release);
        self.stats.record_closed();
    }

    /// Return a borrowed connection. Restores the capacity permit, then
    /// either pools the connection or discards it if the pool is closed or
    /// the liveness probe fails.
    async fn release(&self, conn: Box<dyn Connection>) {
        self.semaphore.add_permits(1);

        if self.closed.load(Ordering::Acquire) {
            self.discard(conn).await;
            return;
        }

        if !conn.health_check().await {
            debug!("discarding returned connection that failed validation");
            self.stats.record_validation_failure();
            self.discard(conn).await;
            return;
        }

        let mut idle = self.idle.lock().await;
        idle.push(conn);
    }

    /// Close every pooled connection and refuse further acquisitions.
    ///
    /// Idempotent. Connections still borrowed are closed when released.
    pub async fn close_all(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        if let Some(handle) = self.reaper.lock().take() {
            handle.abort();
        }

        let mut idle = self.idle.lock().await;
        let drained = idle.len();
        for conn in idle.drain(..) {
            self.discard(conn).await;
        }
        info!(closed = drained, "connection pool shut down");
        Ok(())
    }

    /// Whether [`close_all`](Self::close_all) has run
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Total live connections, idle and borrowed
    pub fn size(&self) -> usize {
        self.total_connections.load(Ordering::Acquire)
    }

    /// Number of idle connections
    pub async fn idle_len(&self) -> usize {
        self.idle.lock().await.len()
    }

    /// Number of currently borrowed connections
    pub fn in_use(&self) -> usize {
        self.capacity
            .saturating_sub(self.semaphore.available_permits())
    }

    /// Maximum number of connections
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of the pool counters
    pub fn stats(&self) -> PoolStats {
        self.stats.snapshot()
    }

    /// Start a background task that evicts idle connections failing their
    /// liveness probe every `interval`. Stops when the pool closes or drops.
    pub fn spawn_reaper(self: &Arc<Self>, interval: Duration) {
        let weak = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let Some(pool) = weak.upgrade() else { break };
                if pool.closed.load(Ordering::Acquire) {
                    break;
                }
                pool.evict_dead_idle().await;
            }
        });
        if let Some(previous) = self.reaper.lock().replace(handle) {
            previous.abort();
        }
    }

    async fn evict_dead_idle(&self) {
        let mut idle = self.idle.lock().await;
        let mut live = Vec::with_capacity(idle.len());
        for conn in idle.drain(..) {
            if conn.health_check().await {
                live.push(conn);
            } else {
                debug!("reaper evicting dead idle connection");
                self.stats.record_validation_failure();
                self.discard(conn).await;
            }
        }
        *idle = live;
    }
}

impl Drop for ConnectionPool {
    fn drop(&mut self) {
        if let Some(handle) = self.reaper.lock().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("capacity", &self.capacity)
            .field("acquire_timeout", &self.acquire_timeout)
            .field("size", &self.size())
            .field("in_use", &self.in_use())
            .field("closed", &self.is_closed())
            .finish()
    }
}
