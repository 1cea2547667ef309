//! Periodic health snapshots
//!
//! A [`HealthMonitor`] owns a background task that probes registered
//! components on an interval and rebuilds a name-to-status map. Readers get
//! the latest snapshot without ever waiting on a collection cycle, so a slow
//! or hung probe can not stall a liveness endpoint.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::manager::ConnectionManager;
use crate::resilient::ResilientManager;

/// A component that can report its own liveness
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Stable name used as the snapshot key
    fn name(&self) -> &str;

    /// Whether the component is currently healthy. Must not fail.
    async fn probe(&self) -> bool;
}

/// Result of one probe run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Outcome of the probe
    pub healthy: bool,
    /// When the probe ran
    pub checked_at: SystemTime,
}

/// Collects probe results on an interval into a shared snapshot map
pub struct HealthMonitor {
    interval: Duration,
    probes: Arc<RwLock<Vec<Arc<dyn HealthProbe>>>>,
    snapshot: Arc<RwLock<HashMap<String, HealthStatus>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl HealthMonitor {
    /// Create a monitor that collects every `interval` once started
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            probes: Arc::new(RwLock::new(Vec::new())),
            snapshot: Arc::new(RwLock::new(HashMap::new())),
            task: Mutex::new(None),
        }
    }

    /// Add a probe. Takes effect from the next collection cycle.
    pub fn register(&self, probe: Arc<dyn HealthProbe>) {
        debug!(probe = probe.name(), "registered health probe");
        self.probes.write().push(probe);
    }

    /// Start the background collection task.
    ///
    /// Calling again restarts the task on the current probe set.
    pub fn start(&self) {
        let probes = Arc::clone(&self.probes);
        let snapshot = Arc::clone(&self.snapshot);
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                collect(&probes, &snapshot).await;
            }
        });

        if let Some(previous) = self.task.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Run a single collection cycle immediately
    pub async fn run_once(&self) {
        collect(&self.probes, &self.snapshot).await;
    }

    /// Latest statuses by probe name. Never waits on a collection cycle.
    pub fn snapshot(&self) -> HashMap<String, HealthStatus> {
        self.snapshot.read().clone()
    }

    /// Latest status for one probe, if it has been collected yet
    pub fn status(&self, name: &str) -> Option<HealthStatus> {
        self.snapshot.read().get(name).copied()
    }

    /// Stop the background task. The snapshot keeps its last contents.
    pub fn stop(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("interval", &self.interval)
            .field("probes", &self.probes.read().len())
            .field("running", &self.task.lock().is_some())
            .finish()
    }
}

async fn collect(
    probes: &RwLock<Vec<Arc<dyn HealthProbe>>>,
    snapshot: &RwLock<HashMap<String, HealthStatus>>,
) {
    let targets: Vec<Arc<dyn HealthProbe>> = probes.read().clone();
    for probe in targets {
        let healthy = probe.probe().await;
        if !healthy {
            warn!(probe = probe.name(), "health probe reported unhealthy");
        }
        snapshot.write().insert(
            probe.name().to_string(),
            HealthStatus {
                healthy,
                checked_at: SystemTime::now(),
            },
        );
    }
}

#[async_trait]
impl HealthProbe for ConnectionManager {
    fn name(&self) -> &str {
        "connection_manager"
    }

    async fn probe(&self) -> bool {
        self.health_check().await
    }
}

#[async_trait]
impl HealthProbe for ResilientManager {
    fn name(&self) -> &str {
        "resilient_manager"
    }

    async fn probe(&self) -> bool {
        self.health_check_with_retry().await
    }
}
