//! Periodic storage reorganization, triggered by the number of posts written.
//!
//! Every time the running total of inserted posts crosses a multiple of the
//! configured interval, one reorganization is started in the background. It
//! never delays or fails the write that triggered it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use domains::StorageMaintenance;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Clone)]
pub struct MaintenanceCounter {
    inner: Arc<Inner>,
}

struct Inner {
    inserted: AtomicU64,
    every: u64,
    target: Arc<dyn StorageMaintenance>,
}

impl MaintenanceCounter {
    /// `every == 0` disables reorganization.
    pub fn new(target: Arc<dyn StorageMaintenance>, every: u64) -> Self {
        Self {
            inner: Arc::new(Inner {
                inserted: AtomicU64::new(0),
                every,
                target,
            }),
        }
    }

    pub fn inserted(&self) -> u64 {
        self.inner.inserted.load(Ordering::Relaxed)
    }

    /// Adds `count` to the running total; true when that crossed an interval
    /// boundary.
    pub fn record(&self, count: usize) -> bool {
        let every = self.inner.every;
        if every == 0 || count == 0 {
            return false;
        }
        let count = count as u64;
        let before = self.inner.inserted.fetch_add(count, Ordering::Relaxed);
        before / every != (before + count) / every
    }

    /// Records `count` inserted posts and, on a boundary, spawns a
    /// reorganization. Must be called from within a Tokio runtime.
    pub fn maybe_reorganize(&self, count: usize) -> Option<JoinHandle<()>> {
        if !self.record(count) {
            return None;
        }
        let target = self.inner.target.clone();
        let inserted = self.inserted();
        Some(tokio::spawn(async move {
            info!(inserted, "reorganizing post storage");
            match target.reorganize().await {
                Ok(()) => info!("post storage reorganized"),
                Err(err) => warn!(error = %err, "post storage reorganization failed"),
            }
        }))
    }
}
