//! Per-barclamp command serialization

use crowbar_types::BarclampId;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per barclamp, created on first use
#[derive(Debug, Default)]
pub(crate) struct BarclampLocks {
    locks: DashMap<BarclampId, Arc<Mutex<()>>>,
}

impl BarclampLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a barclamp's deployments
    pub(crate) async fn acquire(&self, barclamp_id: &BarclampId) -> OwnedMutexGuard<()> {
        // Clone out of the map so the shard lock is not held across the await
        let lock = self.locks.entry(barclamp_id.clone()).or_default().clone();
        lock.lock_owned().await
    }
}
