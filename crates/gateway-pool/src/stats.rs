//! Pool-wide counters (part of the data model's `PoolStats` entity).

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonically non-decreasing counters for one pool, except via an
/// explicit reset. `active`/`available` are live gauges, not counters.
#[derive(Default)]
pub struct PoolStats {
    active: AtomicU64,
    available: AtomicU64,
    total_acquisitions: AtomicU64,
    total_releases: AtomicU64,
    total_timeouts: AtomicU64,
    total_errors: AtomicU64,
}

/// Point-in-time snapshot of [`PoolStats`], safe to hand out to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatsSnapshot {
    pub active: u64,
    pub available: u64,
    pub total_acquisitions: u64,
    pub total_releases: u64,
    pub total_timeouts: u64,
    pub total_errors: u64,
}

impl PoolStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> PoolStatsSnapshot {
        PoolStatsSnapshot {
            active: self.active.load(Ordering::Relaxed),
            available: self.available.load(Ordering::Relaxed),
            total_acquisitions: self.total_acquisitions.load(Ordering::Relaxed),
            total_releases: self.total_releases.load(Ordering::Relaxed),
            total_timeouts: self.total_timeouts.load(Ordering::Relaxed),
            total_errors: self.total_errors.load(Ordering::Relaxed),
        }
    }

    pub fn set_active(&self, value: u64) {
        self.active.store(value, Ordering::Relaxed);
    }

    pub fn set_available(&self, value: u64) {
        self.available.store(value, Ordering::Relaxed);
    }

    pub fn record_acquisition(&self) {
        self.total_acquisitions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_release(&self) {
        self.total_releases.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.total_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.total_errors.fetch_add(1, Ordering::Relaxed);
    }
}
