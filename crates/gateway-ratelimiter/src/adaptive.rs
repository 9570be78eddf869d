//! Periodic success/failure-rate based adjustment of `max_requests`.
//!
//! Evaluates a batch of `N` admission outcomes at once and nudges the limit
//! up or down by a multiplicative factor.

use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, Copy)]
pub struct AdaptiveConfig {
    pub enabled: bool,
    pub batch_size: usize,
    pub alpha: f64,
    pub min_requests: usize,
    pub max_requests_limit: usize,
    pub grow_threshold: f64,
    pub shrink_threshold: f64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            batch_size: 100,
            alpha: 0.1,
            min_requests: 1,
            max_requests_limit: usize::MAX,
            grow_threshold: 0.95,
            shrink_threshold: 0.10,
        }
    }
}

/// Tracks admitted/rejected counts since the last batch evaluation and
/// reports the new limit once `batch_size` operations have accumulated.
#[derive(Debug)]
pub struct AdaptiveState {
    config: AdaptiveConfig,
    admitted: AtomicUsize,
    rejected: AtomicUsize,
}

impl AdaptiveState {
    pub fn new(config: AdaptiveConfig) -> Self {
        Self {
            config,
            admitted: AtomicUsize::new(0),
            rejected: AtomicUsize::new(0),
        }
    }

    /// Records one outcome; returns `Some(new_limit)` once the batch fills
    /// and an adjustment was triggered, given the `current_limit`.
    pub fn record(&self, admitted: bool, current_limit: usize) -> Option<usize> {
        if !self.config.enabled {
            return None;
        }
        let (a, r) = if admitted {
            (
                self.admitted.fetch_add(1, Ordering::SeqCst) + 1,
                self.rejected.load(Ordering::SeqCst),
            )
        } else {
            (
                self.admitted.load(Ordering::SeqCst),
                self.rejected.fetch_add(1, Ordering::SeqCst) + 1,
            )
        };
        let total = a + r;
        if total < self.config.batch_size {
            return None;
        }

        self.admitted.store(0, Ordering::SeqCst);
        self.rejected.store(0, Ordering::SeqCst);

        let success_rate = a as f64 / total as f64;
        let failure_rate = r as f64 / total as f64;

        if success_rate > self.config.grow_threshold {
            let grown = ((current_limit as f64) * (1.0 + self.config.alpha)).ceil() as usize;
            Some(grown.min(self.config.max_requests_limit).max(current_limit))
        } else if failure_rate > self.config.shrink_threshold {
            let shrunk = ((current_limit as f64) * (1.0 - self.config.alpha)).floor() as usize;
            Some(shrunk.max(self.config.min_requests).min(current_limit))
        } else {
            None
        }
    }
}
