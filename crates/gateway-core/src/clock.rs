//! Monotonic time source and cancellable deadlines.
//!
//! Every timing-sensitive operation in the gateway — rate limiter windows,
//! breaker `wait_duration_in_open`, pool acquire timeouts, maintenance ticks —
//! flows through a [`Clock`] instead of calling `Instant::now()` or
//! `tokio::time::sleep` directly, so tests can swap in a [`TestClock`] and
//! drive time deterministically instead of sleeping in wall-clock
//! milliseconds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// A point in time, relative to a [`Clock`]'s epoch, in whole milliseconds.
pub type Millis = u64;

/// Monotonic time source injected into every component that needs to sleep,
/// measure elapsed time, or schedule a deadline.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current time since this clock's epoch, in milliseconds.
    fn now_ms(&self) -> Millis;

    /// Sleeps for `ms` milliseconds, or returns early if `cancel` is
    /// triggered. Returns `true` if the sleep completed, `false` if it was
    /// cancelled.
    fn sleep<'a>(
        &'a self,
        ms: u64,
        cancel: &'a CancellationToken,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = bool> + Send + 'a>>;

    /// Creates a [`Deadline`] `ms` milliseconds from now.
    fn deadline(&self, ms: u64) -> Deadline {
        Deadline {
            target_ms: self.now_ms().saturating_add(ms),
        }
    }
}

/// A target instant, observable by waiters without exposing cancellation
/// machinery to every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    target_ms: Millis,
}

impl Deadline {
    /// Milliseconds remaining until this deadline, as observed by `clock`.
    /// Zero once the deadline has passed.
    pub fn remaining_ms(&self, clock: &dyn Clock) -> u64 {
        self.target_ms.saturating_sub(clock.now_ms())
    }

    /// True once `clock`'s current time has reached or passed the deadline.
    pub fn is_expired(&self, clock: &dyn Clock) -> bool {
        clock.now_ms() >= self.target_ms
    }

    /// The deadline closer to "now": `min(self, other)`.
    pub fn min(self, other: Deadline) -> Deadline {
        Deadline {
            target_ms: self.target_ms.min(other.target_ms),
        }
    }
}

/// Real-time [`Clock`] backed by `tokio::time`.
#[derive(Debug, Clone, Default)]
pub struct SystemClock {
    epoch: std::time::Instant,
}

impl SystemClock {
    /// Creates a new system clock with its epoch at the current instant.
    pub fn new() -> Self {
        Self {
            epoch: std::time::Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> Millis {
        self.epoch.elapsed().as_millis() as u64
    }

    fn sleep<'a>(
        &'a self,
        ms: u64,
        cancel: &'a CancellationToken,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = bool> + Send + 'a>> {
        Box::pin(async move {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(ms)) => true,
                _ = cancel.cancelled() => false,
            }
        })
    }
}

/// Manually-advanced [`Clock`] for deterministic tests.
///
/// `sleep` resolves as soon as the clock is advanced past the requested
/// deadline (via [`TestClock::advance`]), or immediately if `cancel` fires
/// first. No real time passes.
#[derive(Debug, Clone)]
pub struct TestClock {
    now_ms: Arc<AtomicU64>,
    notify: Arc<tokio::sync::Notify>,
}

impl TestClock {
    /// Creates a test clock starting at time zero.
    pub fn new() -> Self {
        Self {
            now_ms: Arc::new(AtomicU64::new(0)),
            notify: Arc::new(tokio::sync::Notify::new()),
        }
    }

    /// Advances the clock by `ms` milliseconds and wakes any sleepers whose
    /// deadline has now passed.
    pub fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
        self.notify.notify_waiters();
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TestClock {
    fn now_ms(&self) -> Millis {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn sleep<'a>(
        &'a self,
        ms: u64,
        cancel: &'a CancellationToken,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = bool> + Send + 'a>> {
        let target = self.now_ms().saturating_add(ms);
        Box::pin(async move {
            loop {
                if self.now_ms() >= target {
                    return true;
                }
                tokio::select! {
                    _ = self.notify.notified() => continue,
                    _ = cancel.cancelled() => return false,
                }
            }
        })
    }
}
