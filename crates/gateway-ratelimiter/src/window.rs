//! Sliding-window admission state.
//!
//! Three interchangeable window implementations trade memory for precision:
//! [`SlidingLog`] is exact and keeps one timestamp per admitted request,
//! [`FixedWindow`] is O(1) but allows bursts across a period boundary, and
//! [`SlidingCounter`] approximates the sliding log at O(1) memory by blending
//! the current and previous fixed buckets.

use std::collections::VecDeque;

/// Selects which [`RateWindow`] implementation backs a [`crate::RateLimiter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    /// Exact sliding window over a deque of timestamps. Default.
    SlidingLog,
    /// Resets all permits at fixed period boundaries.
    FixedWindow,
    /// Weighted blend of current/previous fixed buckets.
    SlidingCounter,
}

impl Default for WindowKind {
    fn default() -> Self {
        WindowKind::SlidingLog
    }
}

/// Outcome of a single admission check against the window, expressed purely
/// in terms of "now" (`now_ms`) so callers supply time rather than the
/// window reaching for a clock itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The request is admitted now.
    Admitted,
    /// The request must wait `wait_ms` before the next retry is worth
    /// attempting.
    Wait { wait_ms: u64 },
}

/// Common interface implemented by every window strategy.
trait RateWindowImpl: std::fmt::Debug + Send {
    fn try_admit(&mut self, now_ms: u64) -> Admission;
    fn available(&self, now_ms: u64) -> usize;
}

#[derive(Debug)]
struct SlidingLogState {
    max_requests: usize,
    window_ms: u64,
    log: VecDeque<u64>,
}

impl SlidingLogState {
    fn new(max_requests: usize, window_ms: u64) -> Self {
        Self {
            max_requests,
            window_ms,
            log: VecDeque::with_capacity(max_requests),
        }
    }

    fn evict_expired(&mut self, now_ms: u64) {
        let floor = now_ms.saturating_sub(self.window_ms);
        while let Some(&oldest) = self.log.front() {
            if oldest <= floor {
                self.log.pop_front();
            } else {
                break;
            }
        }
    }
}

impl RateWindowImpl for SlidingLogState {
    fn try_admit(&mut self, now_ms: u64) -> Admission {
        self.evict_expired(now_ms);
        if self.log.len() < self.max_requests {
            self.log.push_back(now_ms);
            return Admission::Admitted;
        }
        let oldest = *self.log.front().expect("len >= max_requests > 0");
        let expires_at = oldest.saturating_add(self.window_ms);
        Admission::Wait {
            wait_ms: expires_at.saturating_sub(now_ms),
        }
    }

    fn available(&self, now_ms: u64) -> usize {
        let floor = now_ms.saturating_sub(self.window_ms);
        let in_window = self.log.iter().filter(|&&t| t > floor).count();
        self.max_requests.saturating_sub(in_window)
    }
}

#[derive(Debug)]
struct FixedWindowState {
    max_requests: usize,
    window_ms: u64,
    used: usize,
    period_start_ms: u64,
}

impl FixedWindowState {
    fn new(max_requests: usize, window_ms: u64) -> Self {
        Self {
            max_requests,
            window_ms,
            used: 0,
            period_start_ms: 0,
        }
    }

    fn maybe_refresh(&mut self, now_ms: u64) {
        if now_ms.saturating_sub(self.period_start_ms) >= self.window_ms {
            self.used = 0;
            self.period_start_ms = now_ms;
        }
    }
}

impl RateWindowImpl for FixedWindowState {
    fn try_admit(&mut self, now_ms: u64) -> Admission {
        self.maybe_refresh(now_ms);
        if self.used < self.max_requests {
            self.used += 1;
            return Admission::Admitted;
        }
        let next_period = self.period_start_ms.saturating_add(self.window_ms);
        Admission::Wait {
            wait_ms: next_period.saturating_sub(now_ms),
        }
    }

    fn available(&self, now_ms: u64) -> usize {
        if now_ms.saturating_sub(self.period_start_ms) >= self.window_ms {
            self.max_requests
        } else {
            self.max_requests.saturating_sub(self.used)
        }
    }
}

#[derive(Debug)]
struct SlidingCounterState {
    max_requests: usize,
    bucket_ms: u64,
    previous: usize,
    current: usize,
    bucket_start_ms: u64,
}

impl SlidingCounterState {
    fn new(max_requests: usize, bucket_ms: u64) -> Self {
        Self {
            max_requests,
            bucket_ms,
            previous: 0,
            current: 0,
            bucket_start_ms: 0,
        }
    }

    fn maybe_rotate(&mut self, now_ms: u64) {
        let elapsed = now_ms.saturating_sub(self.bucket_start_ms);
        if elapsed >= self.bucket_ms {
            let buckets_passed = elapsed / self.bucket_ms.max(1);
            if buckets_passed >= 2 {
                self.previous = 0;
                self.current = 0;
            } else {
                self.previous = self.current;
                self.current = 0;
            }
            self.bucket_start_ms = now_ms;
        }
    }

    fn elapsed_ratio(&self, now_ms: u64) -> f64 {
        let elapsed = now_ms.saturating_sub(self.bucket_start_ms) as f64;
        (elapsed / self.bucket_ms.max(1) as f64).clamp(0.0, 1.0)
    }

    fn weighted_count(&self, now_ms: u64) -> f64 {
        let ratio = self.elapsed_ratio(now_ms);
        self.previous as f64 * (1.0 - ratio) + self.current as f64
    }
}

impl RateWindowImpl for SlidingCounterState {
    fn try_admit(&mut self, now_ms: u64) -> Admission {
        self.maybe_rotate(now_ms);
        if self.weighted_count(now_ms) < self.max_requests as f64 {
            self.current += 1;
            return Admission::Admitted;
        }

        // Estimate the wait until the previous bucket's weighted contribution
        // has decayed enough to free a slot.
        let ratio = self.elapsed_ratio(now_ms);
        if self.previous == 0 {
            let remaining_ms = (self.bucket_ms as f64 * (1.0 - ratio)) as u64;
            return Admission::Wait {
                wait_ms: remaining_ms,
            };
        }
        let limit = self.max_requests as f64;
        let target_ratio = (self.previous as f64 + self.current as f64 - limit + 0.1)
            / self.previous as f64;
        let wait_ms = if target_ratio <= ratio {
            0
        } else if target_ratio >= 1.0 {
            (self.bucket_ms as f64 * (1.0 - ratio)) as u64
        } else {
            ((target_ratio - ratio) * self.bucket_ms as f64) as u64
        };
        Admission::Wait { wait_ms }
    }

    fn available(&self, now_ms: u64) -> usize {
        self.max_requests
            .saturating_sub(self.weighted_count(now_ms).ceil() as usize)
    }
}

/// Time-ordered admission window bounding concurrent throughput to
/// `max_requests` per `window_ms`.
#[derive(Debug)]
pub struct RateWindow {
    inner: Box<dyn RateWindowImpl>,
}

impl RateWindow {
    pub fn new(kind: WindowKind, max_requests: usize, window_ms: u64) -> Self {
        let inner: Box<dyn RateWindowImpl> = match kind {
            WindowKind::SlidingLog => Box::new(SlidingLogState::new(max_requests, window_ms)),
            WindowKind::FixedWindow => Box::new(FixedWindowState::new(max_requests, window_ms)),
            WindowKind::SlidingCounter => {
                Box::new(SlidingCounterState::new(max_requests, window_ms))
            }
        };
        Self { inner }
    }

    pub fn try_admit(&mut self, now_ms: u64) -> Admission {
        self.inner.try_admit(now_ms)
    }

    pub fn available(&self, now_ms: u64) -> usize {
        self.inner.available(now_ms)
    }
}
