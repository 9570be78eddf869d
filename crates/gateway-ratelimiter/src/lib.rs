//! Sliding-window admission control for the gateway's dispatch engine.
//!
//! [`RateLimiter`] bounds admitted requests to `max_requests` per
//! `window_ms`, selectable between three window implementations (see
//! [`window::WindowKind`]), with an optional adaptive variant that grows or
//! shrinks `max_requests` based on a periodic success/failure-rate
//! evaluation (see [`adaptive`]).
//!
//! # Examples
//!
//! ```
//! use gateway_ratelimiter::{RateLimiter, RateLimiterConfigBuilder};
//! use gateway_core::SystemClock;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let config = RateLimiterConfigBuilder::new()
//!     .max_requests(100)
//!     .window_ms(1000)
//!     .on_permit_rejected(|timeout| {
//!         println!("throttled, timeout was {timeout}ms");
//!     })
//!     .build();
//!
//! let limiter = RateLimiter::new(config, Arc::new(SystemClock::new()));
//! let admitted = limiter.try_acquire();
//! # let _ = admitted;
//! # }
//! ```

pub mod adaptive;
pub mod config;
pub mod events;
pub mod window;

pub use config::{RateLimiterConfig, RateLimiterConfigBuilder};
pub use events::RateLimiterEvent;
pub use window::WindowKind;

use adaptive::AdaptiveState;
use gateway_core::{Clock, Deadline};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use window::{Admission, RateWindow};

/// Sliding-window rate limiter. Never fails except by timeout: admission
/// either succeeds immediately, succeeds after waiting, or returns `false`
/// once the requested wait is exhausted.
pub struct RateLimiter {
    window: Mutex<RateWindow>,
    adaptive: AdaptiveState,
    config: Arc<RateLimiterConfig>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Creates a new rate limiter from `config`, using `clock` as its time
    /// source.
    pub fn new(config: RateLimiterConfig, clock: Arc<dyn Clock>) -> Self {
        let window = RateWindow::new(config.window_kind, config.max_requests, config.window_ms);
        let adaptive = AdaptiveState::new(config.adaptive);
        Self {
            window: Mutex::new(window),
            adaptive,
            config: Arc::new(config),
            clock,
        }
    }

    /// Attempts admission without waiting.
    pub fn try_acquire(&self) -> bool {
        let now_ms = self.clock.now_ms();
        let admission = {
            let mut window = self.window.lock().unwrap();
            window.try_admit(now_ms)
        };
        let admitted = matches!(admission, Admission::Admitted);
        self.record_outcome(admitted);
        admitted
    }

    /// Attempts admission, waiting up to `timeout_ms` (if given) for the
    /// window to free a slot. Returns `false` iff the wait elapsed (or was
    /// cancelled via `cancel`) without admission.
    pub async fn acquire(&self, timeout_ms: Option<u64>, cancel: &CancellationToken) -> bool {
        let deadline = timeout_ms.map(|ms| self.clock.deadline(ms));

        loop {
            let now_ms = self.clock.now_ms();
            let admission = {
                let mut window = self.window.lock().unwrap();
                window.try_admit(now_ms)
            };

            match admission {
                Admission::Admitted => {
                    self.record_outcome(true);
                    return true;
                }
                Admission::Wait { wait_ms } => {
                    let wait_ms = match &deadline {
                        Some(d) if d.is_expired(self.clock.as_ref()) => {
                            self.record_outcome(false);
                            self.emit_rejected(timeout_ms.unwrap_or(0));
                            return false;
                        }
                        Some(d) => wait_ms.min(d.remaining_ms(self.clock.as_ref())),
                        None => {
                            // No deadline: still bounded by the window's own
                            // estimate so we never spin.
                            wait_ms
                        }
                    };

                    if timeout_ms.is_none() && wait_ms == 0 {
                        // Avoid a busy loop if the window reports no wait
                        // but didn't admit (shouldn't normally happen).
                        self.record_outcome(false);
                        return false;
                    }

                    if !self.clock.sleep(wait_ms, cancel).await {
                        self.record_outcome(false);
                        return false;
                    }
                }
            }
        }
    }

    fn record_outcome(&self, admitted: bool) {
        let current_limit = self.config.max_requests;
        if let Some(new_limit) = self.adaptive.record(admitted, current_limit) {
            self.config.event_listeners.emit(&RateLimiterEvent::LimitAdjusted {
                pattern_name: self.config.name.clone(),
                timestamp: Instant::now(),
                old_limit: current_limit,
                new_limit,
            });
            let mut window = self.window.lock().unwrap();
            *window = RateWindow::new(self.config.window_kind, new_limit, self.config.window_ms);
        }

        if admitted {
            self.config.event_listeners.emit(&RateLimiterEvent::PermitAcquired {
                pattern_name: self.config.name.clone(),
                timestamp: Instant::now(),
                wait_ms: 0,
            });
        }
    }

    fn emit_rejected(&self, timeout_ms: u64) {
        self.config.event_listeners.emit(&RateLimiterEvent::PermitRejected {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            timeout_ms,
        });
    }

    /// Number of admissions still available in the current window.
    pub fn available(&self) -> usize {
        let now_ms = self.clock.now_ms();
        self.window.lock().unwrap().available(now_ms)
    }
}
