//! Per-upstream circuit breaker for the gateway's dispatch engine.
//!
//! [`CircuitBreaker`] tracks consecutive failures on a single upstream
//! session or target. It opens after `failure_threshold` consecutive
//! failures, rejecting calls until `wait_duration_ms` elapses, then admits
//! a bounded number of half-open probes (see [`circuit::CircuitState`]).
//! Unlike a rate-based breaker, state transitions depend only on the most
//! recent run of outcomes, not a sliding window of call history.
//!
//! # Examples
//!
//! ```
//! use gateway_breaker::{CircuitBreaker, CircuitBreakerConfigBuilder};
//! use gateway_core::SystemClock;
//! use std::sync::Arc;
//!
//! let config = CircuitBreakerConfigBuilder::new()
//!     .failure_threshold(5)
//!     .wait_duration_ms(30_000)
//!     .build();
//! let breaker = CircuitBreaker::new(config, Arc::new(SystemClock::new()));
//!
//! if breaker.try_acquire() {
//!     // call the upstream, then report the outcome
//!     breaker.record_success();
//! }
//! ```

pub mod circuit;
pub mod config;
pub mod events;

pub use circuit::{CircuitMetrics, CircuitState};
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use events::BreakerEvent;

use circuit::Circuit;
use gateway_core::Clock;
use std::sync::{Arc, Mutex};

/// Consecutive-failure circuit breaker guarding a single upstream.
///
/// State transitions are serialized behind an internal mutex: concurrent
/// callers observe a consistent sequence of admissions and outcomes, which
/// matters for the half-open probe count.
pub struct CircuitBreaker {
    circuit: Mutex<Circuit>,
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
}

impl CircuitBreaker {
    /// Creates a new breaker, starting closed.
    pub fn new(config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            circuit: Mutex::new(Circuit::new()),
            config,
            clock,
        }
    }

    /// Returns whether a call should be admitted right now. Must be paired
    /// with exactly one of [`Self::record_success`] or
    /// [`Self::record_failure`] when it returns `true`, so the half-open
    /// probe accounting stays correct.
    pub fn try_acquire(&self) -> bool {
        let now_ms = self.clock.now_ms();
        self.circuit.lock().unwrap().try_acquire(&self.config, now_ms)
    }

    /// Records a successful call outcome.
    pub fn record_success(&self) {
        let now_ms = self.clock.now_ms();
        self.circuit.lock().unwrap().record_success(&self.config, now_ms);
    }

    /// Records a failed call outcome.
    pub fn record_failure(&self) {
        let now_ms = self.clock.now_ms();
        self.circuit.lock().unwrap().record_failure(&self.config, now_ms);
    }

    /// Forces the breaker open regardless of failure count, e.g. in
    /// response to an external health signal.
    pub fn force_open(&self) {
        let now_ms = self.clock.now_ms();
        self.circuit.lock().unwrap().force_open(&self.config, now_ms);
    }

    /// Forces the breaker closed, clearing all counters.
    pub fn force_closed(&self) {
        let now_ms = self.clock.now_ms();
        self.circuit.lock().unwrap().force_closed(&self.config, now_ms);
    }

    /// Current state, for admission decisions made by callers (e.g. the
    /// session pool skipping an upstream without even calling
    /// [`Self::try_acquire`]).
    pub fn state(&self) -> CircuitState {
        self.circuit.lock().unwrap().state()
    }

    /// Point-in-time snapshot for observability.
    pub fn metrics(&self) -> CircuitMetrics {
        self.circuit.lock().unwrap().metrics()
    }

    /// Runs `f`, recording its outcome against the breaker. Rejects without
    /// calling `f` if the breaker is not currently admitting.
    pub async fn call<F, Fut, T, E>(&self, f: F) -> Result<T, gateway_core::GatewayError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        if !self.try_acquire() {
            return Err(gateway_core::GatewayError::CircuitOpen {
                retry_after_ms: None,
            });
        }
        match f().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(err) => {
                self.record_failure();
                Err(gateway_core::GatewayError::SessionInvocationError {
                    retryable: true,
                    source: err,
                })
            }
        }
    }
}
