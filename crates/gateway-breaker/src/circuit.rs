//! Consecutive-failure circuit breaker state machine.

use crate::config::CircuitBreakerConfig;
use crate::events::BreakerEvent;
#[cfg(feature = "metrics")]
use metrics::counter;
use std::time::Instant;

/// The breaker's state, as described by the gateway's session pool
/// invariants: `closed` admits freely, `open` rejects until its wait
/// duration elapses, `half_open` admits a bounded number of probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

/// Point-in-time snapshot for observability/debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitMetrics {
    pub state: CircuitState,
    pub consecutive_failures: usize,
    pub half_open_in_flight: usize,
    pub half_open_successes: usize,
}

pub(crate) struct Circuit {
    state: CircuitState,
    consecutive_failures: usize,
    last_state_change_ms: u64,
    /// Admissions granted in the current half-open window, not yet resolved
    /// by a `record_success`/`record_failure`.
    half_open_in_flight: usize,
    half_open_successes: usize,
}

impl Circuit {
    pub(crate) fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            last_state_change_ms: 0,
            half_open_in_flight: 0,
            half_open_successes: 0,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn metrics(&self) -> CircuitMetrics {
        CircuitMetrics {
            state: self.state,
            consecutive_failures: self.consecutive_failures,
            half_open_in_flight: self.half_open_in_flight,
            half_open_successes: self.half_open_successes,
        }
    }

    /// Admission check. `now_ms` drives the `open -> half_open` transition;
    /// half-open admissions are counted here and released by `record_*`.
    pub fn try_acquire(&mut self, config: &CircuitBreakerConfig, now_ms: u64) -> bool {
        match self.state {
            CircuitState::Closed => {
                self.emit(config, BreakerEvent::CallPermitted { state: self.state });
                true
            }
            CircuitState::Open => {
                if now_ms.saturating_sub(self.last_state_change_ms) >= config.wait_duration_ms {
                    self.transition_to(CircuitState::HalfOpen, config, now_ms);
                    self.half_open_in_flight += 1;
                    self.emit(config, BreakerEvent::CallPermitted { state: self.state });
                    true
                } else {
                    self.emit(config, BreakerEvent::CallRejected { state: self.state });
                    false
                }
            }
            CircuitState::HalfOpen => {
                let in_flight_and_done = self.half_open_in_flight + self.half_open_successes;
                let permitted = in_flight_and_done < config.half_open_max_calls;
                if permitted {
                    self.half_open_in_flight += 1;
                    self.emit(config, BreakerEvent::CallPermitted { state: self.state });
                } else {
                    self.emit(config, BreakerEvent::CallRejected { state: self.state });
                }
                permitted
            }
        }
    }

    pub fn record_success(&mut self, config: &CircuitBreakerConfig, now_ms: u64) {
        self.emit(config, BreakerEvent::SuccessRecorded { state: self.state });
        #[cfg(feature = "metrics")]
        counter!("gateway_breaker_calls_total", "breaker" => config.name.clone(), "outcome" => "success").increment(1);

        match self.state {
            CircuitState::Closed => {
                self.consecutive_failures = 0;
            }
            CircuitState::HalfOpen => {
                self.half_open_in_flight = self.half_open_in_flight.saturating_sub(1);
                self.half_open_successes += 1;
                if self.half_open_successes >= config.half_open_max_calls {
                    self.transition_to(CircuitState::Closed, config, now_ms);
                }
            }
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&mut self, config: &CircuitBreakerConfig, now_ms: u64) {
        self.emit(config, BreakerEvent::FailureRecorded { state: self.state });
        #[cfg(feature = "metrics")]
        counter!("gateway_breaker_calls_total", "breaker" => config.name.clone(), "outcome" => "failure").increment(1);

        match self.state {
            CircuitState::Closed => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= config.failure_threshold {
                    self.transition_to(CircuitState::Open, config, now_ms);
                }
            }
            CircuitState::HalfOpen => {
                self.half_open_in_flight = self.half_open_in_flight.saturating_sub(1);
                self.transition_to(CircuitState::Open, config, now_ms);
            }
            CircuitState::Open => {}
        }
    }

    pub fn force_open(&mut self, config: &CircuitBreakerConfig, now_ms: u64) {
        self.transition_to(CircuitState::Open, config, now_ms);
    }

    pub fn force_closed(&mut self, config: &CircuitBreakerConfig, now_ms: u64) {
        self.transition_to(CircuitState::Closed, config, now_ms);
    }

    fn transition_to(&mut self, state: CircuitState, config: &CircuitBreakerConfig, now_ms: u64) {
        if self.state == state {
            return;
        }
        let from = self.state;

        self.emit(
            config,
            BreakerEvent::StateTransition {
                from_state: from,
                to_state: state,
            },
        );

        #[cfg(feature = "tracing")]
        tracing::info!(breaker = %config.name, from = ?from, to = ?state, "circuit state transition");

        #[cfg(feature = "metrics")]
        {
            counter!(
                "gateway_breaker_transitions_total",
                "breaker" => config.name.clone(),
                "from" => state_label(from),
                "to" => state_label(state)
            )
            .increment(1);
        }

        self.state = state;
        self.last_state_change_ms = now_ms;
        self.consecutive_failures = 0;
        self.half_open_in_flight = 0;
        self.half_open_successes = 0;
    }

    fn emit(&self, config: &CircuitBreakerConfig, event: BreakerEvent) {
        config.event_listeners.emit(&TimestampedBreakerEvent {
            pattern_name: config.name.clone(),
            timestamp: Instant::now(),
            event,
        });
    }
}

#[cfg(feature = "metrics")]
fn state_label(state: CircuitState) -> &'static str {
    match state {
        CircuitState::Closed => "closed",
        CircuitState::Open => "open",
        CircuitState::HalfOpen => "half_open",
    }
}

/// Wraps a [`BreakerEvent`] with the pattern name and timestamp the core
/// event system requires.
#[derive(Debug, Clone)]
pub(crate) struct TimestampedBreakerEvent {
    pub pattern_name: String,
    pub timestamp: Instant,
    pub event: BreakerEvent,
}

impl gateway_core::events::ResilienceEvent for TimestampedBreakerEvent {
    fn event_type(&self) -> &'static str {
        self.event.event_type()
    }
    fn timestamp(&self) -> Instant {
        self.timestamp
    }
    fn pattern_name(&self) -> &str {
        &self.pattern_name
    }
}
