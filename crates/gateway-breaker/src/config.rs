use crate::circuit::TimestampedBreakerEvent;
use crate::events::BreakerEvent;
use gateway_core::events::{EventListeners, FnListener};

/// Configuration for a [`crate::CircuitBreaker`].
pub struct CircuitBreakerConfig {
    pub(crate) failure_threshold: usize,
    pub(crate) wait_duration_ms: u64,
    pub(crate) half_open_max_calls: usize,
    pub(crate) event_listeners: EventListeners<TimestampedBreakerEvent>,
    pub(crate) name: String,
}

/// Builder for [`CircuitBreakerConfig`].
pub struct CircuitBreakerConfigBuilder {
    failure_threshold: usize,
    wait_duration_ms: u64,
    half_open_max_calls: usize,
    event_listeners: EventListeners<TimestampedBreakerEvent>,
    name: String,
}

impl Default for CircuitBreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitBreakerConfigBuilder {
    /// Creates a new builder with defaults: `failure_threshold = 5`,
    /// `wait_duration_ms = 60_000`, `half_open_max_calls = 3`, matching the
    /// original breaker this was distilled from.
    pub fn new() -> Self {
        Self {
            failure_threshold: 5,
            wait_duration_ms: 60_000,
            half_open_max_calls: 3,
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Number of consecutive failures before the breaker opens.
    pub fn failure_threshold(mut self, threshold: usize) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// How long the breaker stays open before admitting a half-open probe.
    pub fn wait_duration_ms(mut self, ms: u64) -> Self {
        self.wait_duration_ms = ms;
        self
    }

    /// Admissions permitted while half-open; closing requires this many
    /// recorded successes.
    pub fn half_open_max_calls(mut self, calls: usize) -> Self {
        self.half_open_max_calls = calls;
        self
    }

    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(crate::circuit::CircuitState, crate::circuit::CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |e: &TimestampedBreakerEvent| {
                if let BreakerEvent::StateTransition {
                    from_state,
                    to_state,
                } = e.event
                {
                    f(from_state, to_state);
                }
            }));
        self
    }

    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |e: &TimestampedBreakerEvent| {
                if matches!(e.event, BreakerEvent::CallRejected { .. }) {
                    f();
                }
            }));
        self
    }

    /// Builds the configuration. Panics if `half_open_max_calls` is zero,
    /// since a half-open breaker could never admit a recovery probe.
    pub fn build(self) -> CircuitBreakerConfig {
        assert!(
            self.half_open_max_calls > 0,
            "half_open_max_calls must be at least 1"
        );
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            wait_duration_ms: self.wait_duration_ms,
            half_open_max_calls: self.half_open_max_calls,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}
