//! Events emitted by [`crate::CircuitBreaker`] state transitions and calls.

use crate::circuit::CircuitState;

/// A single breaker event, paired with its pattern name and timestamp by
/// [`crate::circuit::TimestampedBreakerEvent`] before being emitted through
/// `gateway_core`'s event system.
#[derive(Debug, Clone, Copy)]
pub enum BreakerEvent {
    StateTransition {
        from_state: CircuitState,
        to_state: CircuitState,
    },
    CallPermitted {
        state: CircuitState,
    },
    CallRejected {
        state: CircuitState,
    },
    SuccessRecorded {
        state: CircuitState,
    },
    FailureRecorded {
        state: CircuitState,
    },
}

impl BreakerEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            BreakerEvent::StateTransition { .. } => "state_transition",
            BreakerEvent::CallPermitted { .. } => "call_permitted",
            BreakerEvent::CallRejected { .. } => "call_rejected",
            BreakerEvent::SuccessRecorded { .. } => "success_recorded",
            BreakerEvent::FailureRecorded { .. } => "failure_recorded",
        }
    }
}
