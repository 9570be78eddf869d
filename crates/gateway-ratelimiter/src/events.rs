//! Observability events emitted by the rate limiter.

use gateway_core::events::ResilienceEvent;
use std::time::Instant;

/// Events emitted while admitting or rejecting a request.
#[derive(Debug, Clone)]
pub enum RateLimiterEvent {
    /// A request was admitted, possibly after waiting.
    PermitAcquired {
        pattern_name: String,
        timestamp: Instant,
        wait_ms: u64,
    },
    /// A request was throttled: no permit within the requested wait.
    PermitRejected {
        pattern_name: String,
        timestamp: Instant,
        timeout_ms: u64,
    },
    /// The adaptive variant adjusted `max_requests` after its periodic
    /// evaluation.
    LimitAdjusted {
        pattern_name: String,
        timestamp: Instant,
        old_limit: usize,
        new_limit: usize,
    },
}

impl ResilienceEvent for RateLimiterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RateLimiterEvent::PermitAcquired { .. } => "permit_acquired",
            RateLimiterEvent::PermitRejected { .. } => "permit_rejected",
            RateLimiterEvent::LimitAdjusted { .. } => "limit_adjusted",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RateLimiterEvent::PermitAcquired { timestamp, .. } => *timestamp,
            RateLimiterEvent::PermitRejected { timestamp, .. } => *timestamp,
            RateLimiterEvent::LimitAdjusted { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            RateLimiterEvent::PermitAcquired { pattern_name, .. } => pattern_name,
            RateLimiterEvent::PermitRejected { pattern_name, .. } => pattern_name,
            RateLimiterEvent::LimitAdjusted { pattern_name, .. } => pattern_name,
        }
    }
}
