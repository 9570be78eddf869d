//! Events emitted by a [`crate::SessionPool`].

use std::time::Instant;

/// A single pool event, paired with its pool name and timestamp before being
/// emitted through `gateway_core`'s event system.
#[derive(Debug, Clone)]
pub enum PoolEvent {
    Acquired { wait_ms: u64, reused: bool },
    AcquireTimedOut,
    AcquireRejectedBreakerOpen,
    SessionCreated,
    SessionCreationFailed { attempts: usize },
    SessionEvicted { reason: EvictionReason },
    Resized { min_size: usize, max_size: usize },
    ShutdownStarted,
    ShutdownCompleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
    InvocationFailed,
    PrePingFailed,
    RecycleAge,
    Shutdown,
    OverCapacity,
}

impl PoolEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            PoolEvent::Acquired { .. } => "acquired",
            PoolEvent::AcquireTimedOut => "acquire_timed_out",
            PoolEvent::AcquireRejectedBreakerOpen => "acquire_rejected_breaker_open",
            PoolEvent::SessionCreated => "session_created",
            PoolEvent::SessionCreationFailed { .. } => "session_creation_failed",
            PoolEvent::SessionEvicted { .. } => "session_evicted",
            PoolEvent::Resized { .. } => "resized",
            PoolEvent::ShutdownStarted => "shutdown_started",
            PoolEvent::ShutdownCompleted => "shutdown_completed",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct TimestampedPoolEvent {
    pub pool_name: String,
    pub timestamp: Instant,
    pub event: PoolEvent,
}

impl gateway_core::events::ResilienceEvent for TimestampedPoolEvent {
    fn event_type(&self) -> &'static str {
        self.event.event_type()
    }
    fn timestamp(&self) -> Instant {
        self.timestamp
    }
    fn pattern_name(&self) -> &str {
        &self.pool_name
    }
}
