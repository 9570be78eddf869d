//! Observability events emitted once per dispatch (§4.8).

use gateway_core::error::ErrorKind;
use std::time::Instant;

/// One dispatch-lifecycle event. Exactly one terminal variant
/// (`Completed` or `Failed`) is emitted per [`crate::Dispatcher::dispatch`]
/// call, with any number of `Retried` events preceding it.
#[derive(Debug, Clone)]
pub enum DispatchEvent {
    /// A retryable error was observed and another attempt will be made.
    Retried { attempt: u32, kind: ErrorKind },
    /// The request completed successfully.
    Completed { attempts: u32, total_ms: u64 },
    /// The request failed terminally, after exhausting retries or hitting a
    /// non-retryable error.
    Failed { attempts: u32, total_ms: u64, kind: ErrorKind },
}

impl DispatchEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            DispatchEvent::Retried { .. } => "retried",
            DispatchEvent::Completed { .. } => "completed",
            DispatchEvent::Failed { .. } => "failed",
        }
    }
}

/// Wraps a [`DispatchEvent`] with the target name and timestamp the core
/// event system requires.
#[derive(Debug, Clone)]
pub(crate) struct TimestampedDispatchEvent {
    pub target: String,
    pub timestamp: Instant,
    pub event: DispatchEvent,
}

impl gateway_core::events::ResilienceEvent for TimestampedDispatchEvent {
    fn event_type(&self) -> &'static str {
        self.event.event_type()
    }
    fn timestamp(&self) -> Instant {
        self.timestamp
    }
    fn pattern_name(&self) -> &str {
        &self.target
    }
}
