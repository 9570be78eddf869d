//! Dispatcher configuration.

use crate::events::{DispatchEvent, TimestampedDispatchEvent};
use gateway_core::events::{EventListeners, FnListener};
use std::sync::Arc;

/// Determines whether a failed session invocation should be retried.
/// Consulted once per attempt that fails with a
/// [`gateway_core::GatewayError::SessionInvocationError`], including
/// [`crate::InvokeTimedOut`] once converted into the session's error type.
pub type RetryPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Configuration for a [`crate::Dispatcher`], generic over the upstream
/// session's error type so `retry_on` can inspect the concrete error.
#[derive(Clone)]
pub struct DispatcherConfig<E> {
    pub max_retries: u32,
    pub retry_base_ms: u64,
    pub invoke_timeout_ms: u64,
    pub acquire_timeout_ms: Option<u64>,
    pub admission_timeout_ms: Option<u64>,
    pub(crate) retry_predicate: Option<RetryPredicate<E>>,
    pub(crate) event_listeners: EventListeners<TimestampedDispatchEvent>,
}

impl<E> DispatcherConfig<E> {
    /// Whether `error` should be retried. Defaults to `true` when no
    /// predicate was configured, matching §4.8's "retryable=depends on
    /// sub-kind" guidance that an unclassified error is treated as
    /// retryable rather than silently swallowed.
    pub fn should_retry(&self, error: &E) -> bool {
        match &self.retry_predicate {
            Some(predicate) => predicate(error),
            None => true,
        }
    }
}

pub struct DispatcherConfigBuilder<E> {
    max_retries: u32,
    retry_base_ms: u64,
    invoke_timeout_ms: u64,
    acquire_timeout_ms: Option<u64>,
    admission_timeout_ms: Option<u64>,
    retry_predicate: Option<RetryPredicate<E>>,
    event_listeners: EventListeners<TimestampedDispatchEvent>,
}

impl<E> Default for DispatcherConfigBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> DispatcherConfigBuilder<E> {
    /// Defaults: `max_retries = 2`, `retry_base_ms = 50`,
    /// `invoke_timeout_ms = 5_000`, no acquisition or admission timeout
    /// (callers pass their own per-request deadline by setting these), and
    /// no retry predicate (every session error is retried until exhaustion).
    pub fn new() -> Self {
        Self {
            max_retries: 2,
            retry_base_ms: 50,
            invoke_timeout_ms: 5_000,
            acquire_timeout_ms: None,
            admission_timeout_ms: None,
            retry_predicate: None,
            event_listeners: EventListeners::new(),
        }
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn retry_base_ms(mut self, retry_base_ms: u64) -> Self {
        self.retry_base_ms = retry_base_ms;
        self
    }

    pub fn invoke_timeout_ms(mut self, invoke_timeout_ms: u64) -> Self {
        self.invoke_timeout_ms = invoke_timeout_ms;
        self
    }

    pub fn acquire_timeout_ms(mut self, ms: u64) -> Self {
        self.acquire_timeout_ms = Some(ms);
        self
    }

    pub fn admission_timeout_ms(mut self, ms: u64) -> Self {
        self.admission_timeout_ms = Some(ms);
        self
    }

    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&DispatchEvent) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |e: &TimestampedDispatchEvent| f(&e.event)));
        self
    }

    /// Sets a predicate to classify which session invocation errors are
    /// retryable. Errors for which this returns `false` are surfaced
    /// immediately rather than retried, even with attempts remaining.
    pub fn retry_on<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.retry_predicate = Some(Arc::new(predicate));
        self
    }

    pub fn build(self) -> DispatcherConfig<E> {
        DispatcherConfig {
            max_retries: self.max_retries,
            retry_base_ms: self.retry_base_ms,
            invoke_timeout_ms: self.invoke_timeout_ms,
            acquire_timeout_ms: self.acquire_timeout_ms,
            admission_timeout_ms: self.admission_timeout_ms,
            retry_predicate: self.retry_predicate,
            event_listeners: self.event_listeners,
        }
    }
}
