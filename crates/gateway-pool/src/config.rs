//! Pool configuration and its validated invariants.

use crate::events::TimestampedPoolEvent;
use crate::strategy::SelectionStrategy;
use gateway_core::events::{EventListeners, FnListener};

/// Configuration for one [`crate::SessionPool`].
///
/// Invariants, enforced by [`SessionConfigBuilder::build`]:
/// `1 <= min_size <= size <= max_size <= 10_000`, `timeout_ms > 0`,
/// `recycle_ms >= 0`.
#[derive(Clone)]
pub struct SessionConfig {
    pub size: usize,
    pub min_size: usize,
    pub max_size: usize,
    pub timeout_ms: u64,
    pub recycle_ms: u64,
    pub pre_ping: bool,
    pub strategy: SelectionStrategy,
    pub auto_adjust: bool,
    pub response_threshold_ms: u64,
    pub create_retries: u32,
    pub(crate) event_listeners: EventListeners<TimestampedPoolEvent>,
    pub(crate) name: String,
}

/// Errors surfaced when building a [`SessionConfig`] with invalid bounds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionConfigError {
    #[error("min_size must be at least 1, got {0}")]
    MinSizeTooSmall(usize),
    #[error("size ({size}) must be between min_size ({min_size}) and max_size ({max_size})")]
    SizeOutOfBounds {
        size: usize,
        min_size: usize,
        max_size: usize,
    },
    #[error("max_size ({0}) must not exceed 10_000")]
    MaxSizeTooLarge(usize),
    #[error("timeout_ms must be greater than 0")]
    ZeroTimeout,
}

pub struct SessionConfigBuilder {
    size: usize,
    min_size: usize,
    max_size: usize,
    timeout_ms: u64,
    recycle_ms: u64,
    pre_ping: bool,
    strategy: SelectionStrategy,
    auto_adjust: bool,
    response_threshold_ms: u64,
    create_retries: u32,
    event_listeners: EventListeners<TimestampedPoolEvent>,
    name: String,
}

impl Default for SessionConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionConfigBuilder {
    pub fn new() -> Self {
        Self {
            size: 10,
            min_size: 1,
            max_size: 20,
            timeout_ms: 5_000,
            recycle_ms: 0,
            pre_ping: true,
            strategy: SelectionStrategy::RoundRobin,
            auto_adjust: false,
            response_threshold_ms: 1_000,
            create_retries: 2,
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn min_size(mut self, min_size: usize) -> Self {
        self.min_size = min_size;
        self
    }

    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn recycle_ms(mut self, recycle_ms: u64) -> Self {
        self.recycle_ms = recycle_ms;
        self
    }

    pub fn pre_ping(mut self, pre_ping: bool) -> Self {
        self.pre_ping = pre_ping;
        self
    }

    pub fn strategy(mut self, strategy: SelectionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn auto_adjust(mut self, auto_adjust: bool) -> Self {
        self.auto_adjust = auto_adjust;
        self
    }

    pub fn response_threshold_ms(mut self, ms: u64) -> Self {
        self.response_threshold_ms = ms;
        self
    }

    pub fn create_retries(mut self, retries: u32) -> Self {
        self.create_retries = retries;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&crate::events::PoolEvent) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |e: &TimestampedPoolEvent| f(&e.event)));
        self
    }

    pub fn build(self) -> Result<SessionConfig, SessionConfigError> {
        if self.min_size < 1 {
            return Err(SessionConfigError::MinSizeTooSmall(self.min_size));
        }
        if self.max_size > 10_000 {
            return Err(SessionConfigError::MaxSizeTooLarge(self.max_size));
        }
        if self.size < self.min_size || self.size > self.max_size {
            return Err(SessionConfigError::SizeOutOfBounds {
                size: self.size,
                min_size: self.min_size,
                max_size: self.max_size,
            });
        }
        if self.timeout_ms == 0 {
            return Err(SessionConfigError::ZeroTimeout);
        }

        Ok(SessionConfig {
            size: self.size,
            min_size: self.min_size,
            max_size: self.max_size,
            timeout_ms: self.timeout_ms,
            recycle_ms: self.recycle_ms,
            pre_ping: self.pre_ping,
            strategy: self.strategy,
            auto_adjust: self.auto_adjust,
            response_threshold_ms: self.response_threshold_ms,
            create_retries: self.create_retries,
            event_listeners: self.event_listeners,
            name: self.name,
        })
    }
}
