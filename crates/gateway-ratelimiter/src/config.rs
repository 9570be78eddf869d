use crate::adaptive::AdaptiveConfig;
use crate::events::RateLimiterEvent;
use crate::window::WindowKind;
use gateway_core::events::{EventListeners, FnListener};

/// Configuration for a [`crate::RateLimiter`].
pub struct RateLimiterConfig {
    pub(crate) window_kind: WindowKind,
    pub(crate) max_requests: usize,
    pub(crate) window_ms: u64,
    pub(crate) adaptive: AdaptiveConfig,
    pub(crate) event_listeners: EventListeners<RateLimiterEvent>,
    pub(crate) name: String,
}

/// Builder for [`RateLimiterConfig`].
pub struct RateLimiterConfigBuilder {
    window_kind: WindowKind,
    max_requests: usize,
    window_ms: u64,
    adaptive: AdaptiveConfig,
    event_listeners: EventListeners<RateLimiterEvent>,
    name: String,
}

impl Default for RateLimiterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiterConfigBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults: `max_requests = 50`, `window_ms = 1000`, sliding-log
    /// window, adaptive tuning disabled.
    pub fn new() -> Self {
        Self {
            window_kind: WindowKind::default(),
            max_requests: 50,
            window_ms: 1000,
            adaptive: AdaptiveConfig::default(),
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    pub fn window_kind(mut self, kind: WindowKind) -> Self {
        self.window_kind = kind;
        self
    }

    /// Sets the maximum number of admissions per window.
    pub fn max_requests(mut self, max_requests: usize) -> Self {
        self.max_requests = max_requests;
        self
    }

    /// Sets the window duration in milliseconds.
    pub fn window_ms(mut self, window_ms: u64) -> Self {
        self.window_ms = window_ms;
        self
    }

    /// Enables adaptive tuning: after every `batch_size` operations, grows
    /// `max_requests` by `(1 + alpha)` if the success rate exceeded
    /// `grow_threshold`, or shrinks it by `(1 - alpha)` if the failure rate
    /// exceeded `shrink_threshold`, clamped to `[min_requests,
    /// max_requests_limit]`.
    pub fn adaptive(mut self, min_requests: usize, max_requests_limit: usize) -> Self {
        self.adaptive = AdaptiveConfig {
            enabled: true,
            min_requests,
            max_requests_limit,
            ..self.adaptive
        };
        self
    }

    /// Overrides the adaptive batch size (default 100).
    pub fn adaptive_batch_size(mut self, batch_size: usize) -> Self {
        self.adaptive.batch_size = batch_size;
        self
    }

    /// Overrides the adaptive step factor alpha (default 0.1).
    pub fn adaptive_alpha(mut self, alpha: f64) -> Self {
        self.adaptive.alpha = alpha;
        self
    }

    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked when a request is admitted.
    pub fn on_permit_acquired<F>(mut self, f: F) -> Self
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RateLimiterEvent::PermitAcquired { wait_ms, .. } = event {
                f(*wait_ms);
            }
        }));
        self
    }

    /// Registers a callback invoked when a request is throttled.
    pub fn on_permit_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RateLimiterEvent::PermitRejected { timeout_ms, .. } = event {
                f(*timeout_ms);
            }
        }));
        self
    }

    /// Registers a callback invoked when the adaptive variant adjusts
    /// `max_requests`.
    pub fn on_limit_adjusted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RateLimiterEvent::LimitAdjusted {
                old_limit,
                new_limit,
                ..
            } = event
            {
                f(*old_limit, *new_limit);
            }
        }));
        self
    }

    /// Builds the rate limiter configuration.
    pub fn build(self) -> RateLimiterConfig {
        RateLimiterConfig {
            window_kind: self.window_kind,
            max_requests: self.max_requests,
            window_ms: self.window_ms,
            adaptive: self.adaptive,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}
