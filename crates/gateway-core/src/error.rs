//! The gateway's unified error taxonomy.
//!
//! [`GatewayError`] wraps every kind of failure the dispatch engine can
//! raise so the rate limiter, breaker, pool, and dispatcher don't each need
//! bespoke error types — the same problem `ResilienceError<E>` solved for
//! composed tower layers, applied here to a single non-layered enum with a
//! stable `kind()` for metric labeling and a `retryable()` accessor the
//! dispatcher consults directly.
//!
//! # Pattern Matching
//!
//! ```
//! use gateway_core::error::GatewayError;
//!
//! # #[derive(Debug)]
//! # struct AppError;
//! # impl std::fmt::Display for AppError {
//! #     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { Ok(()) }
//! # }
//! fn handle_error(error: GatewayError<AppError>) {
//!     match error {
//!         GatewayError::Throttled => eprintln!("throttled"),
//!         GatewayError::CircuitOpen { retry_after_ms } => {
//!             eprintln!("circuit open, retry_after_ms={:?}", retry_after_ms);
//!         }
//!         GatewayError::SessionInvocationError { source, .. } => {
//!             eprintln!("session error: {}", source);
//!         }
//!         other => eprintln!("{other}"),
//!     }
//! }
//! ```

use std::fmt;

/// Stable discriminant for a [`GatewayError`], independent of its payload.
/// Safe to use as a metric label or wire field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Throttled,
    CircuitOpen,
    AcquireTimeout,
    UpstreamUnavailable,
    SessionInvocationError,
    PoolShutdown,
    NotFound,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Throttled => "throttled",
            ErrorKind::CircuitOpen => "circuit_open",
            ErrorKind::AcquireTimeout => "acquire_timeout",
            ErrorKind::UpstreamUnavailable => "upstream_unavailable",
            ErrorKind::SessionInvocationError => "session_invocation_error",
            ErrorKind::PoolShutdown => "pool_shutdown",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for the gateway's dispatch engine.
///
/// `E` is the application/session error wrapped by
/// [`GatewayError::SessionInvocationError`] — whatever error the injected
/// session's `invoke` call returns.
#[derive(Debug, Clone)]
pub enum GatewayError<E> {
    /// Rate limiter denied admission within the requested wait.
    Throttled,
    /// Circuit breaker denied the call. `retry_after_ms` is populated once
    /// the breaker knows its `wait_duration_in_open` remainder.
    CircuitOpen { retry_after_ms: Option<u64> },
    /// Pool wait deadline elapsed before a session became available.
    AcquireTimeout,
    /// Session creation exhausted its retry budget.
    UpstreamUnavailable { attempts: usize },
    /// The session itself raised an error during `invoke` or `ping`.
    SessionInvocationError { retryable: bool, source: E },
    /// The pool or pool manager is shutting down and refuses new work.
    PoolShutdown,
    /// Catalog resolution found no upstream matching the request target.
    NotFound { target: String },
    /// The caller's cancellation token fired before completion.
    Cancelled,
}

impl<E> GatewayError<E> {
    /// Stable kind discriminant, for metric labels and wire responses.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Throttled => ErrorKind::Throttled,
            GatewayError::CircuitOpen { .. } => ErrorKind::CircuitOpen,
            GatewayError::AcquireTimeout => ErrorKind::AcquireTimeout,
            GatewayError::UpstreamUnavailable { .. } => ErrorKind::UpstreamUnavailable,
            GatewayError::SessionInvocationError { .. } => ErrorKind::SessionInvocationError,
            GatewayError::PoolShutdown => ErrorKind::PoolShutdown,
            GatewayError::NotFound { .. } => ErrorKind::NotFound,
            GatewayError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Whether the dispatcher may retry this error within its own budget.
    pub fn retryable(&self) -> bool {
        match self {
            GatewayError::Throttled => false,
            GatewayError::CircuitOpen { .. } => true,
            GatewayError::AcquireTimeout => true,
            GatewayError::UpstreamUnavailable { .. } => true,
            GatewayError::SessionInvocationError { retryable, .. } => *retryable,
            GatewayError::PoolShutdown => false,
            GatewayError::NotFound { .. } => false,
            GatewayError::Cancelled => false,
        }
    }

    pub fn is_throttled(&self) -> bool {
        matches!(self, GatewayError::Throttled)
    }
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, GatewayError::CircuitOpen { .. })
    }
    pub fn is_acquire_timeout(&self) -> bool {
        matches!(self, GatewayError::AcquireTimeout)
    }
    pub fn is_cancelled(&self) -> bool {
        matches!(self, GatewayError::Cancelled)
    }
    pub fn is_session_invocation_error(&self) -> bool {
        matches!(self, GatewayError::SessionInvocationError { .. })
    }

    /// Returns the wrapped session error, if this is a
    /// `SessionInvocationError`.
    pub fn session_error(&self) -> Option<&E> {
        match self {
            GatewayError::SessionInvocationError { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Maps the wrapped session error using `f`, leaving every other variant
    /// untouched.
    ///
    /// ```
    /// use gateway_core::error::GatewayError;
    ///
    /// let err: GatewayError<String> = GatewayError::SessionInvocationError {
    ///     retryable: true,
    ///     source: "boom".to_string(),
    /// };
    /// let mapped: GatewayError<usize> = err.map_source(|s| s.len());
    /// assert_eq!(mapped.session_error(), Some(&4));
    /// ```
    pub fn map_source<F, T>(self, f: F) -> GatewayError<T>
    where
        F: FnOnce(E) -> T,
    {
        match self {
            GatewayError::Throttled => GatewayError::Throttled,
            GatewayError::CircuitOpen { retry_after_ms } => {
                GatewayError::CircuitOpen { retry_after_ms }
            }
            GatewayError::AcquireTimeout => GatewayError::AcquireTimeout,
            GatewayError::UpstreamUnavailable { attempts } => {
                GatewayError::UpstreamUnavailable { attempts }
            }
            GatewayError::SessionInvocationError { retryable, source } => {
                GatewayError::SessionInvocationError {
                    retryable,
                    source: f(source),
                }
            }
            GatewayError::PoolShutdown => GatewayError::PoolShutdown,
            GatewayError::NotFound { target } => GatewayError::NotFound { target },
            GatewayError::Cancelled => GatewayError::Cancelled,
        }
    }
}

impl<E: fmt::Display> fmt::Display for GatewayError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Throttled => write!(f, "request throttled by rate limiter"),
            GatewayError::CircuitOpen { retry_after_ms } => match retry_after_ms {
                Some(ms) => write!(f, "circuit open, retry after {ms}ms"),
                None => write!(f, "circuit open"),
            },
            GatewayError::AcquireTimeout => write!(f, "timed out waiting for a pooled session"),
            GatewayError::UpstreamUnavailable { attempts } => {
                write!(f, "upstream unavailable after {attempts} creation attempts")
            }
            GatewayError::SessionInvocationError { source, .. } => {
                write!(f, "session invocation failed: {source}")
            }
            GatewayError::PoolShutdown => write!(f, "pool is shutting down"),
            GatewayError::NotFound { target } => write!(f, "no upstream found for '{target}'"),
            GatewayError::Cancelled => write!(f, "request cancelled"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for GatewayError<E> {}

/// Wire-facing shape for a [`GatewayError`]: `{kind, message, retryable}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorWire {
    pub kind: &'static str,
    pub message: String,
    pub retryable: bool,
}

impl<E: fmt::Display> From<&GatewayError<E>> for ErrorWire {
    fn from(err: &GatewayError<E>) -> Self {
        ErrorWire {
            kind: err.kind().as_str(),
            message: err.to_string(),
            retryable: err.retryable(),
        }
    }
}

/// Backoff schedule shared by session creation retries (pool) and
/// invocation retries (dispatcher): `base_ms * 2^attempt * U(low, high)`.
#[derive(Debug, Clone, Copy)]
pub struct JitteredBackoff {
    pub base_ms: u64,
    pub jitter_low: f64,
    pub jitter_high: f64,
}

impl JitteredBackoff {
    pub fn new(base_ms: u64) -> Self {
        Self {
            base_ms,
            jitter_low: 0.5,
            jitter_high: 1.5,
        }
    }

    /// Delay in milliseconds for retry attempt `k` (0-indexed), given a
    /// uniform sample `u` in `[0, 1)` supplied by the caller so this stays
    /// deterministic and test-friendly.
    pub fn delay_ms(&self, k: u32, u: f64) -> u64 {
        let factor = self.jitter_low + u.clamp(0.0, 1.0) * (self.jitter_high - self.jitter_low);
        let exp = 2u64.saturating_pow(k);
        ((self.base_ms.saturating_mul(exp)) as f64 * factor) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct AppErr(&'static str);
    impl fmt::Display for AppErr {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    /// Compile-time assertion that GatewayError is Send + Sync + 'static
    /// when the inner error type is, so it can cross task boundaries.
    const _: () = {
        const fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<GatewayError<AppErr>>();
    };

    #[test]
    fn kind_and_retryable_match_taxonomy() {
        let throttled: GatewayError<AppErr> = GatewayError::Throttled;
        assert_eq!(throttled.kind(), ErrorKind::Throttled);
        assert!(!throttled.retryable());

        let acquire_timeout: GatewayError<AppErr> = GatewayError::AcquireTimeout;
        assert!(acquire_timeout.retryable());

        let not_found: GatewayError<AppErr> = GatewayError::NotFound {
            target: "x".into(),
        };
        assert!(!not_found.retryable());

        let cancelled: GatewayError<AppErr> = GatewayError::Cancelled;
        assert!(!cancelled.retryable());
    }

    #[test]
    fn session_invocation_retryable_depends_on_flag() {
        let retryable: GatewayError<AppErr> = GatewayError::SessionInvocationError {
            retryable: true,
            source: AppErr("reset"),
        };
        assert!(retryable.retryable());
        assert_eq!(retryable.session_error().unwrap().0, "reset");

        let not_retryable: GatewayError<AppErr> = GatewayError::SessionInvocationError {
            retryable: false,
            source: AppErr("bad request"),
        };
        assert!(!not_retryable.retryable());
    }

    #[test]
    fn map_source_preserves_other_variants() {
        let err: GatewayError<AppErr> = GatewayError::UpstreamUnavailable { attempts: 3 };
        let mapped = err.map_source(|e| e.0.len());
        assert!(matches!(
            mapped,
            GatewayError::UpstreamUnavailable { attempts: 3 }
        ));
    }

    #[test]
    fn wire_shape_carries_kind_message_retryable() {
        let err: GatewayError<AppErr> = GatewayError::CircuitOpen {
            retry_after_ms: Some(200),
        };
        let wire = ErrorWire::from(&err);
        assert_eq!(wire.kind, "circuit_open");
        assert!(wire.retryable);
        assert!(wire.message.contains("200ms"));
    }

    #[test]
    fn jittered_backoff_scales_exponentially_within_jitter_bounds() {
        let backoff = JitteredBackoff::new(100);
        assert_eq!(backoff.delay_ms(0, 0.0), 50);
        assert_eq!(backoff.delay_ms(0, 1.0), 150);
        assert_eq!(backoff.delay_ms(3, 0.0), 400); // 100 * 2^3 * 0.5
    }

    #[test]
    fn to_box_error_works() {
        let err: GatewayError<AppErr> = GatewayError::PoolShutdown;
        let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(err);
        assert!(boxed.to_string().contains("shutting down"));
    }
}
