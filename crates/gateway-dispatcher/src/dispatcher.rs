//! The dispatch engine (C8): admits, resolves, acquires, invokes, retries,
//! and releases, exactly once per call to [`Dispatcher::dispatch`].

use crate::config::DispatcherConfig;
use crate::events::{DispatchEvent, TimestampedDispatchEvent};
use gateway_core::{Clock, ErrorKind, GatewayError, JitteredBackoff};
use gateway_manager::PoolManager;
use gateway_pool::Outcome;
use gateway_ratelimiter::RateLimiter;
use gateway_session::{Catalog, SessionFactory, UpstreamSession};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Signals that a session's `invoke` call did not complete within its
/// per-attempt deadline. Session error types opt into participating in
/// dispatch by supplying a `From<InvokeTimedOut>` conversion, the same way
/// application errors convert into [`GatewayError`] elsewhere in the
/// gateway.
#[derive(Debug, Clone, Copy)]
pub struct InvokeTimedOut;

impl fmt::Display for InvokeTimedOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invocation did not complete within its per-attempt deadline")
    }
}

impl std::error::Error for InvokeTimedOut {}

/// Successful dispatch result.
#[derive(Debug, Clone)]
pub struct DispatchOutcome<R> {
    pub response: R,
    pub attempts: u32,
    pub total_ms: u64,
}

enum Resolved<R, E> {
    Invoked(Result<R, E>),
    TimedOut,
    Cancelled,
}

/// Ties the rate limiter, catalog, pool manager, and session invocation
/// together behind one call per request (§4.8).
pub struct Dispatcher<F: SessionFactory, C: Catalog> {
    pool_manager: Arc<PoolManager<F>>,
    catalog: Arc<C>,
    rate_limiter: Arc<RateLimiter>,
    config: DispatcherConfig<<F::Session as UpstreamSession>::Error>,
    clock: Arc<dyn Clock>,
}

impl<F, C> Dispatcher<F, C>
where
    F: SessionFactory + Clone,
    C: Catalog,
{
    pub fn new(
        pool_manager: Arc<PoolManager<F>>,
        catalog: Arc<C>,
        rate_limiter: Arc<RateLimiter>,
        config: DispatcherConfig<<F::Session as UpstreamSession>::Error>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pool_manager,
            catalog,
            rate_limiter,
            config,
            clock,
        }
    }

    /// Drives `request` through the full dispatch contract: admit, resolve,
    /// acquire, invoke with a per-attempt deadline, retry retryable errors
    /// up to `max_retries`, release on every exit path, emit one terminal
    /// observability event.
    pub async fn dispatch(
        &self,
        target: &str,
        request: <F::Session as UpstreamSession>::Request,
        cancel: &CancellationToken,
    ) -> Result<DispatchOutcome<<F::Session as UpstreamSession>::Response>, GatewayError<<F::Session as UpstreamSession>::Error>>
    where
        <F::Session as UpstreamSession>::Request: Clone,
        <F::Session as UpstreamSession>::Error: From<InvokeTimedOut>,
    {
        let started_at_ms = self.clock.now_ms();

        if !self.rate_limiter.acquire(self.config.admission_timeout_ms, cancel).await {
            self.emit(target, DispatchEvent::Failed {
                attempts: 0,
                total_ms: self.elapsed_ms(started_at_ms),
                kind: ErrorKind::Throttled,
            });
            return Err(GatewayError::Throttled);
        }

        let Some(upstream) = self.catalog.resolve(target).await else {
            self.emit(target, DispatchEvent::Failed {
                attempts: 0,
                total_ms: self.elapsed_ms(started_at_ms),
                kind: ErrorKind::NotFound,
            });
            return Err(GatewayError::NotFound {
                target: target.to_string(),
            });
        };

        let pool = self.pool_manager.get_or_create(&upstream).await;
        let backoff = JitteredBackoff::new(self.config.retry_base_ms);

        for attempt in 0..=self.config.max_retries {
            if cancel.is_cancelled() {
                let err = GatewayError::Cancelled;
                self.emit_failed(target, attempt, started_at_ms, &err);
                return Err(err);
            }

            let handle = match pool.acquire(self.config.acquire_timeout_ms, cancel).await {
                Ok(handle) => handle,
                Err(err) => {
                    if err.retryable() && attempt < self.config.max_retries {
                        self.emit(target, DispatchEvent::Retried {
                            attempt,
                            kind: err.kind(),
                        });
                        self.backoff_sleep(&backoff, attempt, cancel).await;
                        continue;
                    }
                    self.emit_failed(target, attempt, started_at_ms, &err);
                    return Err(err);
                }
            };

            let resolved = tokio::select! {
                biased;
                _ = cancel.cancelled() => Resolved::Cancelled,
                invoked = handle.session().invoke(request.clone()) => Resolved::Invoked(invoked),
                completed = self.clock.sleep(self.config.invoke_timeout_ms, cancel) => {
                    if completed { Resolved::TimedOut } else { Resolved::Cancelled }
                }
            };

            match resolved {
                Resolved::Invoked(Ok(response)) => {
                    pool.release(handle, Outcome::Ok).await;
                    let total_ms = self.elapsed_ms(started_at_ms);
                    self.emit(target, DispatchEvent::Completed {
                        attempts: attempt + 1,
                        total_ms,
                    });
                    return Ok(DispatchOutcome {
                        response,
                        attempts: attempt + 1,
                        total_ms,
                    });
                }
                Resolved::Invoked(Err(source)) => {
                    pool.release(handle, Outcome::Err).await;
                    let retryable = self.config.should_retry(&source);
                    let err = GatewayError::SessionInvocationError { retryable, source };
                    if retryable && attempt < self.config.max_retries {
                        self.emit(target, DispatchEvent::Retried {
                            attempt,
                            kind: err.kind(),
                        });
                        self.backoff_sleep(&backoff, attempt, cancel).await;
                        continue;
                    }
                    self.emit_failed(target, attempt, started_at_ms, &err);
                    return Err(err);
                }
                Resolved::TimedOut => {
                    pool.release(handle, Outcome::Err).await;
                    let source = InvokeTimedOut.into();
                    let retryable = self.config.should_retry(&source);
                    let err = GatewayError::SessionInvocationError { retryable, source };
                    if retryable && attempt < self.config.max_retries {
                        self.emit(target, DispatchEvent::Retried {
                            attempt,
                            kind: err.kind(),
                        });
                        self.backoff_sleep(&backoff, attempt, cancel).await;
                        continue;
                    }
                    self.emit_failed(target, attempt, started_at_ms, &err);
                    return Err(err);
                }
                Resolved::Cancelled => {
                    pool.release(handle, Outcome::Err).await;
                    let err = GatewayError::Cancelled;
                    self.emit_failed(target, attempt, started_at_ms, &err);
                    return Err(err);
                }
            }
        }

        unreachable!("the final retry attempt always returns from within the loop")
    }

    fn elapsed_ms(&self, started_at_ms: u64) -> u64 {
        self.clock.now_ms().saturating_sub(started_at_ms)
    }

    async fn backoff_sleep(&self, backoff: &JitteredBackoff, attempt: u32, cancel: &CancellationToken) {
        let jitter = 0.5 + rand_unit();
        let delay = backoff.delay_ms(attempt, jitter);
        self.clock.sleep(delay, cancel).await;
    }

    fn emit(&self, target: &str, event: DispatchEvent) {
        self.config.event_listeners.emit(&TimestampedDispatchEvent {
            target: target.to_string(),
            timestamp: Instant::now(),
            event,
        });
    }

    fn emit_failed<E>(&self, target: &str, attempt: u32, started_at_ms: u64, err: &GatewayError<E>) {
        self.emit(target, DispatchEvent::Failed {
            attempts: attempt + 1,
            total_ms: self.elapsed_ms(started_at_ms),
            kind: err.kind(),
        });
    }
}

fn rand_unit() -> f64 {
    use rand::Rng;
    rand::rng().random_range(0.0..1.0)
}
