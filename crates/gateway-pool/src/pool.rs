//! The session pool (C5): bounded per-upstream pool of sessions, the
//! central component callers acquire and release handles against.

use crate::config::SessionConfig;
use crate::events::{EvictionReason, PoolEvent, TimestampedPoolEvent};
use crate::metrics::{StrategyMetrics, StrategySample};
use crate::stats::{PoolStats, PoolStatsSnapshot};
use crate::strategy::{Candidate, StrategyState};
use gateway_breaker::{CircuitBreaker, CircuitBreakerConfigBuilder};
use gateway_core::{Clock, GatewayError, JitteredBackoff};
use gateway_session::{SessionFactory, UpstreamRef, UpstreamSession};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex as AsyncMutex, Notify};
use tokio_util::sync::CancellationToken;

struct Entry<S> {
    id: u64,
    session: Arc<S>,
    created_at_ms: u64,
    last_used_at_ms: u64,
    reuse_count: u64,
    consecutive_preping_failures: u32,
}

struct Inner<S> {
    available: Vec<Entry<S>>,
    in_use: HashMap<u64, Entry<S>>,
    shutdown: bool,
    next_id: u64,
}

/// Outcome reported at release time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Err,
}

/// A scoped handle granting exclusive use of one session.
///
/// Guarantees release on every exit path: if dropped without an explicit
/// call to [`SessionPool::release`], it reports the invocation as failed and
/// returns the session on a detached task, so a panicking or early-return
/// caller can never leak a permanently in-use session (P1).
pub struct AcquisitionHandle<F: SessionFactory> {
    pool: Arc<SessionPool<F>>,
    session_id: u64,
    session: Arc<F::Session>,
    wait_ms: u64,
    newly_created: bool,
    started_at_ms: u64,
    released: bool,
}

impl<F: SessionFactory> AcquisitionHandle<F> {
    pub fn session(&self) -> &F::Session {
        &self.session
    }

    pub fn wait_ms(&self) -> u64 {
        self.wait_ms
    }
}

impl<F: SessionFactory> Drop for AcquisitionHandle<F> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let pool = Arc::clone(&self.pool);
        let parts = ReleaseParts {
            session_id: self.session_id,
            wait_ms: self.wait_ms,
            newly_created: self.newly_created,
            started_at_ms: self.started_at_ms,
        };
        tokio::spawn(async move { pool.release_parts(parts, Outcome::Err).await });
    }
}

struct ReleaseParts {
    session_id: u64,
    wait_ms: u64,
    newly_created: bool,
    started_at_ms: u64,
}

/// Bounded pool of sessions for one [`UpstreamRef`].
pub struct SessionPool<F: SessionFactory> {
    inner: AsyncMutex<Inner<F::Session>>,
    config: AsyncMutex<SessionConfig>,
    notify: Notify,
    breaker: CircuitBreaker,
    strategy_state: StrategyState,
    strategy_metrics: Arc<StrategyMetrics>,
    stats: PoolStats,
    factory: F,
    upstream: UpstreamRef,
    clock: Arc<dyn Clock>,
    generation: AtomicU64,
    consecutive_high_util_ticks: AtomicU64,
    consecutive_low_util_ticks: AtomicU64,
}

impl<F: SessionFactory> SessionPool<F> {
    pub fn new(upstream: UpstreamRef, config: SessionConfig, factory: F, clock: Arc<dyn Clock>) -> Arc<Self> {
        let breaker_config = CircuitBreakerConfigBuilder::new()
            .name(format!("pool:{}", upstream.id()))
            .build();
        Arc::new(Self {
            inner: AsyncMutex::new(Inner {
                available: Vec::new(),
                in_use: HashMap::new(),
                shutdown: false,
                next_id: 0,
            }),
            config: AsyncMutex::new(config),
            notify: Notify::new(),
            breaker: CircuitBreaker::new(breaker_config, clock.clone()),
            strategy_state: StrategyState::new(),
            strategy_metrics: Arc::new(StrategyMetrics::new()),
            stats: PoolStats::new(),
            factory,
            upstream,
            clock,
            generation: AtomicU64::new(0),
            consecutive_high_util_ticks: AtomicU64::new(0),
            consecutive_low_util_ticks: AtomicU64::new(0),
        })
    }

    pub fn stats(&self) -> PoolStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn strategy_metrics(&self) -> Arc<StrategyMetrics> {
        Arc::clone(&self.strategy_metrics)
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Relaxed)
    }

    /// Acquisition algorithm (§4.5 steps 1-6).
    pub async fn acquire(
        self: &Arc<Self>,
        timeout_ms: Option<u64>,
        cancel: &CancellationToken,
    ) -> Result<AcquisitionHandle<F>, GatewayError<<F::Session as UpstreamSession>::Error>> {
        let deadline = timeout_ms.map(|ms| self.clock.deadline(ms));
        let wait_start_ms = self.clock.now_ms();

        if !self.breaker.try_acquire() {
            self.record_sample(0, false, false, 0, Some("breaker".to_string())).await;
            self.emit(PoolEvent::AcquireRejectedBreakerOpen).await;
            return Err(GatewayError::CircuitOpen { retry_after_ms: None });
        }

        loop {
            {
                let inner = self.inner.lock().await;
                if inner.shutdown {
                    return Err(GatewayError::PoolShutdown);
                }
            }

            let config = self.config.lock().await.clone();

            if let Some(handle) = self.try_take_available(&config, wait_start_ms).await {
                self.stats.record_acquisition();
                return Ok(handle);
            }

            let alive = {
                let inner = self.inner.lock().await;
                inner.available.len() + inner.in_use.len()
            };

            if alive < config.max_size {
                match self.create_session(&config, wait_start_ms).await {
                    Ok(handle) => {
                        self.stats.record_acquisition();
                        return Ok(handle);
                    }
                    Err(err) => {
                        self.breaker.record_failure();
                        self.stats.record_error();
                        return Err(err);
                    }
                }
            }

            // No idle session, at capacity: wait for a release or timeout.
            let wait_budget_ms = match &deadline {
                Some(d) if d.is_expired(self.clock.as_ref()) => {
                    self.stats.record_timeout();
                    self.emit(PoolEvent::AcquireTimedOut).await;
                    return Err(GatewayError::AcquireTimeout);
                }
                Some(d) => d.remaining_ms(self.clock.as_ref()).min(1_000),
                None => 1_000,
            };

            let notified = self.notify.notified();
            tokio::select! {
                _ = notified => {}
                _ = self.clock.sleep(wait_budget_ms, cancel) => {}
                _ = cancel.cancelled() => {
                    return Err(GatewayError::Cancelled);
                }
            }

            if let Some(d) = &deadline {
                if d.is_expired(self.clock.as_ref()) {
                    self.stats.record_timeout();
                    self.emit(PoolEvent::AcquireTimedOut).await;
                    return Err(GatewayError::AcquireTimeout);
                }
            }
        }
    }

    async fn try_take_available(
        self: &Arc<Self>,
        config: &SessionConfig,
        wait_start_ms: u64,
    ) -> Option<AcquisitionHandle<F>> {
        loop {
            let candidates: Vec<Candidate> = {
                let inner = self.inner.lock().await;
                inner
                    .available
                    .iter()
                    .enumerate()
                    .map(|(index, e)| Candidate {
                        index,
                        session_id: e.id,
                        reuse_count: e.reuse_count,
                        last_used_at_ms: e.last_used_at_ms,
                    })
                    .collect()
            };
            if candidates.is_empty() {
                return None;
            }

            let now_ms = self.clock.now_ms();
            let chosen = self
                .strategy_state
                .select(config.strategy, &candidates, &self.strategy_metrics, now_ms)?;

            if config.pre_ping {
                let session = {
                    let inner = self.inner.lock().await;
                    inner.available.get(chosen.index).map(|e| Arc::clone(&e.session))
                };
                let Some(session) = session else { continue };
                if !session.health_check().await {
                    let evict = {
                        let mut inner = self.inner.lock().await;
                        if let Some(pos) = inner.available.iter().position(|e| e.id == chosen.session_id) {
                            inner.available[pos].consecutive_preping_failures += 1;
                            if inner.available[pos].consecutive_preping_failures >= 2 {
                                Some(inner.available.remove(pos))
                            } else {
                                None
                            }
                        } else {
                            None
                        }
                    };
                    if let Some(entry) = evict {
                        entry.session.close().await;
                        self.emit(PoolEvent::SessionEvicted {
                            reason: EvictionReason::PrePingFailed,
                        })
                        .await;
                    }
                    continue;
                }
            }

            let mut inner = self.inner.lock().await;
            let Some(pos) = inner.available.iter().position(|e| e.id == chosen.session_id) else {
                continue;
            };
            let mut entry = inner.available.remove(pos);
            entry.consecutive_preping_failures = 0;
            entry.last_used_at_ms = now_ms;
            entry.reuse_count += 1;
            let session = Arc::clone(&entry.session);
            let session_id = entry.id;
            inner.in_use.insert(session_id, entry);
            drop(inner);

            let wait_ms = now_ms.saturating_sub(wait_start_ms);
            self.emit(PoolEvent::Acquired { wait_ms, reused: true }).await;
            return Some(AcquisitionHandle {
                pool: Arc::clone(self),
                session_id,
                session,
                wait_ms,
                newly_created: false,
                started_at_ms: now_ms,
                released: false,
            });
        }
    }

    async fn create_session(
        self: &Arc<Self>,
        config: &SessionConfig,
        wait_start_ms: u64,
    ) -> Result<AcquisitionHandle<F>, GatewayError<<F::Session as UpstreamSession>::Error>> {
        let backoff = JitteredBackoff::new(100);

        for attempt in 0..=config.create_retries {
            match self.factory.create(&self.upstream).await {
                Ok(session) => {
                    let now_ms = self.clock.now_ms();
                    let session = Arc::new(session);
                    let session_id = {
                        let mut inner = self.inner.lock().await;
                        let id = inner.next_id;
                        inner.next_id += 1;
                        inner.in_use.insert(
                            id,
                            Entry {
                                id,
                                session: Arc::clone(&session),
                                created_at_ms: now_ms,
                                last_used_at_ms: now_ms,
                                reuse_count: 0,
                                consecutive_preping_failures: 0,
                            },
                        );
                        id
                    };
                    let wait_ms = now_ms.saturating_sub(wait_start_ms);
                    self.emit(PoolEvent::SessionCreated).await;
                    self.emit(PoolEvent::Acquired { wait_ms, reused: false }).await;
                    return Ok(AcquisitionHandle {
                        pool: Arc::clone(self),
                        session_id,
                        session,
                        wait_ms,
                        newly_created: true,
                        started_at_ms: now_ms,
                        released: false,
                    });
                }
                Err(_) if attempt < config.create_retries => {
                    let jitter = 0.5 + rand_unit();
                    let delay = backoff.delay_ms(attempt, jitter);
                    self.clock.sleep(delay, &CancellationToken::new()).await;
                }
                Err(_) => break,
            }
        }

        let attempts = config.create_retries as usize + 1;
        self.emit(PoolEvent::SessionCreationFailed { attempts }).await;
        Err(GatewayError::UpstreamUnavailable { attempts })
    }

    /// Release algorithm (§4.5 steps 1-5).
    pub async fn release(&self, mut handle: AcquisitionHandle<F>, outcome: Outcome) {
        handle.released = true;
        let parts = ReleaseParts {
            session_id: handle.session_id,
            wait_ms: handle.wait_ms,
            newly_created: handle.newly_created,
            started_at_ms: handle.started_at_ms,
        };
        self.release_parts(parts, outcome).await;
    }

    async fn release_parts(&self, handle: ReleaseParts, outcome: Outcome) {
        let response_ms = self.clock.now_ms().saturating_sub(handle.started_at_ms);
        let config = self.config.lock().await.clone();

        let mut entry = {
            let mut inner = self.inner.lock().await;
            inner.in_use.remove(&handle.session_id)
        };

        let should_close = match (&entry, outcome) {
            (None, _) => true,
            (Some(_), Outcome::Err) => true,
            (Some(e), Outcome::Ok) => {
                config.recycle_ms > 0 && self.clock.now_ms().saturating_sub(e.created_at_ms) >= config.recycle_ms
            }
        };

        if should_close {
            if let Some(e) = entry.take() {
                e.session.close().await;
                let reason = if outcome == Outcome::Err {
                    EvictionReason::InvocationFailed
                } else {
                    EvictionReason::RecycleAge
                };
                self.emit(PoolEvent::SessionEvicted { reason }).await;
            }
        } else if let Some(mut e) = entry.take() {
            e.last_used_at_ms = self.clock.now_ms();
            let mut inner = self.inner.lock().await;
            inner.available.push(e);
        }

        {
            let inner = self.inner.lock().await;
            self.stats.set_active(inner.in_use.len() as u64);
            self.stats.set_available(inner.available.len() as u64);
        }
        self.stats.record_release();

        self.strategy_metrics.record(StrategySample {
            strategy: config.strategy,
            session_id: Some(handle.session_id),
            ts_ms: self.clock.now_ms(),
            response_ms,
            success: outcome == Outcome::Ok,
            reused: !handle.newly_created,
            wait_ms: handle.wait_ms,
            error: if outcome == Outcome::Err {
                Some("invocation_failed".to_string())
            } else {
                None
            },
        });

        match outcome {
            Outcome::Ok => self.breaker.record_success(),
            Outcome::Err => self.breaker.record_failure(),
        }

        self.notify.notify_one();
    }

    async fn record_sample(&self, response_ms: u64, success: bool, reused: bool, wait_ms: u64, error: Option<String>) {
        let strategy = self.config.lock().await.strategy;
        self.strategy_metrics.record(StrategySample {
            strategy,
            session_id: None,
            ts_ms: self.clock.now_ms(),
            response_ms,
            success,
            reused,
            wait_ms,
            error,
        });
    }

    /// Adjusts pool bounds without losing in-use sessions; idle sessions
    /// above the new `max_size` are closed LIFO.
    pub async fn resize(&self, new_min: usize, new_max: usize) {
        {
            let mut config = self.config.lock().await;
            config.min_size = new_min;
            config.max_size = new_max;
        }

        loop {
            let in_use_len = self.inner.lock().await.in_use.len();
            let budget = new_max.saturating_sub(in_use_len);
            let available_len = self.inner.lock().await.available.len();
            if available_len <= budget {
                break;
            }
            let entry = self.inner.lock().await.available.pop();
            match entry {
                Some(e) => {
                    e.session.close().await;
                    self.emit(PoolEvent::SessionEvicted {
                        reason: EvictionReason::OverCapacity,
                    })
                    .await;
                }
                None => break,
            }
        }

        self.generation.fetch_add(1, Ordering::Relaxed);
        self.emit(PoolEvent::Resized {
            min_size: new_min,
            max_size: new_max,
        })
        .await;
    }

    /// Refuses new acquisitions, waits up to `drain_ms` for in-use sessions
    /// to release, then force-closes anything remaining.
    pub async fn shutdown(&self, drain_ms: u64) {
        {
            let mut inner = self.inner.lock().await;
            inner.shutdown = true;
        }
        self.emit(PoolEvent::ShutdownStarted).await;

        let deadline = self.clock.deadline(drain_ms);
        loop {
            let empty = {
                let inner = self.inner.lock().await;
                inner.in_use.is_empty()
            };
            if empty || deadline.is_expired(self.clock.as_ref()) {
                break;
            }
            let cancel = CancellationToken::new();
            tokio::select! {
                _ = self.notify.notified() => {}
                _ = self.clock.sleep(50, &cancel) => {}
            }
        }

        let mut inner = self.inner.lock().await;
        let remaining: Vec<_> = inner.available.drain(..).chain(inner.in_use.drain().map(|(_, e)| e)).collect();
        drop(inner);
        for entry in remaining {
            entry.session.close().await;
        }
        self.emit(PoolEvent::ShutdownCompleted).await;
    }

    /// Runs one health & recycle maintenance pass (§4.5.3): closes idle
    /// sessions past `recycle_ms`, then tops up to `min_size`. Pool-internal,
    /// runs every 10s regardless of `auto_adjust`.
    pub async fn maintenance_tick(&self) {
        if self.inner.lock().await.shutdown {
            return;
        }
        let config = self.config.lock().await.clone();
        let now_ms = self.clock.now_ms();

        if config.recycle_ms > 0 {
            let expired: Vec<Entry<F::Session>> = {
                let mut inner = self.inner.lock().await;
                let (keep, expired): (Vec<_>, Vec<_>) = std::mem::take(&mut inner.available)
                    .into_iter()
                    .partition(|e| now_ms.saturating_sub(e.created_at_ms) < config.recycle_ms);
                inner.available = keep;
                expired
            };
            for entry in expired {
                entry.session.close().await;
                self.emit(PoolEvent::SessionEvicted {
                    reason: EvictionReason::RecycleAge,
                })
                .await;
            }
        }

        let alive = {
            let inner = self.inner.lock().await;
            inner.available.len() + inner.in_use.len()
        };
        if alive < config.min_size {
            for _ in alive..config.min_size {
                match self.factory.create(&self.upstream).await {
                    Ok(session) => {
                        let mut inner = self.inner.lock().await;
                        let id = inner.next_id;
                        inner.next_id += 1;
                        inner.available.push(Entry {
                            id,
                            session: Arc::new(session),
                            created_at_ms: self.clock.now_ms(),
                            last_used_at_ms: self.clock.now_ms(),
                            reuse_count: 0,
                            consecutive_preping_failures: 0,
                        });
                        self.emit(PoolEvent::SessionCreated).await;
                    }
                    Err(_) => break,
                }
            }
        }
    }

    /// Spawns the 10s maintenance loop, stopping once `cancel` fires.
    pub fn spawn_maintenance(self: Arc<Self>, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                if !self.clock.sleep(10_000, &cancel).await {
                    break;
                }
                self.maintenance_tick().await;
            }
        })
    }

    /// Consults utilization and, if `auto_adjust` is enabled, grows or
    /// shrinks `max_size` after three consecutive over/under-utilized calls
    /// (>0.8 / <0.2). Called by the [`crate::pool`]'s owner — the
    /// `PoolManager`'s 60s auto-adjust loop, not this pool itself.
    pub async fn evaluate_auto_adjust(&self) {
        let config = self.config.lock().await.clone();
        if !config.auto_adjust {
            return;
        }

        let (alive, in_use_len) = {
            let inner = self.inner.lock().await;
            (inner.available.len() + inner.in_use.len(), inner.in_use.len())
        };
        let utilization = in_use_len as f64 / config.max_size.max(1) as f64;

        if utilization > 0.8 {
            self.consecutive_high_util_ticks.fetch_add(1, Ordering::Relaxed);
            self.consecutive_low_util_ticks.store(0, Ordering::Relaxed);
        } else if utilization < 0.2 {
            self.consecutive_low_util_ticks.fetch_add(1, Ordering::Relaxed);
            self.consecutive_high_util_ticks.store(0, Ordering::Relaxed);
        } else {
            self.consecutive_high_util_ticks.store(0, Ordering::Relaxed);
            self.consecutive_low_util_ticks.store(0, Ordering::Relaxed);
        }

        if self.consecutive_high_util_ticks.load(Ordering::Relaxed) >= 3 {
            let growth = ((config.max_size as f64 * 0.25).ceil() as usize).max(1);
            self.consecutive_high_util_ticks.store(0, Ordering::Relaxed);
            self.resize(config.min_size, config.max_size + growth).await;
        } else if self.consecutive_low_util_ticks.load(Ordering::Relaxed) >= 3 && alive > config.min_size {
            self.consecutive_low_util_ticks.store(0, Ordering::Relaxed);
            self.resize(config.min_size, config.max_size.saturating_sub(1).max(config.min_size))
                .await;
        }
    }

    /// Replaces this pool's full configuration and bumps its generation.
    /// In-use handles captured the old config only where they read it before
    /// this call; nothing forces them to release early.
    pub async fn replace_config(&self, new_config: SessionConfig) {
        *self.config.lock().await = new_config;
        self.generation.fetch_add(1, Ordering::Relaxed);
    }

    pub fn upstream(&self) -> &UpstreamRef {
        &self.upstream
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    async fn emit(&self, event: PoolEvent) {
        let config = self.config.lock().await;
        config.event_listeners.emit(&TimestampedPoolEvent {
            pool_name: config.name.clone(),
            timestamp: Instant::now(),
            event,
        });
    }
}

fn rand_unit() -> f64 {
    use rand::Rng;
    rand::rng().random_range(0.0..1.0)
}
