//! Shared fakes for the end-to-end scenario tests: a session whose latency
//! and failure behavior is scriptable, plus trivial factory/catalog impls.

use async_trait::async_trait;
use gateway_core::Clock;
use gateway_dispatcher::{Dispatcher, DispatcherConfigBuilder, InvokeTimedOut};
use gateway_manager::{PoolManager, PoolManagerConfig};
use gateway_pool::SessionConfigBuilder;
use gateway_ratelimiter::{RateLimiter, RateLimiterConfigBuilder};
use gateway_session::{Catalog, SessionFactory, UpstreamRef, UpstreamSession};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum FakeError {
    #[error("upstream unavailable")]
    Upstream,
    #[error("invocation timed out")]
    Timeout,
}

impl From<InvokeTimedOut> for FakeError {
    fn from(_: InvokeTimedOut) -> Self {
        FakeError::Timeout
    }
}

/// A session that fails its first `fail_first_n` invocations and otherwise
/// echoes `request * 2` back after sleeping `latency_ms`.
pub struct FakeSession {
    fail_first_n: AtomicUsize,
    latency_ms: u64,
}

#[async_trait]
impl UpstreamSession for FakeSession {
    type Request = u32;
    type Response = u32;
    type Error = FakeError;

    async fn ping(&self) -> Result<(), FakeError> {
        Ok(())
    }

    async fn invoke(&self, request: u32) -> Result<u32, FakeError> {
        if self.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.latency_ms)).await;
        }
        if self.fail_first_n.load(Ordering::SeqCst) > 0 {
            self.fail_first_n.fetch_sub(1, Ordering::SeqCst);
            return Err(FakeError::Upstream);
        }
        Ok(request * 2)
    }

    async fn close(&self) {}
}

#[derive(Clone)]
pub struct FakeFactory {
    pub fail_first_n: usize,
    pub latency_ms: u64,
}

impl FakeFactory {
    pub fn new() -> Self {
        Self {
            fail_first_n: 0,
            latency_ms: 0,
        }
    }
}

#[async_trait]
impl SessionFactory for FakeFactory {
    type Session = FakeSession;

    async fn create(&self, _upstream: &UpstreamRef) -> Result<FakeSession, FakeError> {
        Ok(FakeSession {
            fail_first_n: AtomicUsize::new(self.fail_first_n),
            latency_ms: self.latency_ms,
        })
    }
}

/// Static target -> upstream table, the simplest possible catalog.
pub struct FakeCatalog {
    targets: Mutex<HashMap<String, UpstreamRef>>,
}

impl FakeCatalog {
    pub fn with_target(name: &str, upstream: UpstreamRef) -> Arc<Self> {
        let mut targets = HashMap::new();
        targets.insert(name.to_string(), upstream);
        Arc::new(Self {
            targets: Mutex::new(targets),
        })
    }
}

#[async_trait]
impl Catalog for FakeCatalog {
    async fn resolve(&self, target: &str) -> Option<UpstreamRef> {
        self.targets.lock().unwrap().get(target).cloned()
    }
}

/// Wires a dispatcher over one upstream ("svc-orders", target "orders")
/// with a real system clock, so scenarios can exercise actual timeouts and
/// retry backoff without manually advancing a test clock.
pub fn wire(
    factory: FakeFactory,
    pool_size: usize,
    dispatcher_config: impl FnOnce(DispatcherConfigBuilder) -> DispatcherConfigBuilder,
) -> Dispatcher<FakeFactory, FakeCatalog> {
    let clock: Arc<dyn Clock> = Arc::new(gateway_core::SystemClock::new());
    let upstream = UpstreamRef::new("svc-orders");
    let catalog = FakeCatalog::with_target("orders", upstream);
    let manager = PoolManager::new(
        factory,
        move |u: &UpstreamRef| {
            SessionConfigBuilder::new()
                .name(u.id())
                .min_size(1)
                .size(pool_size)
                .max_size(pool_size)
                .pre_ping(false)
                .build()
                .unwrap()
        },
        Arc::clone(&clock),
        PoolManagerConfig::default(),
    );
    let rate_limiter = Arc::new(RateLimiter::new(
        RateLimiterConfigBuilder::new().max_requests(1_000).window_ms(1_000).build(),
        Arc::clone(&clock),
    ));
    let config = dispatcher_config(DispatcherConfigBuilder::new()).build();
    Dispatcher::new(manager, catalog, rate_limiter, config, clock)
}

/// Like [`wire`], but also hands back the pool manager and the
/// single upstream's ref, for scenarios that need to reach into the pool
/// directly (e.g. forcing its circuit breaker open).
pub fn wire_with_manager(
    factory: FakeFactory,
    pool_size: usize,
    dispatcher_config: impl FnOnce(DispatcherConfigBuilder) -> DispatcherConfigBuilder,
) -> (Dispatcher<FakeFactory, FakeCatalog>, Arc<PoolManager<FakeFactory>>, UpstreamRef) {
    let clock: Arc<dyn Clock> = Arc::new(gateway_core::SystemClock::new());
    let upstream = UpstreamRef::new("svc-orders");
    let catalog = FakeCatalog::with_target("orders", upstream.clone());
    let manager = PoolManager::new(
        factory,
        move |u: &UpstreamRef| {
            SessionConfigBuilder::new()
                .name(u.id())
                .min_size(1)
                .size(pool_size)
                .max_size(pool_size)
                .pre_ping(false)
                .build()
                .unwrap()
        },
        Arc::clone(&clock),
        PoolManagerConfig::default(),
    );
    let rate_limiter = Arc::new(RateLimiter::new(
        RateLimiterConfigBuilder::new().max_requests(1_000).window_ms(1_000).build(),
        Arc::clone(&clock),
    ));
    let config = dispatcher_config(DispatcherConfigBuilder::new()).build();
    let dispatcher = Dispatcher::new(Arc::clone(&manager), catalog, rate_limiter, config, clock);
    (dispatcher, manager, upstream)
}
