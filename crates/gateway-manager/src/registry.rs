//! Process-wide pool registry (§4.7): lazy creation, the 60s auto-adjust
//! loop, and bounded-parallel draining on shutdown.

use futures::stream::{self, StreamExt};
use gateway_core::Clock;
use gateway_pool::{SessionConfig, SessionPool};
use gateway_session::{SessionFactory, UpstreamRef};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Tunables for the manager's own background loops, distinct from any one
/// pool's [`SessionConfig`].
#[derive(Debug, Clone, Copy)]
pub struct PoolManagerConfig {
    pub auto_adjust_interval_ms: u64,
    pub maintenance_interval_ms: u64,
    pub max_parallel_drain: usize,
}

impl Default for PoolManagerConfig {
    fn default() -> Self {
        Self {
            auto_adjust_interval_ms: 60_000,
            maintenance_interval_ms: 10_000,
            max_parallel_drain: 16,
        }
    }
}

struct PoolHandles {
    maintenance: JoinHandle<()>,
    maintenance_cancel: CancellationToken,
}

/// Owns one [`SessionPool`] per [`UpstreamRef`], created lazily on first
/// acquisition request. Pool creation is serialized by briefly upgrading to
/// a write lock and releasing it before any I/O runs, so the registry lock
/// is never held across a session-creation call.
pub struct PoolManager<F: SessionFactory + Clone> {
    pools: RwLock<HashMap<UpstreamRef, Arc<SessionPool<F>>>>,
    handles: Mutex<HashMap<UpstreamRef, PoolHandles>>,
    factory: F,
    config_for: Box<dyn Fn(&UpstreamRef) -> SessionConfig + Send + Sync>,
    clock: Arc<dyn Clock>,
    manager_config: PoolManagerConfig,
}

impl<F: SessionFactory + Clone> PoolManager<F> {
    pub fn new(
        factory: F,
        config_for: impl Fn(&UpstreamRef) -> SessionConfig + Send + Sync + 'static,
        clock: Arc<dyn Clock>,
        manager_config: PoolManagerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            pools: RwLock::new(HashMap::new()),
            handles: Mutex::new(HashMap::new()),
            factory,
            config_for: Box::new(config_for),
            clock,
            manager_config,
        })
    }

    /// Returns the pool for `upstream`, creating it on first use.
    pub async fn get_or_create(&self, upstream: &UpstreamRef) -> Arc<SessionPool<F>> {
        if let Some(pool) = self.pools.read().await.get(upstream) {
            return Arc::clone(pool);
        }

        let mut pools = self.pools.write().await;
        if let Some(pool) = pools.get(upstream) {
            return Arc::clone(pool);
        }

        let config = (self.config_for)(upstream);
        let pool = SessionPool::new(upstream.clone(), config, self.factory.clone(), Arc::clone(&self.clock));
        pools.insert(upstream.clone(), Arc::clone(&pool));
        drop(pools);

        let cancel = CancellationToken::new();
        let maintenance = Arc::clone(&pool).spawn_maintenance(cancel.clone());
        self.handles.lock().await.insert(
            upstream.clone(),
            PoolHandles {
                maintenance,
                maintenance_cancel: cancel,
            },
        );

        pool
    }

    /// Looks up an already-created pool without creating one.
    pub async fn get(&self, upstream: &UpstreamRef) -> Option<Arc<SessionPool<F>>> {
        self.pools.read().await.get(upstream).cloned()
    }

    /// Replaces a pool's configuration in place, bumping its generation.
    /// In-use handles remain valid until released. No-op if the pool does
    /// not exist yet — call [`Self::get_or_create`] first if it should.
    pub async fn replace_config(&self, upstream: &UpstreamRef, new_config: SessionConfig) {
        if let Some(pool) = self.pools.read().await.get(upstream) {
            pool.replace_config(new_config).await;
        }
    }

    /// Runs the 60s auto-adjust loop until `cancel` fires: consults each
    /// pool's utilization and grows or shrinks it via
    /// [`SessionPool::evaluate_auto_adjust`].
    pub fn spawn_auto_adjust(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                if !manager.clock.sleep(manager.manager_config.auto_adjust_interval_ms, &cancel).await {
                    break;
                }
                let pools: Vec<Arc<SessionPool<F>>> = manager.pools.read().await.values().cloned().collect();
                for pool in pools {
                    pool.evaluate_auto_adjust().await;
                }
            }
        })
    }

    /// Drains every registered pool concurrently, bounded to
    /// `max_parallel_drain` at a time, and stops each pool's maintenance
    /// loop. Intended for process shutdown.
    pub async fn shutdown_all(&self, drain_ms: u64) {
        let handles = {
            let mut handles = self.handles.lock().await;
            std::mem::take(&mut *handles)
        };
        for (_, h) in handles {
            h.maintenance_cancel.cancel();
            let _ = h.maintenance.await;
        }

        let pools: Vec<Arc<SessionPool<F>>> = self.pools.read().await.values().cloned().collect();
        let max_parallel = self.manager_config.max_parallel_drain;
        stream::iter(pools)
            .map(|pool| async move { pool.shutdown(drain_ms).await })
            .buffer_unordered(max_parallel)
            .collect::<Vec<_>>()
            .await;
    }

    /// Number of pools currently registered.
    pub async fn pool_count(&self) -> usize {
        self.pools.read().await.len()
    }
}
