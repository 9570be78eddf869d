//! P2: a pool never hands out more concurrently-acquired sessions than its
//! configured `max_size`, across a range of pool sizes and concurrent
//! demand.

use super::support::FakeFactory;
use gateway_core::{Clock, SystemClock};
use gateway_pool::{SessionConfigBuilder, SessionPool};
use gateway_session::UpstreamRef;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

async fn never_exceeds_max_size(max_size: usize, concurrent_requests: usize) {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let config = SessionConfigBuilder::new()
        .min_size(1)
        .size(max_size)
        .max_size(max_size)
        .pre_ping(false)
        .build()
        .unwrap();
    let pool = SessionPool::new(
        UpstreamRef::new("svc-bounds"),
        config,
        FakeFactory { fail_first_n: 0, latency_ms: 5 },
        clock,
    );

    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut tasks = Vec::new();
    for _ in 0..concurrent_requests {
        let pool = Arc::clone(&pool);
        let current = Arc::clone(&current);
        let peak = Arc::clone(&peak);
        tasks.push(tokio::spawn(async move {
            let cancel = CancellationToken::new();
            if let Ok(handle) = pool.acquire(Some(2_000), &cancel).await {
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                current.fetch_sub(1, Ordering::SeqCst);
                pool.release(handle, gateway_pool::Outcome::Ok).await;
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert!(
        peak.load(Ordering::SeqCst) <= max_size,
        "observed {} concurrently in use against max_size {}",
        peak.load(Ordering::SeqCst),
        max_size
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn pool_never_exceeds_its_configured_bound(
        max_size in 1usize..6,
        extra_demand in 0usize..10,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(never_exceeds_max_size(max_size, max_size + extra_demand));
    }
}
