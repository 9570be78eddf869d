//! P4: once a pool's breaker trips open, every upstream attempt is rejected
//! pool-wide with `CircuitOpen` regardless of which session would have been
//! selected, until the breaker is closed again.

use super::support::FakeFactory;
use gateway_core::{Clock, GatewayError, SystemClock};
use gateway_pool::{Outcome, SessionConfigBuilder, SessionPool};
use gateway_session::UpstreamRef;
use proptest::prelude::*;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const DEFAULT_FAILURE_THRESHOLD: usize = 5;

async fn trips_at_the_default_threshold(pool_size: usize) {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let config = SessionConfigBuilder::new()
        .min_size(1)
        .size(pool_size)
        .max_size(pool_size)
        .pre_ping(false)
        .build()
        .unwrap();
    let pool = SessionPool::new(
        UpstreamRef::new("svc-exclusion"),
        config,
        FakeFactory { fail_first_n: usize::MAX, latency_ms: 0 },
        clock,
    );
    let cancel = CancellationToken::new();

    for attempt in 0..DEFAULT_FAILURE_THRESHOLD {
        let handle = pool
            .acquire(Some(1_000), &cancel)
            .await
            .unwrap_or_else(|e| panic!("attempt {attempt} should still be admitted: {e}"));
        pool.release(handle, Outcome::Err).await;
    }

    assert_eq!(pool.breaker().state(), gateway_breaker::CircuitState::Open);

    let result = pool.acquire(Some(1_000), &cancel).await;
    assert!(
        matches!(result, Err(GatewayError::CircuitOpen { .. })),
        "expected every further acquisition to be excluded pool-wide once tripped, got {result:?}"
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn breaker_excludes_the_whole_pool_once_tripped(pool_size in 1usize..4) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(trips_at_the_default_threshold(pool_size));
    }
}
