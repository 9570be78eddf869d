//! P1: dropping an acquisition handle without calling `release` must not
//! permanently shrink the pool's effective capacity. The handle's `Drop`
//! impl releases it as a failure on the caller's behalf.

use super::support::FakeFactory;
use gateway_core::{Clock, SystemClock};
use gateway_pool::{SessionConfigBuilder, SessionPool};
use gateway_session::UpstreamRef;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn dropping_a_handle_without_releasing_still_frees_its_slot() {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let config = SessionConfigBuilder::new()
        .min_size(1)
        .size(1)
        .max_size(1)
        .pre_ping(false)
        .build()
        .unwrap();
    let pool = SessionPool::new(
        UpstreamRef::new("svc-no-leaks"),
        config,
        FakeFactory { fail_first_n: 0, latency_ms: 0 },
        clock,
    );
    let cancel = CancellationToken::new();

    for _ in 0..5 {
        let handle = pool.acquire(Some(1_000), &cancel).await.unwrap();
        drop(handle);

        // The Drop impl spawns a detached task to release the handle; give
        // it a beat to run before the next acquisition.
        tokio::time::sleep(Duration::from_millis(20)).await;

        let reacquired = pool.acquire(Some(500), &cancel).await;
        assert!(
            reacquired.is_ok(),
            "pool should remain fully usable after an un-released handle is dropped"
        );
        pool.release(reacquired.unwrap(), gateway_pool::Outcome::Ok).await;
    }

    let stats = pool.stats();
    assert!(stats.total_releases >= 5);
}
