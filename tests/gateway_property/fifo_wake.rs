//! P3: when a saturated pool frees a slot, the longest-waiting acquirer is
//! woken first, not an arbitrary or most-recent one.

use super::support::FakeFactory;
use gateway_core::{Clock, SystemClock};
use gateway_pool::{Outcome, SessionConfigBuilder, SessionPool};
use gateway_session::UpstreamRef;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn waiters_are_admitted_in_arrival_order() {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let config = SessionConfigBuilder::new()
        .min_size(1)
        .size(1)
        .max_size(1)
        .pre_ping(false)
        .build()
        .unwrap();
    let pool = SessionPool::new(
        UpstreamRef::new("svc-fifo"),
        config,
        FakeFactory { fail_first_n: 0, latency_ms: 0 },
        clock,
    );

    let cancel = CancellationToken::new();
    let holder = pool.acquire(Some(1_000), &cancel).await.unwrap();

    let arrival_order = Arc::new(Mutex::new(Vec::new()));
    let mut waiters = Vec::new();
    for id in 0..4usize {
        let pool = Arc::clone(&pool);
        let cancel = cancel.clone();
        let arrival_order = Arc::clone(&arrival_order);
        waiters.push(tokio::spawn(async move {
            let handle = pool.acquire(Some(5_000), &cancel).await.unwrap();
            arrival_order.lock().await.push(id);
            pool.release(handle, Outcome::Ok).await;
        }));
        // Stagger spawns so each waiter is queued strictly after the
        // previous one, making arrival order deterministic.
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    pool.release(holder, Outcome::Ok).await;

    for waiter in waiters {
        waiter.await.unwrap();
    }

    assert_eq!(*arrival_order.lock().await, vec![0, 1, 2, 3]);
}
