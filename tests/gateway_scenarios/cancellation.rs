//! Scenario: cancelling a caller's token while it is waiting on a
//! saturated pool unblocks the wait immediately with `Cancelled`, rather
//! than waiting out the full acquisition timeout.

use super::support::{wire, FakeFactory};
use gateway_core::GatewayError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn cancelling_mid_wait_returns_promptly_instead_of_timing_out() {
    let dispatcher = Arc::new(wire(
        FakeFactory {
            fail_first_n: 0,
            latency_ms: 2_000,
        },
        1,
        |c| c.acquire_timeout_ms(10_000).invoke_timeout_ms(10_000),
    ));

    let holder = {
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move {
            let cancel = CancellationToken::new();
            dispatcher.dispatch("orders", 1, &cancel).await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let cancel = CancellationToken::new();
    let waiter = {
        let dispatcher = Arc::clone(&dispatcher);
        let cancel = cancel.clone();
        tokio::spawn(async move { dispatcher.dispatch("orders", 2, &cancel).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let started = Instant::now();
    cancel.cancel();
    let result = waiter.await.unwrap();
    let elapsed = started.elapsed();

    assert!(matches!(result, Err(GatewayError::Cancelled)));
    assert!(
        elapsed < Duration::from_millis(500),
        "cancellation should unblock the wait almost immediately, took {elapsed:?}"
    );

    holder.await.unwrap().unwrap();
}
