//! Scenario: a pool of size 1 is held busy by a slow in-flight call, so a
//! second concurrent request with a short acquisition budget times out
//! rather than waiting indefinitely.

use super::support::{wire, FakeFactory};
use gateway_core::GatewayError;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn second_request_times_out_while_pool_is_saturated() {
    let dispatcher = Arc::new(wire(
        FakeFactory {
            fail_first_n: 0,
            latency_ms: 200,
        },
        1,
        |c| c.max_retries(0).acquire_timeout_ms(30).invoke_timeout_ms(1_000),
    ));

    let holder = {
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move {
            let cancel = CancellationToken::new();
            dispatcher.dispatch("orders", 1, &cancel).await
        })
    };

    // Give the holder time to acquire the pool's only session before the
    // second request starts racing it for capacity.
    tokio::time::sleep(Duration::from_millis(20)).await;

    let cancel = CancellationToken::new();
    let result = dispatcher.dispatch("orders", 2, &cancel).await;
    assert!(matches!(result, Err(GatewayError::AcquireTimeout)));

    let holder_outcome = holder.await.unwrap().unwrap();
    assert_eq!(holder_outcome.response, 2);
}
