//! Scenario: breaker open / recover.
//!
//! Each pool carries its own circuit breaker (C3) over the upstream it
//! serves. A real failure-threshold trip takes `wait_duration_in_open`
//! (minutes, by default) to self-heal, which this suite isn't going to
//! wait out in real time — so this scenario drives the pool's breaker
//! directly via `force_open`/`force_closed` the same way an operator or a
//! health-check integration would, and verifies the dispatcher actually
//! respects whatever state the breaker is in.

use super::support::{wire_with_manager, FakeFactory};
use gateway_core::GatewayError;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn open_breaker_rejects_dispatch_until_forced_closed() {
    let (dispatcher, manager, upstream) = wire_with_manager(FakeFactory::new(), 2, |c| c);
    let cancel = CancellationToken::new();

    // Requests flow normally while the breaker is closed.
    let outcome = dispatcher.dispatch("orders", 1, &cancel).await.unwrap();
    assert_eq!(outcome.response, 2);

    let pool = manager.get_or_create(&upstream).await;
    pool.breaker().force_open();

    let result = dispatcher.dispatch("orders", 1, &cancel).await;
    assert!(matches!(result, Err(GatewayError::CircuitOpen { .. })));

    pool.breaker().force_closed();

    let outcome = dispatcher.dispatch("orders", 3, &cancel).await.unwrap();
    assert_eq!(outcome.response, 6);
}

#[tokio::test]
async fn consecutive_invocation_failures_trip_the_breaker() {
    // failure_threshold defaults to 5 consecutive failures (gateway-breaker's
    // documented default); five failing dispatches with no retries should
    // trip it without needing to reach in and force it.
    let (dispatcher, manager, upstream) =
        wire_with_manager(FakeFactory { fail_first_n: usize::MAX, latency_ms: 0 }, 1, |c| c.max_retries(0));
    let cancel = CancellationToken::new();

    for _ in 0..5 {
        let result = dispatcher.dispatch("orders", 1, &cancel).await;
        assert!(matches!(result, Err(GatewayError::SessionInvocationError { .. })));
    }

    let pool = manager.get_or_create(&upstream).await;
    assert_eq!(pool.breaker().state(), gateway_breaker::CircuitState::Open);

    let result = dispatcher.dispatch("orders", 1, &cancel).await;
    assert!(matches!(result, Err(GatewayError::CircuitOpen { .. })));
}
