//! Scenario: a single request against a healthy upstream succeeds on the
//! first attempt and returns exactly one response.

use super::support::{wire, FakeFactory};
use gateway_core::GatewayError;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn dispatch_succeeds_first_attempt_against_healthy_upstream() {
    let dispatcher = wire(FakeFactory::new(), 2, |c| c);
    let cancel = CancellationToken::new();

    let outcome = dispatcher.dispatch("orders", 21, &cancel).await.unwrap();

    assert_eq!(outcome.response, 42);
    assert_eq!(outcome.attempts, 1);
}

#[tokio::test]
async fn unresolvable_target_fails_without_touching_the_pool() {
    let dispatcher = wire(FakeFactory::new(), 2, |c| c);
    let cancel = CancellationToken::new();

    let result = dispatcher.dispatch("unknown-target", 1, &cancel).await;

    assert!(matches!(result, Err(GatewayError::NotFound { target }) if target == "unknown-target"));
}
