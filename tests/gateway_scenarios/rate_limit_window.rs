//! Scenario: the admission layer's sliding window admits up to its limit
//! per window, rejects the burst past it, and recovers once the window
//! rolls forward.

use gateway_core::{Clock, TestClock};
use gateway_ratelimiter::{RateLimiter, RateLimiterConfigBuilder};
use std::sync::Arc;

#[tokio::test]
async fn burst_past_the_limit_is_throttled_until_the_window_rolls() {
    let test_clock = TestClock::new();
    let clock: Arc<dyn Clock> = Arc::new(test_clock.clone());
    let limiter = RateLimiter::new(
        RateLimiterConfigBuilder::new().max_requests(2).window_ms(100).build(),
        clock,
    );

    assert!(limiter.try_acquire());
    assert!(limiter.try_acquire());
    assert!(!limiter.try_acquire(), "third request in the same window should be throttled");

    test_clock.advance(150);

    assert!(limiter.try_acquire(), "window rolled forward, capacity should be available again");
}

#[tokio::test]
async fn waiter_is_admitted_as_soon_as_the_window_frees_capacity() {
    let test_clock = TestClock::new();
    let clock: Arc<dyn Clock> = Arc::new(test_clock.clone());
    let limiter = Arc::new(RateLimiter::new(
        RateLimiterConfigBuilder::new().max_requests(1).window_ms(100).build(),
        clock,
    ));

    assert!(limiter.try_acquire());

    let waiter = {
        let limiter = Arc::clone(&limiter);
        tokio::spawn(async move { limiter.acquire(Some(1_000), &tokio_util::sync::CancellationToken::new()).await })
    };

    tokio::task::yield_now().await;
    test_clock.advance(150);

    assert!(waiter.await.unwrap(), "waiter should be admitted once the window rolls");
}
