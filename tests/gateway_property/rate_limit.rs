//! P5: a sliding-window rate limiter never admits more than `max_requests`
//! within any single window, regardless of burst size or timing.

use gateway_core::{Clock, TestClock};
use gateway_ratelimiter::{RateLimiter, RateLimiterConfigBuilder};
use proptest::prelude::*;
use std::sync::Arc;

fn never_over_admits(max_requests: usize, window_ms: u64, burst: usize) {
    let clock = TestClock::new();
    let config = RateLimiterConfigBuilder::new()
        .max_requests(max_requests)
        .window_ms(window_ms)
        .build();
    let limiter = RateLimiter::new(config, Arc::new(clock) as Arc<dyn Clock>);

    let admitted = (0..burst).filter(|_| limiter.try_acquire()).count();

    assert!(
        admitted <= max_requests,
        "admitted {admitted} requests within one window against a limit of {max_requests}"
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn a_single_window_never_admits_past_its_limit(
        max_requests in 1usize..50,
        window_ms in 10u64..2_000,
        burst in 1usize..200,
    ) {
        never_over_admits(max_requests, window_ms, burst);
    }
}

#[tokio::test]
async fn the_window_rolling_forward_restores_capacity_exactly() {
    let clock = TestClock::new();
    let config = RateLimiterConfigBuilder::new().max_requests(3).window_ms(100).build();
    let limiter = RateLimiter::new(config, Arc::new(clock.clone()) as Arc<dyn Clock>);

    for _ in 0..3 {
        assert!(limiter.try_acquire());
    }
    assert!(!limiter.try_acquire());

    clock.advance(150);

    for _ in 0..3 {
        assert!(limiter.try_acquire());
    }
    assert!(!limiter.try_acquire());
}
