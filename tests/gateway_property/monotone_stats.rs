//! P6: pool statistics counters only ever increase. There is no reset path,
//! so a snapshot taken after N operations must dominate a snapshot taken
//! before them, field by field.

use super::support::FakeFactory;
use gateway_core::{Clock, SystemClock};
use gateway_pool::{Outcome, SessionConfigBuilder, SessionPool};
use gateway_session::UpstreamRef;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn counters_never_decrease_across_mixed_outcomes() {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let config = SessionConfigBuilder::new()
        .min_size(1)
        .size(2)
        .max_size(2)
        .pre_ping(false)
        .build()
        .unwrap();
    let pool = SessionPool::new(
        UpstreamRef::new("svc-monotone"),
        config,
        FakeFactory { fail_first_n: 0, latency_ms: 0 },
        clock,
    );
    let cancel = CancellationToken::new();

    let mut previous = pool.stats();
    for round in 0..10 {
        let handle = pool.acquire(Some(1_000), &cancel).await.unwrap();
        let outcome = if round % 3 == 0 { Outcome::Err } else { Outcome::Ok };
        pool.release(handle, outcome).await;

        let current = pool.stats();
        assert!(current.total_acquisitions >= previous.total_acquisitions);
        assert!(current.total_releases >= previous.total_releases);
        assert!(current.total_timeouts >= previous.total_timeouts);
        assert!(current.total_errors >= previous.total_errors);
        previous = current;
    }

    assert_eq!(previous.total_acquisitions, 10);
    assert_eq!(previous.total_releases, 10);

    // A timed-out acquisition against a saturated pool still only ever
    // grows the timeout counter, never rolls it back.
    let _first = pool.acquire(Some(1_000), &cancel).await.unwrap();
    let _second = pool.acquire(Some(1_000), &cancel).await.unwrap();
    let timed_out = pool.acquire(Some(20), &cancel).await;
    assert!(timed_out.is_err());

    let after_timeout = pool.stats();
    assert!(after_timeout.total_timeouts > previous.total_timeouts);
    assert!(after_timeout.total_acquisitions >= previous.total_acquisitions);
}
