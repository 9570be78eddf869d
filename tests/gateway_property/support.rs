//! Shared fakes for pool/breaker/rate-limiter property tests.

use async_trait::async_trait;
use gateway_session::{SessionFactory, UpstreamRef, UpstreamSession};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
#[error("fake session error")]
pub struct FakeError;

pub struct FakeSession {
    pub fail_first_n: AtomicUsize,
    pub latency_ms: u64,
}

#[async_trait]
impl UpstreamSession for FakeSession {
    type Request = ();
    type Response = ();
    type Error = FakeError;

    async fn ping(&self) -> Result<(), FakeError> {
        Ok(())
    }

    async fn invoke(&self, _request: ()) -> Result<(), FakeError> {
        if self.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.latency_ms)).await;
        }
        if self.fail_first_n.load(Ordering::SeqCst) > 0 {
            self.fail_first_n.fetch_sub(1, Ordering::SeqCst);
            return Err(FakeError);
        }
        Ok(())
    }

    async fn close(&self) {}
}

#[derive(Clone)]
pub struct FakeFactory {
    pub fail_first_n: usize,
    pub latency_ms: u64,
}

#[async_trait]
impl SessionFactory for FakeFactory {
    type Session = FakeSession;

    async fn create(&self, _upstream: &UpstreamRef) -> Result<FakeSession, FakeError> {
        Ok(FakeSession {
            fail_first_n: AtomicUsize::new(self.fail_first_n),
            latency_ms: self.latency_ms,
        })
    }
}
