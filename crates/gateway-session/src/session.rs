//! The upstream session contract (C4).

use async_trait::async_trait;

/// A live connection/handle to one upstream backend.
///
/// The core treats every failure uniformly: any error from [`Self::invoke`]
/// or [`Self::ping`] is a session failure, reported to the pool so it can
/// drive the circuit breaker and recycling decisions. `Request`/`Response`
/// are opaque to the gateway core; the transport layer that implements this
/// trait owns their shape.
#[async_trait]
pub trait UpstreamSession: Send + Sync + 'static {
    type Request: Send + 'static;
    type Response: Send + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Lightweight liveness probe, distinct from [`Self::invoke`] so the
    /// pool's pre-ping path doesn't need a real request payload.
    async fn ping(&self) -> Result<(), Self::Error>;

    /// Performs one request/response round trip.
    async fn invoke(&self, request: Self::Request) -> Result<Self::Response, Self::Error>;

    /// Releases any underlying transport resources. Called once, when the
    /// pool evicts the session; never called while the session is in use.
    async fn close(&self);

    /// Used for pre-ping: returns `false` without necessarily returning an
    /// `Err`, e.g. for a session that reports itself degraded rather than
    /// erroring outright.
    async fn health_check(&self) -> bool {
        self.ping().await.is_ok()
    }
}
