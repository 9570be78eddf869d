//! Session construction and target resolution (§6 external interfaces).

use crate::session::UpstreamSession;
use crate::upstream::UpstreamRef;
use async_trait::async_trait;

/// Constructs new sessions for an upstream. Supplied externally so the
/// gateway core never depends on a concrete transport.
#[async_trait]
pub trait SessionFactory: Send + Sync + 'static {
    type Session: UpstreamSession;

    async fn create(
        &self,
        upstream: &UpstreamRef,
    ) -> Result<Self::Session, <Self::Session as UpstreamSession>::Error>;
}

/// Resolves a client-facing target name to a stable [`UpstreamRef`].
#[async_trait]
pub trait Catalog: Send + Sync + 'static {
    async fn resolve(&self, target: &str) -> Option<UpstreamRef>;
}
