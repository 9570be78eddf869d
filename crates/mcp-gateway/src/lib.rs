//! A session-pooled, resilient gateway for federating MCP servers and
//! REST/A2A/gRPC upstreams behind one dispatch contract.
//!
//! `mcp-gateway` re-exports a set of independent component crates, each
//! addressable on its own and composable into the full dispatch pipeline:
//!
//! - **[`core`]** — clock abstraction, the fixed [`core::GatewayError`]
//!   taxonomy, and the event system shared by every other component.
//! - **[`ratelimiter`]** *(feature `ratelimiter`)* — admission control via
//!   sliding-log, fixed-window, or sliding-counter limits.
//! - **[`breaker`]** *(feature `breaker`)* — a consecutive-failure circuit
//!   breaker with half-open probing.
//! - **[`session`]** *(feature `session`)* — the `UpstreamSession`,
//!   `SessionFactory`, and `Catalog` traits upstreams implement.
//! - **[`pool`]** *(feature `pool`)* — per-upstream session pools with
//!   adaptive sizing, idle recycling, and FIFO waiter wake order.
//! - **[`manager`]** *(feature `manager`)* — a registry of pools keyed by
//!   upstream, with lazy creation, an auto-adjust loop, and bounded-parallel
//!   shutdown draining.
//! - **[`dispatcher`]** *(feature `dispatcher`)* — the end-to-end request
//!   contract: admit, resolve, acquire, invoke with a per-attempt deadline,
//!   retry, release, and emit one terminal event.
//!
//! # Quick start
//!
//! ```toml
//! [dependencies]
//! mcp-gateway = { version = "0.1", features = ["full"] }
//! ```
//!
//! Enable only the components a caller needs; `dispatcher` pulls in
//! `manager`, `ratelimiter`, `pool`, and `session` as its prerequisites.
//!
//! # Composition
//!
//! ```text
//! ┌─────────────────┐
//! │     Request      │
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │   Rate Limiter    │  admit
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │     Catalog       │  resolve target -> UpstreamRef
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │   Pool Manager     │  acquire a session (lazy per-upstream pool)
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │ Circuit Breaker    │  wraps each pooled session's invoke
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │ Upstream Session   │  invoke, with a per-attempt deadline
//! └─────────────────┘
//! ```

// Core is always available.
pub use gateway_core as core;

#[cfg(feature = "ratelimiter")]
pub use gateway_ratelimiter as ratelimiter;

#[cfg(feature = "breaker")]
pub use gateway_breaker as breaker;

#[cfg(feature = "session")]
pub use gateway_session as session;

#[cfg(feature = "pool")]
pub use gateway_pool as pool;

#[cfg(feature = "manager")]
pub use gateway_manager as manager;

#[cfg(feature = "dispatcher")]
pub use gateway_dispatcher as dispatcher;
