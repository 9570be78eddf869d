//! Bounded session pool (C5) and strategy metrics (C6) for one upstream.
//!
//! A [`SessionPool`] owns a bounded set of [`gateway_session::UpstreamSession`]
//! instances for a single [`gateway_session::UpstreamRef`], selects among idle
//! sessions using a [`SelectionStrategy`], and feeds every acquisition's
//! outcome back into [`StrategyMetrics`] so the `adaptive` strategy has
//! something to rank against.

pub mod config;
pub mod events;
pub mod metrics;
pub mod pool;
pub mod stats;
pub mod strategy;

pub use config::{SessionConfig, SessionConfigBuilder, SessionConfigError};
pub use events::{EvictionReason, PoolEvent};
pub use metrics::{StrategyMetrics, StrategySample, StrategySummary};
pub use pool::{AcquisitionHandle, Outcome, SessionPool};
pub use stats::{PoolStats, PoolStatsSnapshot};
pub use strategy::SelectionStrategy;
