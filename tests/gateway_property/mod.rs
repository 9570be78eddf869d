//! Property tests for the gateway's resilience invariants.

mod support;

mod bounds;
mod breaker_exclusion;
mod fifo_wake;
mod monotone_stats;
mod no_leaks;
mod rate_limit;
