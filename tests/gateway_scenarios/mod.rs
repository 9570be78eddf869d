//! Seed scenarios for the gateway's dispatch pipeline.
//!
//! Each submodule drives the real component crates together (no mocked
//! internals) through one named scenario from the acceptance set: the
//! happy path, pool saturation, breaker open/recover, rate-limit windows,
//! adaptive strategy switching, and cancellation mid-wait.

mod support;

mod adaptive_strategy;
mod breaker_recovery;
mod cancellation;
mod happy_path;
mod rate_limit_window;
mod saturation_timeout;
