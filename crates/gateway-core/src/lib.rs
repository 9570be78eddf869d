//! Core infrastructure shared by every gateway component.
//!
//! This crate provides the pieces the rate limiter, circuit breaker,
//! session pool, pool manager, and dispatcher all depend on:
//! - [`clock`]: injectable time source and cancellable deadlines
//! - [`error`]: the unified [`error::GatewayError`] taxonomy
//! - [`events`]: observability event system

pub mod clock;
pub mod error;
pub mod events;

pub use clock::{Clock, Deadline, Millis, SystemClock, TestClock};
pub use error::{ErrorKind, ErrorWire, GatewayError, JitteredBackoff};
pub use events::{EventListener, ResilienceEvent};
