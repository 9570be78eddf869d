//! Request dispatch (C8): the gateway's single entry point tying the rate
//! limiter, catalog, pool manager, and session invocation together into one
//! contract callers drive per request.

pub mod config;
pub mod dispatcher;
pub mod events;

pub use config::{DispatcherConfig, DispatcherConfigBuilder, RetryPredicate};
pub use dispatcher::{DispatchOutcome, Dispatcher, InvokeTimedOut};
pub use events::DispatchEvent;
