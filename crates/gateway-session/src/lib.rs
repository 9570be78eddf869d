//! Upstream session contract and the traits the gateway uses to construct
//! and resolve them.
//!
//! This crate defines the seam between the gateway core and the transport
//! layer: [`UpstreamSession`] for invoking a backend, [`SessionFactory`] for
//! constructing one, and [`Catalog`] for resolving a client-facing target
//! name to a stable [`UpstreamRef`]. None of these traits know anything
//! about HTTP, gRPC, or any other wire protocol.

pub mod factory;
pub mod session;
pub mod upstream;

pub use factory::{Catalog, SessionFactory};
pub use session::UpstreamSession;
pub use upstream::{SessionHealth, UpstreamRef};
