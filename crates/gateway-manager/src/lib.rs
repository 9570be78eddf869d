//! Registry of per-upstream session pools (C7): lazy pool creation, the
//! auto-adjust loop, bounded-parallel draining, and config-replacement.

pub mod registry;

pub use registry::{PoolManager, PoolManagerConfig};
