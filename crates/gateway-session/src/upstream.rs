//! Stable identifiers and health state for upstream backends.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Stable identifier of a backend (MCP server, gateway, or direct upstream).
/// Immutable once constructed; equality and hashing are by `id` alone so two
/// refs with the same id but different display labels still collide, which
/// is what a `HashMap<UpstreamRef, _>` registry needs.
#[derive(Debug, Clone)]
pub struct UpstreamRef {
    id: Arc<str>,
    label: Arc<str>,
}

impl UpstreamRef {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
        }
    }

    pub fn with_label(id: impl Into<Arc<str>>, label: impl Into<Arc<str>>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl PartialEq for UpstreamRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for UpstreamRef {}

impl Hash for UpstreamRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for UpstreamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Health as observed by the pool's pre-ping and invocation outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHealth {
    pub healthy: bool,
    pub last_error: Option<String>,
}

impl SessionHealth {
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            last_error: None,
        }
    }

    pub fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            healthy: false,
            last_error: Some(error.into()),
        }
    }
}
