//! Data structures used throughout the reconciler.
//!
//! These types are serialised using [`serde`](https://serde.rs/) so the
//! host delivering the triggers can hand them over as plain JSON. They
//! represent high level occurrences in the unit's lifecycle rather than
//! any particular host API; the fields are kept minimal.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of one unit of the service.
///
/// Opaque to this crate; ordering is only used to keep derived state
/// deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId(String);

impl UnitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UnitId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A lifecycle trigger delivered by the host.
///
/// Each variant either carries new local state (config values) or names
/// the peer a relation event concerns. Peer addresses are not carried
/// here; the reconciler reads them from the relation store, which is
/// where peers publish them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Local configuration was changed; carries the resolved values.
    ConfigChanged(crate::config::Config),
    /// The workload runtime endpoint reported readiness.
    WorkloadReady,
    /// Explicit start signal.
    Start,
    /// A peer unit joined the relation. Its address may not be published
    /// yet.
    PeerJoined { unit: UnitId },
    /// A peer unit refreshed its relation data.
    PeerChanged { unit: UnitId },
    /// A peer unit left the relation.
    PeerDeparted { unit: UnitId },
    /// This unit was elected leader.
    LeaderElected,
}

/// Externally visible status of the unit after a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitStatus {
    /// Requires external correction; re-delivery alone cannot fix it.
    Blocked(String),
    /// Waiting on infrastructure; self-heals on a later event.
    Waiting(String),
    /// The workload is configured and running with the current peer set.
    Active,
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitStatus::Blocked(reason) => write!(f, "blocked: {reason}"),
            UnitStatus::Waiting(reason) => write!(f, "waiting: {reason}"),
            UnitStatus::Active => f.write_str("active"),
        }
    }
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub status: UnitStatus,
    /// Whether the running configuration was altered.
    pub changed: bool,
    /// Whether the service was restarted.
    pub restarted: bool,
}

impl ReconcileOutcome {
    pub(crate) fn waiting(reason: impl Into<String>) -> Self {
        Self {
            status: UnitStatus::Waiting(reason.into()),
            changed: false,
            restarted: false,
        }
    }
}
