//! Peer-data store abstraction.
//!
//! Units exchange configuration through a shared keyed store: each unit
//! writes fields under its own key, and the elected leader writes
//! application-wide fields readable by everyone. The transport behind it
//! is external; this trait is the whole contract the reconciler and the
//! sees protocol rely on.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::types::UnitId;

/// Field under which each unit publishes its own reachable address.
pub const FIELD_PRIVATE_ADDRESS: &str = "private_address";

pub trait RelationStore: Send + Sync {
    /// Whether this unit currently holds leadership.
    fn is_leader(&self) -> bool;

    /// Address the binding layer assigned to this unit, if any. Not
    /// guaranteed stable across events.
    fn bind_address(&self) -> Option<String>;

    /// Read a field another unit published for itself.
    fn read(&self, unit: &UnitId, field: &str) -> Option<String>;

    /// Publish a field under this unit's own key. Idempotent overwrite.
    fn write_own(&self, field: &str, value: &str);

    /// Read an application-wide field.
    fn read_app(&self, field: &str) -> Option<String>;

    /// Publish an application-wide field. Only the leader may write
    /// here; everyone else gets a `Validation` error.
    fn write_app(&self, field: &str, value: &str) -> Result<()>;
}

/// In-memory relation store.
///
/// Backs tests and embedding harnesses the same way the in-memory
/// workload controller does; the production store is implemented by the
/// host.
pub struct InMemoryRelation {
    own_unit: UnitId,
    inner: Mutex<Bags>,
}

#[derive(Default)]
struct Bags {
    leader: bool,
    bind_address: Option<String>,
    units: HashMap<UnitId, HashMap<String, String>>,
    app: HashMap<String, String>,
}

impl InMemoryRelation {
    pub fn new(own_unit: UnitId) -> Self {
        Self {
            own_unit,
            inner: Mutex::new(Bags::default()),
        }
    }

    pub fn set_leader(&self, leader: bool) {
        self.lock().leader = leader;
    }

    pub fn set_bind_address(&self, address: Option<String>) {
        self.lock().bind_address = address;
    }

    /// Publish a field on behalf of another unit, as that unit's own
    /// write would.
    pub fn publish_peer(&self, unit: UnitId, field: &str, value: &str) {
        self.lock()
            .units
            .entry(unit)
            .or_default()
            .insert(field.to_string(), value.to_string());
    }

    pub fn app_data(&self) -> HashMap<String, String> {
        self.lock().app.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Bags> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl RelationStore for InMemoryRelation {
    fn is_leader(&self) -> bool {
        self.lock().leader
    }

    fn bind_address(&self) -> Option<String> {
        self.lock().bind_address.clone()
    }

    fn read(&self, unit: &UnitId, field: &str) -> Option<String> {
        self.lock().units.get(unit)?.get(field).cloned()
    }

    fn write_own(&self, field: &str, value: &str) {
        let own = self.own_unit.clone();
        self.lock()
            .units
            .entry(own)
            .or_default()
            .insert(field.to_string(), value.to_string());
    }

    fn read_app(&self, field: &str) -> Option<String> {
        self.lock().app.get(field).cloned()
    }

    fn write_app(&self, field: &str, value: &str) -> Result<()> {
        let mut bags = self.lock();
        if !bags.leader {
            return Err(Error::Validation(
                "only the leader may write application data".into(),
            ));
        }
        bags.app.insert(field.to_string(), value.to_string());
        Ok(())
    }
}
