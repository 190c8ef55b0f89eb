//! In-memory peer directory.
//!
//! Holds the addresses other units have published, keyed by unit id,
//! plus this unit's own address in a separate slot. The map never
//! contains the owning unit and never stores an empty address; both are
//! enforced here rather than left to callers.

use std::collections::BTreeMap;

use log::debug;

use crate::types::UnitId;

#[derive(Debug)]
pub struct PeerDirectory {
    own_unit: UnitId,
    self_address: Option<String>,
    peers: BTreeMap<UnitId, String>,
}

impl PeerDirectory {
    pub fn new(own_unit: UnitId) -> Self {
        Self {
            own_unit,
            self_address: None,
            peers: BTreeMap::new(),
        }
    }

    /// Insert or refresh a peer's address.
    ///
    /// An absent or empty address is a no-op: a previously stored address
    /// stays in place, and nothing is ever stored that would render as
    /// `":port"`.
    pub fn upsert_peer(&mut self, unit: UnitId, address: Option<String>) {
        if unit == self.own_unit {
            return;
        }
        match address {
            Some(addr) if !addr.is_empty() => {
                debug!("peer {} -> {}", unit, addr);
                self.peers.insert(unit, addr);
            }
            _ => {}
        }
    }

    /// Remove a peer. Removing an unknown unit is not an error.
    pub fn remove_peer(&mut self, unit: &UnitId) {
        if self.peers.remove(unit).is_some() {
            debug!("peer {} removed", unit);
        }
    }

    /// Record the latest address the binding layer reported for this
    /// unit. Absent or empty observations keep the previous value.
    pub fn observe_self_address(&mut self, address: Option<String>) {
        if let Some(addr) = address {
            if !addr.is_empty() {
                self.self_address = Some(addr);
            }
        }
    }

    pub fn self_address(&self) -> Option<&str> {
        self.self_address.as_deref()
    }

    /// All known peer addresses as `"address:port"`, ordered by unit id
    /// so repeated calls over identical contents yield identical output.
    pub fn peer_addresses(&self, port: u16) -> Vec<String> {
        self.peers
            .values()
            .map(|addr| format!("{addr}:{port}"))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }
}
