//! The "sees" relation protocol.
//!
//! Other applications learn where the char service can be reached
//! through the `sees` interface: the requiring side publishes a small
//! configuration mapping into the application databag, the providing
//! side validates what it received. Exactly three keys are recognized:
//!
//! * `service-hostname` (required)
//! * `service-name` (required)
//! * `service-port` (optional)
//!
//! Validation failures publish nothing; the caller surfaces them as a
//! blocked status with a fixed diagnostic.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::error;

use crate::error::{Error, Result};
use crate::relation::RelationStore;

pub const REQUIRED_FIELDS: [&str; 2] = ["service-hostname", "service-name"];
pub const OPTIONAL_FIELDS: [&str; 1] = ["service-port"];

/// Diagnostic reported whenever the configuration mapping is rejected.
pub const BLOCKED_MESSAGE: &str = "error in sees relation data, check unit logs";

fn is_recognized(field: &str) -> bool {
    REQUIRED_FIELDS.contains(&field) || OPTIONAL_FIELDS.contains(&field)
}

/// Requiring side: publishes the service's hostname/name/port mapping.
pub struct SeesRequirer<S> {
    store: Arc<S>,
    config: BTreeMap<String, String>,
}

impl<S: RelationStore> SeesRequirer<S> {
    pub fn new(store: Arc<S>, config: BTreeMap<String, String>) -> Self {
        Self { store, config }
    }

    /// Check the config mapping for errors. `update_only` skips the
    /// missing-required-keys check, for partial updates to an already
    /// published mapping.
    fn config_errors(&self, update_only: bool) -> Option<String> {
        let unknown: Vec<&str> = self
            .config
            .keys()
            .map(String::as_str)
            .filter(|k| !is_recognized(k))
            .collect();
        if !unknown.is_empty() {
            return Some(format!(
                "unknown key(s) in sees config: {}",
                unknown.join(", ")
            ));
        }
        if !update_only {
            let missing: Vec<&str> = REQUIRED_FIELDS
                .iter()
                .copied()
                .filter(|k| !self.config.contains_key(*k))
                .collect();
            if !missing.is_empty() {
                return Some(format!(
                    "missing required key(s) in sees config: {}",
                    missing.join(", ")
                ));
            }
        }
        None
    }

    /// Publish the full mapping. Only the leader writes application
    /// data; on a non-leader unit this is a no-op, as the databag is
    /// already owned by whoever leads.
    pub fn publish(&self) -> Result<()> {
        if !self.store.is_leader() {
            return Ok(());
        }
        if let Some(detail) = self.config_errors(false) {
            error!("sees relation error: {detail}");
            return Err(Error::Validation(BLOCKED_MESSAGE.into()));
        }
        for (key, value) in &self.config {
            self.store.write_app(key, value)?;
        }
        Ok(())
    }

    /// Replace the mapping and publish it. Partial updates only check
    /// for unknown keys; required keys may live in the previously
    /// published data.
    pub fn update_config(&mut self, config: BTreeMap<String, String>) -> Result<()> {
        self.config = config;
        if !self.store.is_leader() {
            return Ok(());
        }
        if let Some(detail) = self.config_errors(true) {
            error!("sees relation error: {detail}");
            return Err(Error::Validation(BLOCKED_MESSAGE.into()));
        }
        for (key, value) in &self.config {
            self.store.write_app(key, value)?;
        }
        Ok(())
    }
}

/// Typed view of a validated sees mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeesData {
    pub service_hostname: String,
    pub service_name: String,
    pub service_port: Option<String>,
}

/// Providing side: validates the mapping the remote application
/// published.
pub struct SeesProvider<S> {
    store: Arc<S>,
}

impl<S: RelationStore> SeesProvider<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Read and validate the published mapping. Missing required fields
    /// are reported sorted, all at once.
    pub fn receive(&self) -> Result<SeesData> {
        let read = |field: &str| self.store.read_app(field);

        let mut missing: Vec<&str> = REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|f| read(f).is_none())
            .collect();
        missing.sort_unstable();
        if !missing.is_empty() {
            let detail = format!("missing fields for sees: {}", missing.join(", "));
            error!("{detail}");
            return Err(Error::Validation(detail));
        }

        Ok(SeesData {
            service_hostname: read("service-hostname").unwrap_or_default(),
            service_name: read("service-name").unwrap_or_default(),
            service_port: read("service-port"),
        })
    }
}
