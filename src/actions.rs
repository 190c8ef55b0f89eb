//! User-triggered actions against the char REST API.
//!
//! These bypass the reconciliation pass: `attack` and `global_status`
//! talk straight to the workload's own HTTP endpoint, `respawn` goes to
//! the runtime controller. Failures are returned to the caller; nothing
//! here mutates reconciler state.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use log::{info, warn};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::directory::PeerDirectory;
use crate::error::Result;
use crate::runtime::WorkloadController;

/// Deadline for each outbound call to a char endpoint. Peers are
/// untrusted network endpoints; no call here may hang.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// The `/status` payload a char serves.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CharStatus {
    pub name: String,
    pub hp: i64,
}

/// One endpoint's entry in a global status sweep.
#[derive(Debug)]
pub struct StatusReport {
    /// `address:port` the query went to.
    pub host: String,
    pub status: Result<CharStatus>,
}

pub struct ActionHandlers<C> {
    client: Client,
    port: u16,
    controller: Arc<C>,
    directory: Arc<RwLock<PeerDirectory>>,
}

impl<C: WorkloadController> ActionHandlers<C> {
    pub fn new(
        port: u16,
        controller: Arc<C>,
        directory: Arc<RwLock<PeerDirectory>>,
    ) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            port,
            controller,
            directory,
        })
    }

    /// Let the bloodbath begin: hit the local char, which lashes out at
    /// every char in sight, which retaliate, and so on.
    pub async fn attack(&self, damage: u32) -> Result<()> {
        let url = format!("http://localhost:{}/attack/?damage={}", self.port, damage);
        info!("attacking local char with damage {damage}");
        self.client.post(&url).send().await?.error_for_status()?;
        Ok(())
    }

    /// Revive a dead char by restarting its service.
    pub async fn respawn(&self) -> Result<()> {
        self.controller.restart().await
    }

    /// Query this unit and every known peer for name and hit points.
    ///
    /// Queries run concurrently and independently: an unreachable peer
    /// gets a failure entry, the rest of the sweep completes. Dropping
    /// the returned future cancels all in-flight queries.
    pub async fn global_status(&self) -> Vec<StatusReport> {
        let mut hosts = vec![format!("localhost:{}", self.port)];
        hosts.extend(self.directory.read().await.peer_addresses(self.port));
        let reports = self.status_sweep(hosts).await;

        let sitrep: serde_json::Map<String, serde_json::Value> = reports
            .iter()
            .filter_map(|r| r.status.as_ref().ok())
            .map(|s| (s.name.clone(), s.hp.into()))
            .collect();
        info!(
            "SITREP: {}",
            serde_json::to_string_pretty(&sitrep).unwrap_or_default()
        );
        reports
    }

    async fn status_sweep(&self, hosts: Vec<String>) -> Vec<StatusReport> {
        let queries = hosts.into_iter().map(|host| async move {
            let status = self.query_status(&host).await;
            if let Err(ref err) = status {
                warn!("status query to {host} failed: {err}");
            }
            StatusReport { host, status }
        });
        join_all(queries).await
    }

    async fn query_status(&self, host: &str) -> Result<CharStatus> {
        let url = format!("http://{host}/status");
        let resp = self.client.get(&url).send().await?.error_for_status()?;
        Ok(resp.json::<CharStatus>().await?)
    }
}
