use async_trait::async_trait;
use log::info;
use tokio::sync::Mutex;

use super::WorkloadController;
use crate::error::{Error, Result};
use crate::layer::ServiceConfig;

/// In-memory workload controller.
///
/// Simulates the runtime endpoint: a connectivity flag, the currently
/// applied configuration, and a running flag. Used as the reconciliation
/// target in tests and embedding harnesses; the production controller
/// lives with the host runtime.
pub struct InMemoryWorkload {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    connected: bool,
    config: Option<ServiceConfig>,
    running: bool,
    restarts: u32,
    restart_error: Option<Error>,
}

impl InMemoryWorkload {
    /// Starts disconnected, mirroring a pod whose runtime endpoint has
    /// not come up yet.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    pub async fn set_connected(&self, connected: bool) {
        self.inner.lock().await.connected = connected;
    }

    /// Stop the service without clearing its configuration, as a crashed
    /// workload would.
    pub async fn kill_service(&self) {
        self.inner.lock().await.running = false;
    }

    /// Make the next restart fail with `err`. One-shot.
    pub async fn fail_next_restart(&self, err: Error) {
        self.inner.lock().await.restart_error = Some(err);
    }

    pub async fn restart_count(&self) -> u32 {
        self.inner.lock().await.restarts
    }

    pub async fn applied_config(&self) -> Option<ServiceConfig> {
        self.inner.lock().await.config.clone()
    }
}

impl Default for InMemoryWorkload {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkloadController for InMemoryWorkload {
    async fn is_connected(&self) -> bool {
        self.inner.lock().await.connected
    }

    async fn current_config(&self) -> Result<Option<ServiceConfig>> {
        let inner = self.inner.lock().await;
        if !inner.connected {
            return Err(Error::Unavailable("runtime endpoint not reachable".into()));
        }
        Ok(inner.config.clone())
    }

    async fn apply(&self, config: ServiceConfig) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.connected {
            return Err(Error::Unavailable("runtime endpoint not reachable".into()));
        }
        if inner.config.as_ref() != Some(&config) {
            info!("applying new configuration for service {}", config.service);
            inner.config = Some(config);
        }
        Ok(())
    }

    async fn restart(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.connected {
            return Err(Error::Unavailable("runtime endpoint not reachable".into()));
        }
        if inner.config.is_none() {
            return Err(Error::NotFound("service has never been configured".into()));
        }
        if let Some(err) = inner.restart_error.take() {
            return Err(err);
        }
        inner.running = true;
        inner.restarts += 1;
        info!("service restarted ({} total)", inner.restarts);
        Ok(())
    }

    async fn is_running(&self) -> bool {
        self.inner.lock().await.running
    }
}
