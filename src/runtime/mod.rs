use async_trait::async_trait;

use crate::error::Result;
use crate::layer::ServiceConfig;

pub mod memory;
pub use memory::InMemoryWorkload;

/// Control surface of the workload runtime.
///
/// Every operation reports unavailability instead of hanging; callers
/// skip the rest of a pass when `is_connected` is false.
#[async_trait]
pub trait WorkloadController: Send + Sync {
    /// Whether the runtime endpoint is reachable at all.
    async fn is_connected(&self) -> bool;

    /// The configuration the service is currently running, absent if no
    /// service has ever been configured.
    async fn current_config(&self) -> Result<Option<ServiceConfig>>;

    /// Install a configuration as the new desired state, replacing the
    /// previous one wholesale. Applying an identical configuration twice
    /// leaves state unchanged and does not restart anything.
    async fn apply(&self, config: ServiceConfig) -> Result<()>;

    /// Restart the managed service. `NotFound` if it was never
    /// configured, `Unavailable` if the runtime cannot be reached.
    async fn restart(&self) -> Result<()>;

    async fn is_running(&self) -> bool;
}
