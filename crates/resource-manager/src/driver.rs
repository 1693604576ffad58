//! Calls issued to the resource manager

use async_trait::async_trait;

use common::error::Result;
use common::models::TaskStatus;

/// Handle used by the scheduler to talk back to the resource manager
#[async_trait]
pub trait SchedulerDriver: Send + Sync {
    /// Asks the resource manager to report the current status of the given
    /// tasks. An empty list asks for every task it knows about.
    async fn reconcile_tasks(&self, statuses: Vec<TaskStatus>) -> Result<()>;

    /// Forcibly terminates a task
    async fn kill_task(&self, task_id: &str) -> Result<()>;

    /// Stops the driver and unregisters the framework
    async fn stop(&self) -> Result<()>;
}
