//! Callbacks delivered by the resource manager
//!
//! Events for one driver are delivered serially; an implementation never sees
//! two callbacks running at the same time from the same driver.

use std::sync::Arc;

use async_trait::async_trait;

use common::models::{MasterInfo, Offer, TaskStatus};

use crate::driver::SchedulerDriver;

/// Lifecycle events of a framework
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// The framework registered for the first time and was assigned an identity
    async fn registered(
        &self,
        driver: Arc<dyn SchedulerDriver>,
        framework_id: &str,
        master: &MasterInfo,
    );

    /// The framework re-registered with an existing identity
    async fn reregistered(&self, driver: Arc<dyn SchedulerDriver>, master: &MasterInfo);

    /// The connection to the resource manager was lost
    async fn disconnected(&self, driver: Arc<dyn SchedulerDriver>);

    /// Resources were offered
    async fn resource_offers(&self, driver: Arc<dyn SchedulerDriver>, offers: &[Offer]);

    /// An earlier offer is no longer valid
    async fn offer_rescinded(&self, driver: Arc<dyn SchedulerDriver>, offer_id: &str);

    /// A task changed state
    async fn status_update(&self, driver: Arc<dyn SchedulerDriver>, status: &TaskStatus);

    /// An executor sent a message
    async fn framework_message(
        &self,
        driver: Arc<dyn SchedulerDriver>,
        executor_id: &str,
        agent_id: &str,
        message: &str,
    );

    /// An agent was lost
    async fn agent_lost(&self, driver: Arc<dyn SchedulerDriver>, agent_id: &str);

    /// An executor exited or was lost
    async fn executor_lost(
        &self,
        driver: Arc<dyn SchedulerDriver>,
        executor_id: &str,
        agent_id: &str,
        status: i32,
    );

    /// The resource manager reported an error
    async fn error(&self, driver: Arc<dyn SchedulerDriver>, message: &str);
}
