//! Coordinator reacting to resource-manager events and administrative requests
//!
//! The coordinator owns the cluster state, persists it after every
//! state-affecting event and drives the reconciler. It keeps the most recent
//! driver handle so reconciliation can also be triggered from outside a
//! callback.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use common::error::{Error, Result};
use common::models::{Group, MasterInfo, Offer, TaskStatus};
use resource_manager::{fmt, Scheduler, SchedulerDriver};
use storage_adapter::Storage;

use crate::reconciler::{Reconciler, ReconcilerConfig};
use crate::state::ClusterState;

/// Orchestration controller
pub struct Coordinator {
    /// Cluster state
    cluster: Arc<ClusterState>,

    /// Durable storage for the cluster state
    storage: Arc<dyn Storage>,

    /// Task reconciler
    reconciler: Reconciler,

    /// Driver handle retained at (re)registration
    driver: RwLock<Option<Arc<dyn SchedulerDriver>>>,

    /// Orders snapshots with their writes
    persist_lock: Mutex<()>,
}

impl Coordinator {
    /// Creates a coordinator from the state found in storage.
    ///
    /// Uninitialized storage yields an empty state; any other load or decode
    /// failure is returned.
    pub async fn new(storage: Arc<dyn Storage>, reconciler: ReconcilerConfig) -> Result<Self> {
        let cluster = match storage.load().await {
            Ok(bytes) => {
                let cluster = ClusterState::from_bytes(&bytes)?;
                info!(
                    "Loaded cluster state from {}: framework {:?}, {} groups",
                    storage,
                    cluster.framework_id(),
                    cluster.list_groups().len()
                );
                cluster
            }
            Err(e) if e.is_uninitialized() => {
                info!("No cluster state in {}, starting empty", storage);
                ClusterState::new()
            }
            Err(e) => return Err(e),
        };

        Ok(Self {
            cluster: Arc::new(cluster),
            storage,
            reconciler: Reconciler::new(reconciler),
            driver: RwLock::new(None),
            persist_lock: Mutex::new(()),
        })
    }

    /// Cluster state handle
    pub fn cluster(&self) -> Arc<ClusterState> {
        self.cluster.clone()
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Writes the current cluster state to storage
    pub async fn save_cluster_state(&self) -> Result<()> {
        let _guard = self.persist_lock.lock().await;
        let bytes = self.cluster.to_bytes()?;
        self.storage.save(&bytes).await
    }

    /// Adds a new group and persists the state
    pub async fn add_group(&self, group: Group) -> Result<()> {
        if group.id.is_empty() {
            return Err(Error::GroupIdRequired);
        }

        let id = group.id.clone();
        if !self.cluster.insert_group_if_absent(group) {
            return Err(Error::GroupExists(id));
        }
        info!("Added group {}", id);

        self.save_cluster_state().await
    }

    pub fn list_groups(&self) -> Vec<Group> {
        self.cluster.list_groups()
    }

    /// Runs an explicit reconciliation of the given tasks
    pub async fn reconcile_tasks(&self, task_ids: &[String]) -> Result<()> {
        let driver = self.driver().ok_or(Error::NotRegistered)?;
        self.reconciler
            .explicit_reconcile(task_ids, driver.as_ref())
            .await
    }

    /// Stops the driver
    pub async fn shutdown(&self, driver: &dyn SchedulerDriver) -> Result<()> {
        info!("Shutdown triggered, stopping driver");
        driver.stop().await
    }

    fn driver(&self) -> Option<Arc<dyn SchedulerDriver>> {
        self.driver.read().clone()
    }

    fn retain_driver(&self, driver: Arc<dyn SchedulerDriver>) {
        *self.driver.write() = Some(driver);
    }

    async fn persist(&self, event: &str) {
        if let Err(e) = self.save_cluster_state().await {
            error!("[{}] Failed to save cluster state to {}: {}", event, self.storage, e);
        }
    }
}

#[async_trait]
impl Scheduler for Coordinator {
    async fn registered(
        &self,
        driver: Arc<dyn SchedulerDriver>,
        framework_id: &str,
        master: &MasterInfo,
    ) {
        info!("[Registered] framework: {} master: {}", framework_id, master);

        self.cluster.set_framework_id(framework_id);
        self.persist("Registered").await;

        self.retain_driver(driver.clone());
        if let Err(e) = self.reconciler.implicit_reconcile(driver.as_ref()).await {
            error!("[Registered] {}", e);
        }
    }

    async fn reregistered(&self, driver: Arc<dyn SchedulerDriver>, master: &MasterInfo) {
        info!("[Reregistered] master: {}", master);

        self.retain_driver(driver.clone());
        if let Err(e) = self.reconciler.implicit_reconcile(driver.as_ref()).await {
            error!("[Reregistered] {}", e);
        }
    }

    async fn disconnected(&self, _driver: Arc<dyn SchedulerDriver>) {
        info!("[Disconnected]");
    }

    async fn resource_offers(&self, _driver: Arc<dyn SchedulerDriver>, offers: &[Offer]) {
        debug!("[ResourceOffers] {}", fmt::offers(offers));

        // TODO: persist only once placement actually changes state
        self.persist("ResourceOffers").await;
    }

    async fn offer_rescinded(&self, _driver: Arc<dyn SchedulerDriver>, offer_id: &str) {
        info!("[OfferRescinded] {}", offer_id);
    }

    async fn status_update(&self, _driver: Arc<dyn SchedulerDriver>, status: &TaskStatus) {
        info!("[StatusUpdate] {}", fmt::status(status));

        self.persist("StatusUpdate").await;
        self.reconciler.update(status).await;
    }

    async fn framework_message(
        &self,
        _driver: Arc<dyn SchedulerDriver>,
        executor_id: &str,
        agent_id: &str,
        message: &str,
    ) {
        info!(
            "[FrameworkMessage] executor: {} slave: {} message: {}",
            executor_id, agent_id, message
        );
    }

    async fn agent_lost(&self, _driver: Arc<dyn SchedulerDriver>, agent_id: &str) {
        info!("[SlaveLost] {}", agent_id);
    }

    async fn executor_lost(
        &self,
        _driver: Arc<dyn SchedulerDriver>,
        executor_id: &str,
        agent_id: &str,
        status: i32,
    ) {
        info!(
            "[ExecutorLost] executor: {} slave: {} status: {}",
            executor_id, agent_id, status
        );
    }

    async fn error(&self, _driver: Arc<dyn SchedulerDriver>, message: &str) {
        error!("[Error] {}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::TaskState;
    use resource_manager::MockSchedulerDriver;
    use storage_adapter::filesystem::FileStorage;
    use tempfile::TempDir;

    async fn boot(dir: &TempDir) -> (Coordinator, Arc<FileStorage>) {
        let storage = Arc::new(FileStorage::new(dir.path().join("state.json")));
        let coordinator = Coordinator::new(storage.clone(), ReconcilerConfig::default())
            .await
            .unwrap();
        (coordinator, storage)
    }

    fn master() -> MasterInfo {
        MasterInfo {
            hostname: "master".to_string(),
            port: 5050,
        }
    }

    fn foo() -> Group {
        Group::new("foo", vec!["bar".to_string()], vec!["localhost:9092".to_string()])
    }

    #[tokio::test]
    async fn test_boot_from_uninitialized_storage() {
        let dir = TempDir::new().unwrap();
        let (coordinator, _) = boot(&dir).await;
        assert_eq!(coordinator.cluster().framework_id(), "");
        assert!(coordinator.list_groups().is_empty());
    }

    #[tokio::test]
    async fn test_boot_fails_on_corrupt_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"{not json").unwrap();

        let storage = Arc::new(FileStorage::new(path));
        let result = Coordinator::new(storage, ReconcilerConfig::default()).await;
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[tokio::test]
    async fn test_add_group_persists() {
        let dir = TempDir::new().unwrap();
        let (coordinator, storage) = boot(&dir).await;

        coordinator.add_group(foo()).await.unwrap();
        assert!(coordinator.cluster().exists_group("foo"));
        assert_eq!(coordinator.cluster().get_group("foo"), Some(foo()));

        let persisted = ClusterState::from_bytes(&storage.load().await.unwrap()).unwrap();
        assert_eq!(persisted.list_groups(), vec![foo()]);

        // a second coordinator sees the group
        let (restarted, _) = boot(&dir).await;
        assert_eq!(restarted.list_groups(), vec![foo()]);
    }

    #[tokio::test]
    async fn test_add_group_rejections() {
        let dir = TempDir::new().unwrap();
        let (coordinator, _) = boot(&dir).await;

        let err = coordinator
            .add_group(Group::new("", vec![], vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::GroupIdRequired));

        coordinator.add_group(foo()).await.unwrap();
        let err = coordinator
            .add_group(Group::new("foo", vec!["other".to_string()], vec![]))
            .await
            .unwrap_err();
        assert!(err.is_group_exists());
        assert_eq!(coordinator.cluster().get_group("foo"), Some(foo()));
    }

    #[tokio::test]
    async fn test_registered_stores_identity_and_reconciles() {
        let dir = TempDir::new().unwrap();
        let (coordinator, storage) = boot(&dir).await;
        let driver = Arc::new(MockSchedulerDriver::new());

        coordinator.registered(driver.clone(), "fw-1", &master()).await;

        assert_eq!(coordinator.cluster().framework_id(), "fw-1");
        let persisted = ClusterState::from_bytes(&storage.load().await.unwrap()).unwrap();
        assert_eq!(persisted.framework_id(), "fw-1");

        assert_eq!(driver.reconcile_count(), 1);
        assert!(driver.reconcile_calls()[0].is_empty());
    }

    #[tokio::test]
    async fn test_reregistered_retains_driver() {
        let dir = TempDir::new().unwrap();
        let (coordinator, _) = boot(&dir).await;

        let err = coordinator.reconcile_tasks(&["A".to_string()]).await.unwrap_err();
        assert!(matches!(err, Error::NotRegistered));

        let driver = Arc::new(MockSchedulerDriver::new());
        coordinator.reregistered(driver.clone(), &master()).await;
        assert_eq!(driver.reconcile_count(), 1);
        assert_eq!(coordinator.cluster().framework_id(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconcile_tasks_uses_retained_driver() {
        let dir = TempDir::new().unwrap();
        let (coordinator, _) = boot(&dir).await;
        let driver = Arc::new(MockSchedulerDriver::new());
        coordinator.registered(driver.clone(), "fw-1", &master()).await;

        tokio::time::advance(coordinator.reconciler().config().delay).await;
        coordinator
            .reconcile_tasks(&["A".to_string(), "B".to_string()])
            .await
            .unwrap();

        let calls = driver.reconcile_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].len(), 2);
    }

    #[tokio::test]
    async fn test_status_update_persists_and_confirms() {
        let dir = TempDir::new().unwrap();
        let (coordinator, storage) = boot(&dir).await;
        let driver = Arc::new(MockSchedulerDriver::new());
        coordinator.registered(driver.clone(), "fw-1", &master()).await;
        coordinator.add_group(foo()).await.unwrap();

        coordinator.reconcile_tasks(&["A".to_string()]).await.unwrap();
        assert_eq!(coordinator.reconciler().outstanding().await.len(), 1);

        std::fs::remove_file(dir.path().join("state.json")).unwrap();
        coordinator
            .status_update(driver.clone(), &TaskStatus::new("A", TaskState::Running))
            .await;

        assert!(coordinator.reconciler().outstanding().await.is_empty());
        let persisted = ClusterState::from_bytes(&storage.load().await.unwrap()).unwrap();
        assert_eq!(persisted.list_groups(), vec![foo()]);
    }

    #[tokio::test]
    async fn test_offers_always_persist() {
        let dir = TempDir::new().unwrap();
        let (coordinator, storage) = boot(&dir).await;
        assert!(storage.load().await.unwrap_err().is_uninitialized());

        coordinator
            .resource_offers(Arc::new(MockSchedulerDriver::new()), &[])
            .await;
        assert!(storage.load().await.is_ok());
    }

    #[tokio::test]
    async fn test_observability_events_do_not_mutate_state() {
        let dir = TempDir::new().unwrap();
        let (coordinator, storage) = boot(&dir).await;
        let driver: Arc<dyn SchedulerDriver> = Arc::new(MockSchedulerDriver::new());

        coordinator.disconnected(driver.clone()).await;
        coordinator.offer_rescinded(driver.clone(), "offer-1").await;
        coordinator
            .framework_message(driver.clone(), "exec", "agent", "hello")
            .await;
        coordinator.agent_lost(driver.clone(), "agent").await;
        coordinator
            .executor_lost(driver.clone(), "exec", "agent", 1)
            .await;
        coordinator.error(driver, "boom!").await;

        assert!(storage.load().await.unwrap_err().is_uninitialized());
        assert!(coordinator.list_groups().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_stops_driver() {
        let dir = TempDir::new().unwrap();
        let (coordinator, _) = boot(&dir).await;
        let driver = MockSchedulerDriver::new();

        coordinator.shutdown(&driver).await.unwrap();
        assert_eq!(driver.stop_count(), 1);

        driver.fail_stop("boom!");
        assert!(coordinator.shutdown(&driver).await.is_err());
    }
}
