//! Task reconciliation
//!
//! After a (re)registration or on an explicit request the reconciler asks the
//! resource manager for the authoritative status of tasks. Attempts are rate
//! limited by a cooldown window. Tasks that stay unconfirmed for more than
//! `max_tries` attempts are killed.

use std::collections::HashSet;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use common::error::{Error, Result};
use common::models::TaskStatus;
use resource_manager::SchedulerDriver;

/// Reconciliation tuning
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Minimum time between two attempts
    pub delay: Duration,

    /// Attempts allowed before unconfirmed tasks are killed
    pub max_tries: u32,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(10),
            max_tries: 3,
        }
    }
}

#[derive(Debug, Default)]
struct ReconcileState {
    /// Tasks whose status is not confirmed yet
    outstanding: HashSet<String>,

    /// Start of the last attempt
    last_attempt: Option<Instant>,

    /// Attempts since the outstanding set was last empty
    attempts: u32,
}

/// Reconciles task state with the resource manager
#[derive(Debug)]
pub struct Reconciler {
    config: ReconcilerConfig,
    state: Mutex<ReconcileState>,
}

impl Reconciler {
    pub fn new(config: ReconcilerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(ReconcileState::default()),
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Asks the resource manager for the status of every task it knows about
    pub async fn implicit_reconcile(&self, driver: &dyn SchedulerDriver) -> Result<()> {
        let mut state = self.state.lock().await;
        self.reconcile(&mut state, driver, true).await
    }

    /// Adds `task_ids` to the outstanding set and asks for the status of every
    /// outstanding task
    pub async fn explicit_reconcile(
        &self,
        task_ids: &[String],
        driver: &dyn SchedulerDriver,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        state.outstanding.extend(task_ids.iter().cloned());
        self.reconcile(&mut state, driver, false).await
    }

    /// Marks the task of a status report as confirmed
    pub async fn update(&self, status: &TaskStatus) {
        let mut state = self.state.lock().await;
        state.outstanding.remove(&status.task_id);

        if state.outstanding.is_empty() {
            state.attempts = 0;
        }
    }

    /// Outstanding task ids
    pub async fn outstanding(&self) -> HashSet<String> {
        self.state.lock().await.outstanding.clone()
    }

    /// Attempts made since the outstanding set was last empty
    pub async fn attempts(&self) -> u32 {
        self.state.lock().await.attempts
    }

    async fn reconcile(
        &self,
        state: &mut ReconcileState,
        driver: &dyn SchedulerDriver,
        implicit: bool,
    ) -> Result<()> {
        let now = Instant::now();
        if let Some(last) = state.last_attempt {
            if now.duration_since(last) < self.config.delay {
                debug!("Reconciliation attempted {:?} ago, skipping", now - last);
                return Ok(());
            }
        }

        state.attempts += 1;
        state.last_attempt = Some(now);

        if state.attempts > self.config.max_tries {
            for task_id in &state.outstanding {
                info!(
                    "Reconciling exceeded {} tries, killing task {}",
                    self.config.max_tries, task_id
                );
                driver
                    .kill_task(task_id)
                    .await
                    .map_err(|e| Error::Termination {
                        task_id: task_id.clone(),
                        source: Box::new(e),
                    })?;
            }
            state.attempts = 0;
            return Ok(());
        }

        let statuses = if implicit {
            Vec::new()
        } else {
            state
                .outstanding
                .iter()
                .map(|task_id| {
                    debug!(
                        "Reconciling {}/{} task state for task {}",
                        state.attempts, self.config.max_tries, task_id
                    );
                    TaskStatus::staging(task_id.clone())
                })
                .collect()
        };

        driver
            .reconcile_tasks(statuses)
            .await
            .map_err(|e| Error::Reconciliation(Box::new(e)))
    }
}
