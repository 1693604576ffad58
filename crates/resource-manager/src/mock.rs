//! In-memory scheduler driver recording every call

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use common::error::{Error, Result};
use common::models::TaskStatus;

use crate::driver::SchedulerDriver;

/// Scheduler driver that records calls and can be told to fail them
#[derive(Debug, Default)]
pub struct MockSchedulerDriver {
    reconciles: Mutex<Vec<Vec<TaskStatus>>>,
    kills: Mutex<Vec<String>>,
    stops: AtomicUsize,
    reconcile_error: Mutex<Option<String>>,
    kill_error: Mutex<Option<String>>,
    stop_error: Mutex<Option<String>>,
}

impl MockSchedulerDriver {
    /// Creates a driver on which every call succeeds
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following reconcile call fail with the given message
    pub fn fail_reconcile(&self, message: &str) {
        *self.reconcile_error.lock() = Some(message.to_string());
    }

    /// Makes every following kill call fail with the given message
    pub fn fail_kill(&self, message: &str) {
        *self.kill_error.lock() = Some(message.to_string());
    }

    /// Makes every following stop call fail with the given message
    pub fn fail_stop(&self, message: &str) {
        *self.stop_error.lock() = Some(message.to_string());
    }

    /// Status lists of all reconcile calls, in order
    pub fn reconcile_calls(&self) -> Vec<Vec<TaskStatus>> {
        self.reconciles.lock().clone()
    }

    /// Number of reconcile calls
    pub fn reconcile_count(&self) -> usize {
        self.reconciles.lock().len()
    }

    /// Task ids of all kill calls, in order
    pub fn killed_tasks(&self) -> Vec<String> {
        self.kills.lock().clone()
    }

    /// Number of stop calls
    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SchedulerDriver for MockSchedulerDriver {
    async fn reconcile_tasks(&self, statuses: Vec<TaskStatus>) -> Result<()> {
        self.reconciles.lock().push(statuses);
        match self.reconcile_error.lock().clone() {
            Some(message) => Err(Error::Driver(message)),
            None => Ok(()),
        }
    }

    async fn kill_task(&self, task_id: &str) -> Result<()> {
        self.kills.lock().push(task_id.to_string());
        match self.kill_error.lock().clone() {
            Some(message) => Err(Error::Driver(message)),
            None => Ok(()),
        }
    }

    async fn stop(&self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        match self.stop_error.lock().clone() {
            Some(message) => Err(Error::Driver(message)),
            None => Ok(()),
        }
    }
}
