//! Common data models for Group Orchestrator
//!
//! This module defines the persisted group model and the resource-manager
//! entities (offers, task statuses) that flow through the scheduler callbacks.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Deserializes `null` the same way as an absent field.
///
/// Persisted state written by earlier versions encodes empty lists as `null`.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Consumer group managed by the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Unique group identifier
    pub id: String,

    /// Subscription expressions
    #[serde(default, deserialize_with = "null_as_default")]
    pub subscriptions: Vec<String>,

    /// Bootstrap broker endpoints used to discover the cluster
    #[serde(
        rename = "bootstrap_brokers",
        default,
        deserialize_with = "null_as_default"
    )]
    pub bootstrap_endpoints: Vec<String>,

    /// Tasks assigned to the group
    #[serde(rename = "consumers", default, deserialize_with = "null_as_default")]
    pub tasks: Vec<Consumer>,
}

impl Group {
    /// Creates a group without tasks
    pub fn new(
        id: impl Into<String>,
        subscriptions: Vec<String>,
        bootstrap_endpoints: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            subscriptions,
            bootstrap_endpoints,
            tasks: Vec::new(),
        }
    }
}

/// Task belonging to a group. Only the identifier is tracked for now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumer {
    /// Task identifier
    pub id: String,
}

/// Location of the resource manager the framework is connected to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterInfo {
    /// Master hostname or address
    pub hostname: String,
    /// Master port
    pub port: u16,
}

impl fmt::Display for MasterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hostname, self.port)
    }
}

/// Task state as reported by the resource manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    #[serde(rename = "TASK_STAGING")]
    Staging,
    #[serde(rename = "TASK_STARTING")]
    Starting,
    #[serde(rename = "TASK_RUNNING")]
    Running,
    #[serde(rename = "TASK_KILLING")]
    Killing,
    #[serde(rename = "TASK_FINISHED")]
    Finished,
    #[serde(rename = "TASK_FAILED")]
    Failed,
    #[serde(rename = "TASK_KILLED")]
    Killed,
    #[serde(rename = "TASK_ERROR")]
    Error,
    #[serde(rename = "TASK_LOST")]
    Lost,
    #[serde(rename = "TASK_DROPPED")]
    Dropped,
    #[serde(rename = "TASK_UNREACHABLE")]
    Unreachable,
    #[serde(rename = "TASK_GONE")]
    Gone,
    #[serde(rename = "TASK_UNKNOWN", other)]
    Unknown,
}

impl TaskState {
    /// Wire name of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Staging => "TASK_STAGING",
            TaskState::Starting => "TASK_STARTING",
            TaskState::Running => "TASK_RUNNING",
            TaskState::Killing => "TASK_KILLING",
            TaskState::Finished => "TASK_FINISHED",
            TaskState::Failed => "TASK_FAILED",
            TaskState::Killed => "TASK_KILLED",
            TaskState::Error => "TASK_ERROR",
            TaskState::Lost => "TASK_LOST",
            TaskState::Dropped => "TASK_DROPPED",
            TaskState::Unreachable => "TASK_UNREACHABLE",
            TaskState::Gone => "TASK_GONE",
            TaskState::Unknown => "TASK_UNKNOWN",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task status reported by (or sent to) the resource manager
#[derive(Debug, Clone, PartialEq)]
pub struct TaskStatus {
    /// Task identifier
    pub task_id: String,
    /// Current task state
    pub state: TaskState,
    /// Agent running the task, if known
    pub agent_id: Option<String>,
    /// Reason code for non-running states
    pub reason: Option<String>,
    /// Free-form message
    pub message: Option<String>,
    /// Update uuid that must be acknowledged, if any
    pub uuid: Option<String>,
}

impl TaskStatus {
    /// Creates a status with only a task id and a state
    pub fn new(task_id: impl Into<String>, state: TaskState) -> Self {
        Self {
            task_id: task_id.into(),
            state,
            agent_id: None,
            reason: None,
            message: None,
            uuid: None,
        }
    }

    /// Provisional status used to ask the resource manager for the real one
    pub fn staging(task_id: impl Into<String>) -> Self {
        Self::new(task_id, TaskState::Staging)
    }
}

/// Resource offered by an agent
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    /// Resource name (cpus, mem, ports, ...)
    pub name: String,
    /// Scalar value, if the resource is scalar
    pub scalar: Option<f64>,
    /// Inclusive ranges, if the resource is a range set
    pub ranges: Vec<(u64, u64)>,
}

/// Agent attribute attached to an offer
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Attribute name
    pub name: String,
    /// Text value
    pub text: Option<String>,
    /// Scalar value
    pub scalar: Option<f64>,
}

/// Resource offer delivered by the resource manager
#[derive(Debug, Clone, PartialEq)]
pub struct Offer {
    /// Offer identifier
    pub id: String,
    /// Agent the resources belong to
    pub agent_id: String,
    /// Agent hostname
    pub hostname: String,
    /// Offered resources
    pub resources: Vec<Resource>,
    /// Agent attributes
    pub attributes: Vec<Attribute>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_wire_field_names() {
        let group = Group::new("foo", vec!["bar".into()], vec!["localhost:9092".into()]);
        let json = serde_json::to_string(&group).unwrap();
        assert_eq!(
            json,
            r#"{"id":"foo","subscriptions":["bar"],"bootstrap_brokers":["localhost:9092"],"consumers":[]}"#
        );
    }

    #[test]
    fn test_group_accepts_null_lists() {
        let group: Group = serde_json::from_str(
            r#"{"id":"foo","subscriptions":null,"bootstrap_brokers":["b:9092"],"consumers":null}"#,
        )
        .unwrap();
        assert_eq!(group.id, "foo");
        assert!(group.subscriptions.is_empty());
        assert!(group.tasks.is_empty());

        let group: Group = serde_json::from_str(r#"{"id":"bar"}"#).unwrap();
        assert!(group.bootstrap_endpoints.is_empty());
    }

    #[test]
    fn test_task_state_wire_names() {
        let state: TaskState = serde_json::from_str(r#""TASK_RUNNING""#).unwrap();
        assert_eq!(state, TaskState::Running);
        let state: TaskState = serde_json::from_str(r#""TASK_SOMETHING_NEW""#).unwrap();
        assert_eq!(state, TaskState::Unknown);
        assert_eq!(TaskState::Staging.to_string(), "TASK_STAGING");
    }
}
