//! Cluster state store
//!
//! The framework identity and the group table live behind one lock. Every
//! accessor takes the lock for the duration of the call only and hands out
//! copies, so callers never need their own synchronization.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use common::error::Result;
use common::models::{null_as_default, Group};

#[derive(Debug, Default)]
struct Inner {
    /// Identity assigned by the resource manager, empty until registered
    framework_id: String,

    /// Groups keyed by their id
    groups: HashMap<String, Group>,
}

/// Persisted form of the cluster state
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    framework_id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    groups: Vec<Group>,
}

/// Shared cluster state
#[derive(Debug, Default)]
pub struct ClusterState {
    inner: Mutex<Inner>,
}

impl ClusterState {
    /// Creates an empty, unregistered state
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a persisted state
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let state = Self::new();
        state.load_bytes(bytes)?;
        Ok(state)
    }

    /// Sets the framework identity
    pub fn set_framework_id(&self, id: impl Into<String>) {
        self.inner.lock().framework_id = id.into();
    }

    /// Framework identity; empty means unregistered
    pub fn framework_id(&self) -> String {
        self.inner.lock().framework_id.clone()
    }

    /// Inserts or replaces a group
    pub fn add_group(&self, group: Group) {
        self.inner.lock().groups.insert(group.id.clone(), group);
    }

    /// Inserts a group unless one with the same id exists.
    ///
    /// Returns false, leaving the existing entry untouched, on a duplicate.
    pub fn insert_group_if_absent(&self, group: Group) -> bool {
        let mut inner = self.inner.lock();
        if inner.groups.contains_key(&group.id) {
            return false;
        }
        inner.groups.insert(group.id.clone(), group);
        true
    }

    pub fn get_group(&self, id: &str) -> Option<Group> {
        self.inner.lock().groups.get(id).cloned()
    }

    pub fn exists_group(&self, id: &str) -> bool {
        self.inner.lock().groups.contains_key(id)
    }

    /// Copies of all groups, in no particular order
    pub fn list_groups(&self) -> Vec<Group> {
        self.inner.lock().groups.values().cloned().collect()
    }

    /// Encodes the state as one consistent snapshot
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let inner = self.inner.lock();
        let snapshot = Snapshot {
            framework_id: inner.framework_id.clone(),
            groups: inner.groups.values().cloned().collect(),
        };
        Ok(serde_json::to_vec(&snapshot)?)
    }

    /// Replaces the whole state with a decoded snapshot.
    ///
    /// Nothing changes if the bytes cannot be decoded.
    pub fn load_bytes(&self, bytes: &[u8]) -> Result<()> {
        let snapshot: Snapshot = serde_json::from_slice(bytes)?;
        let groups = snapshot
            .groups
            .into_iter()
            .map(|group| (group.id.clone(), group))
            .collect();

        let mut inner = self.inner.lock();
        inner.framework_id = snapshot.framework_id;
        inner.groups = groups;
        Ok(())
    }
}
