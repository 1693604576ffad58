//! Durable cluster state storage for Group Orchestrator
//!
//! A storage backend persists one opaque byte blob. Backends are selected from a
//! `scheme:location` connection string:
//!
//! - `file:<path>` stores the blob in a local file
//! - `zk:<host:port>[/chroot/path]` stores it in a ZooKeeper node

pub mod filesystem;
pub mod zookeeper;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use common::error::{Error, Result};

// Re-export commonly used types
pub use filesystem::FileStorage;
pub use zookeeper::{ZkClientConnector, ZkConnector, ZkError, ZkSession, ZkStorage};

/// Byte-blob persistence
#[async_trait]
pub trait Storage: Send + Sync + fmt::Display {
    /// Replaces the stored blob
    async fn save(&self, contents: &[u8]) -> Result<()>;

    /// Reads the stored blob. Fails with [`Error::StorageUninitialized`] if
    /// nothing was ever saved.
    async fn load(&self) -> Result<Vec<u8>>;
}

/// Options shared by the storage backends
#[derive(Debug, Clone)]
pub struct StorageOptions {
    /// Upper bound for each coordination service session
    pub session_timeout: Duration,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            session_timeout: Duration::from_secs(30),
        }
    }
}

/// Creates the backend named by a `scheme:location` connection string
pub async fn new_storage(connection: &str, options: StorageOptions) -> Result<Arc<dyn Storage>> {
    let (scheme, location) = connection
        .split_once(':')
        .ok_or_else(|| Error::UnsupportedStorage(connection.to_string()))?;

    let storage: Arc<dyn Storage> = match scheme {
        "file" => Arc::new(FileStorage::new(location)),
        "zk" => Arc::new(
            ZkStorage::connect(
                location,
                Arc::new(ZkClientConnector),
                options.session_timeout,
            )
            .await?,
        ),
        other => return Err(Error::UnsupportedStorage(other.to_string())),
    };

    info!("Using {} storage at {}", scheme, storage);

    Ok(storage)
}
