//! ZooKeeper storage backend
//!
//! The location `host:port/chroot/path` is split into the connection target and
//! the node path holding the blob. Construction ensures every ancestor of the
//! node exists. Each operation opens its own session and drops it afterwards;
//! the whole session (connect plus request) is bounded by the configured timeout.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};
use zookeeper_client as zk;

use common::error::{Error, Result};
use common::utils::execute_with_timeout;

use crate::Storage;

/// Failure reported by a coordination session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ZkError {
    /// The node already exists
    #[error("node already exists")]
    NodeExists,

    /// The node (or its parent) does not exist
    #[error("node does not exist")]
    NoNode,

    /// The expected version did not match
    #[error("bad version")]
    BadVersion,

    /// Any other failure
    #[error("{0}")]
    Other(String),
}

impl From<zk::Error> for ZkError {
    fn from(err: zk::Error) -> Self {
        match err {
            zk::Error::NodeExists => ZkError::NodeExists,
            zk::Error::NoNode => ZkError::NoNode,
            zk::Error::BadVersion => ZkError::BadVersion,
            other => ZkError::Other(other.to_string()),
        }
    }
}

/// Opens coordination sessions
#[async_trait]
pub trait ZkConnector: Send + Sync {
    /// Connects to the given `host:port` list
    async fn connect(&self, address: &str) -> std::result::Result<Box<dyn ZkSession>, ZkError>;
}

/// The node operations used by [`ZkStorage`]
#[async_trait]
pub trait ZkSession: Send + Sync {
    /// Creates an empty persistent node
    async fn create(&self, path: &str) -> std::result::Result<(), ZkError>;

    /// Reads a node's data and version
    async fn get_data(&self, path: &str) -> std::result::Result<(Vec<u8>, i32), ZkError>;

    /// Writes a node's data if its version still matches
    async fn set_data(&self, path: &str, data: &[u8], version: i32)
        -> std::result::Result<(), ZkError>;
}

/// Connector backed by `zookeeper-client`
#[derive(Debug, Clone, Copy, Default)]
pub struct ZkClientConnector;

#[async_trait]
impl ZkConnector for ZkClientConnector {
    async fn connect(&self, address: &str) -> std::result::Result<Box<dyn ZkSession>, ZkError> {
        let client = zk::Client::connect(address).await?;
        Ok(Box::new(ZkClientSession { client }))
    }
}

struct ZkClientSession {
    client: zk::Client,
}

#[async_trait]
impl ZkSession for ZkClientSession {
    async fn create(&self, path: &str) -> std::result::Result<(), ZkError> {
        let options = zk::CreateMode::Persistent.with_acls(zk::Acls::anyone_all());
        self.client.create(path, &[], &options).await?;
        Ok(())
    }

    async fn get_data(&self, path: &str) -> std::result::Result<(Vec<u8>, i32), ZkError> {
        let (data, stat) = self.client.get_data(path).await?;
        Ok((data, stat.version))
    }

    async fn set_data(
        &self,
        path: &str,
        data: &[u8],
        version: i32,
    ) -> std::result::Result<(), ZkError> {
        self.client.set_data(path, data, Some(version)).await?;
        Ok(())
    }
}

/// Stores the blob in a single ZooKeeper node
pub struct ZkStorage {
    /// Connection target, e.g. `localhost:2181`
    connect: String,

    /// Node path, `/` when no chroot was given
    path: String,

    /// Session factory
    connector: Arc<dyn ZkConnector>,

    /// Bound for each session
    timeout: Duration,
}

impl ZkStorage {
    /// Creates the storage and ensures the chroot path exists
    pub async fn connect(
        location: &str,
        connector: Arc<dyn ZkConnector>,
        timeout: Duration,
    ) -> Result<Self> {
        let (connect, path) = split_location(location)?;

        let storage = Self {
            connect,
            path,
            connector,
            timeout,
        };

        storage.create_chroot_if_required().await?;

        Ok(storage)
    }

    /// Gets the node path
    pub fn path(&self) -> &str {
        &self.path
    }

    async fn session(&self) -> Result<Box<dyn ZkSession>> {
        self.connector
            .connect(&self.connect)
            .await
            .map_err(|e| Error::Coordination(format!("connect to {}: {}", self.connect, e)))
    }

    async fn create_chroot_if_required(&self) -> Result<()> {
        if self.path == "/" {
            return Ok(());
        }

        execute_with_timeout(
            async {
                let session = self.session().await?;
                ensure_path(session.as_ref(), &self.path).await
            },
            self.timeout,
            "zk ensure chroot",
        )
        .await?;

        info!("ZooKeeper chroot {} is ready on {}", self.path, self.connect);

        Ok(())
    }
}

#[async_trait]
impl Storage for ZkStorage {
    async fn save(&self, contents: &[u8]) -> Result<()> {
        execute_with_timeout(
            async {
                let session = self.session().await?;
                let (_, version) = session
                    .get_data(&self.path)
                    .await
                    .map_err(|e| node_error(&self.path, e))?;

                session
                    .set_data(&self.path, contents, version)
                    .await
                    .map_err(|e| node_error(&self.path, e))?;

                debug!("Saved {} bytes to {} (version {})", contents.len(), self, version);
                Ok(())
            },
            self.timeout,
            "zk save",
        )
        .await
    }

    async fn load(&self) -> Result<Vec<u8>> {
        execute_with_timeout(
            async {
                let session = self.session().await?;
                match session.get_data(&self.path).await {
                    Ok((data, _)) if data.is_empty() => Err(Error::StorageUninitialized),
                    Ok((data, _)) => Ok(data),
                    Err(ZkError::NoNode) => Err(Error::StorageUninitialized),
                    Err(e) => Err(node_error(&self.path, e)),
                }
            },
            self.timeout,
            "zk load",
        )
        .await
    }
}

impl fmt::Display for ZkStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.connect, self.path)
    }
}

/// Splits `host:port[/chroot]` into the connection target and the node path
fn split_location(location: &str) -> Result<(String, String)> {
    let (connect, path) = match location.find('/') {
        Some(idx) => (&location[..idx], &location[idx..]),
        None => (location, "/"),
    };

    if connect.is_empty() {
        return Err(Error::Config(format!(
            "missing ZooKeeper address in '{}'",
            location
        )));
    }

    let path = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };

    if path != "/" && path[1..].split('/').any(str::is_empty) {
        return Err(Error::EmptyChrootPath);
    }

    Ok((connect.to_string(), path.to_string()))
}

/// Creates `path` and any missing ancestors. Nodes created concurrently by
/// another instance are accepted.
async fn ensure_path(session: &dyn ZkSession, path: &str) -> Result<()> {
    match session.create(path).await {
        Ok(()) | Err(ZkError::NodeExists) => return Ok(()),
        Err(ZkError::NoNode) => {}
        Err(e) => return Err(node_error(path, e)),
    }

    let mut current = String::with_capacity(path.len());
    for segment in path[1..].split('/') {
        current.push('/');
        current.push_str(segment);

        match session.create(&current).await {
            Ok(()) => debug!("Created znode {}", current),
            Err(ZkError::NodeExists) => {}
            Err(e) => return Err(node_error(&current, e)),
        }
    }

    Ok(())
}

fn node_error(path: &str, err: ZkError) -> Error {
    match err {
        ZkError::BadVersion => Error::Conflict(path.to_string()),
        other => Error::Coordination(format!("{}: {}", path, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::{BTreeMap, HashSet};
    use std::sync::atomic::{AtomicBool, Ordering};

    /// In-memory stand-in for a ZooKeeper ensemble
    struct MemoryZk {
        nodes: Mutex<BTreeMap<String, (Vec<u8>, i32)>>,
        /// Paths another instance creates right before we do
        racing: Mutex<HashSet<String>>,
        /// Simulates a concurrent writer between read and write
        bump_after_read: AtomicBool,
    }

    impl MemoryZk {
        fn new() -> Arc<Self> {
            let mut nodes = BTreeMap::new();
            nodes.insert("/".to_string(), (Vec::new(), 0));
            Arc::new(Self {
                nodes: Mutex::new(nodes),
                racing: Mutex::new(HashSet::new()),
                bump_after_read: AtomicBool::new(false),
            })
        }

        fn insert(&self, path: &str) {
            self.nodes.lock().insert(path.to_string(), (Vec::new(), 0));
        }

        fn exists(&self, path: &str) -> bool {
            self.nodes.lock().contains_key(path)
        }
    }

    fn parent(path: &str) -> String {
        match path.rfind('/') {
            Some(0) | None => "/".to_string(),
            Some(idx) => path[..idx].to_string(),
        }
    }

    struct MemoryConnector(Arc<MemoryZk>);

    #[async_trait]
    impl ZkConnector for MemoryConnector {
        async fn connect(
            &self,
            _address: &str,
        ) -> std::result::Result<Box<dyn ZkSession>, ZkError> {
            Ok(Box::new(MemorySession(self.0.clone())))
        }
    }

    struct MemorySession(Arc<MemoryZk>);

    #[async_trait]
    impl ZkSession for MemorySession {
        async fn create(&self, path: &str) -> std::result::Result<(), ZkError> {
            let mut nodes = self.0.nodes.lock();
            if nodes.contains_key(path) {
                return Err(ZkError::NodeExists);
            }
            if !nodes.contains_key(&parent(path)) {
                return Err(ZkError::NoNode);
            }
            nodes.insert(path.to_string(), (Vec::new(), 0));
            if self.0.racing.lock().remove(path) {
                return Err(ZkError::NodeExists);
            }
            Ok(())
        }

        async fn get_data(&self, path: &str) -> std::result::Result<(Vec<u8>, i32), ZkError> {
            let mut nodes = self.0.nodes.lock();
            let node = nodes.get_mut(path).ok_or(ZkError::NoNode)?;
            let read = node.clone();
            if self.0.bump_after_read.load(Ordering::SeqCst) {
                node.1 += 1;
            }
            Ok(read)
        }

        async fn set_data(
            &self,
            path: &str,
            data: &[u8],
            version: i32,
        ) -> std::result::Result<(), ZkError> {
            let mut nodes = self.0.nodes.lock();
            let node = nodes.get_mut(path).ok_or(ZkError::NoNode)?;
            if node.1 != version {
                return Err(ZkError::BadVersion);
            }
            *node = (data.to_vec(), version + 1);
            Ok(())
        }
    }

    struct HangingConnector;

    #[async_trait]
    impl ZkConnector for HangingConnector {
        async fn connect(
            &self,
            _address: &str,
        ) -> std::result::Result<Box<dyn ZkSession>, ZkError> {
            std::future::pending().await
        }
    }

    async fn open(zk: &Arc<MemoryZk>, location: &str) -> Result<ZkStorage> {
        ZkStorage::connect(
            location,
            Arc::new(MemoryConnector(zk.clone())),
            Duration::from_secs(30),
        )
        .await
    }

    #[tokio::test]
    async fn test_zk_storage() {
        let zk = MemoryZk::new();
        let storage = open(&zk, "localhost:2181/tmp/zk/storage").await.unwrap();

        assert!(zk.exists("/tmp"));
        assert!(zk.exists("/tmp/zk"));
        assert!(zk.exists("/tmp/zk/storage"));
        assert_eq!(storage.to_string(), "localhost:2181/tmp/zk/storage");

        assert!(matches!(storage.load().await, Err(Error::StorageUninitialized)));

        storage.save(b"hello world").await.unwrap();
        assert_eq!(storage.load().await.unwrap(), b"hello world");

        storage.save(b"hello again").await.unwrap();
        assert_eq!(storage.load().await.unwrap(), b"hello again");
    }

    #[tokio::test]
    async fn test_existing_and_racing_ancestors() {
        let zk = MemoryZk::new();
        zk.insert("/tmp");
        zk.racing.lock().insert("/tmp/zk".to_string());

        let storage = open(&zk, "localhost:2181/tmp/zk/storage").await.unwrap();
        assert!(zk.exists("/tmp/zk/storage"));
        assert_eq!(storage.path(), "/tmp/zk/storage");

        // A second instance on the same chroot is not an error either
        open(&zk, "localhost:2181/tmp/zk/storage").await.unwrap();
    }

    #[tokio::test]
    async fn test_root_path() {
        let zk = MemoryZk::new();
        let storage = open(&zk, "localhost:2181").await.unwrap();
        assert_eq!(storage.path(), "/");
        assert_eq!(storage.to_string(), "localhost:2181/");

        let storage = open(&zk, "localhost:2181/gonsumer/").await.unwrap();
        assert_eq!(storage.path(), "/gonsumer");
    }

    #[tokio::test]
    async fn test_empty_chroot_segment() {
        let zk = MemoryZk::new();
        let err = open(&zk, "localhost:2181/tmp//storage").await.err().unwrap();
        assert!(matches!(err, Error::EmptyChrootPath));

        let err = open(&zk, "/tmp/storage").await.err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_version_conflict() {
        let zk = MemoryZk::new();
        let storage = open(&zk, "localhost:2181/state").await.unwrap();

        zk.bump_after_read.store(true, Ordering::SeqCst);
        let err = storage.save(b"stale").await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_is_bounded() {
        let err = ZkStorage::connect(
            "localhost:2181/state",
            Arc::new(HangingConnector),
            Duration::from_secs(5),
        )
        .await
        .err()
        .unwrap();
        assert!(err.is_timeout());
    }
}
