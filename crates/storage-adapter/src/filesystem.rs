//! Local file storage backend

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use common::error::{Error, Result};

use crate::Storage;

/// Stores the blob in a single local file
#[derive(Debug, Clone)]
pub struct FileStorage {
    /// Path of the state file
    path: PathBuf,
}

impl FileStorage {
    /// Creates a file storage for the given path. The file is not touched until the first save.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Gets the path of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn save(&self, contents: &[u8]) -> Result<()> {
        tokio::fs::write(&self.path, contents).await?;
        debug!("Saved {} bytes to {}", contents.len(), self.path.display());
        Ok(())
    }

    async fn load(&self) -> Result<Vec<u8>> {
        match tokio::fs::read(&self.path).await {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::StorageUninitialized),
            Err(e) => Err(e.into()),
        }
    }
}

impl fmt::Display for FileStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}
