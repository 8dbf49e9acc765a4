use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::traits::{StorageError, StorageResult};

/// Storage for uploaded resume files, addressed by file name
#[async_trait]
pub trait ResumeStore: Send + Sync {
    /// Write `bytes` under `name`, replacing any existing file
    async fn save(&self, name: &str, bytes: &[u8]) -> StorageResult<()>;

    /// Remove the file stored under `name`
    async fn remove(&self, name: &str) -> StorageResult<()>;
}

/// Resume files kept in a local upload directory
pub struct LocalResumeStore {
    root: PathBuf,
}

impl LocalResumeStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the upload directory if it does not exist
    pub async fn initialize(&self) -> StorageResult<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StorageError::Internal(format!("{}: {}", self.root.display(), e)))
    }

    fn path_for(&self, name: &str) -> StorageResult<PathBuf> {
        let file_name = Path::new(name)
            .file_name()
            .filter(|f| f.len() == name.len())
            .ok_or_else(|| StorageError::Internal(format!("invalid resume name: {name}")))?;
        Ok(self.root.join(file_name))
    }
}

#[async_trait]
impl ResumeStore for LocalResumeStore {
    async fn save(&self, name: &str, bytes: &[u8]) -> StorageResult<()> {
        let path = self.path_for(name)?;
        debug!("Writing resume {}", path.display());
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| StorageError::Internal(format!("{}: {}", path.display(), e)))
    }

    async fn remove(&self, name: &str) -> StorageResult<()> {
        let path = self.path_for(name)?;
        debug!("Removing resume {}", path.display());
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| StorageError::Internal(format!("{}: {}", path.display(), e)))
    }
}
