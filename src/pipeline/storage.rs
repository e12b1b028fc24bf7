use std::future::Future;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid artifact name: {0}")]
    InvalidName(String),

    #[error("storage error: {0}")]
    Other(String),
}

/// Destination for generated artifacts, keyed by file name.
pub trait ArtifactStore {
    fn put(
        &self,
        name: &str,
        content: Vec<u8>,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
    fn get(&self, name: &str) -> impl Future<Output = Result<Option<Vec<u8>>, StorageError>> + Send;
}

pub(super) fn check_name(name: &str) -> Result<(), StorageError> {
    let path = Path::new(name);
    if name.trim().is_empty()
        || path.is_absolute()
        || path
            .components()
            .any(|c| !matches!(c, std::path::Component::Normal(_)))
    {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Writes artifacts under a target directory, creating it on demand.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl ArtifactStore for FileStore {
    async fn put(&self, name: &str, content: Vec<u8>) -> Result<(), StorageError> {
        check_name(name)?;
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.path_of(name);
        tokio::fs::write(&path, content).await?;
        log::debug!("Wrote {}", path.display());
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        check_name(name)?;
        match tokio::fs::read(self.path_of(name)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_store_creates_target_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("uploads").join("config"));
        store.put("clash.yaml", b"proxies: []".to_vec()).await.unwrap();

        let content = std::fs::read_to_string(store.path_of("clash.yaml")).unwrap();
        assert_eq!(content, "proxies: []");
        assert_eq!(
            store.get("clash.yaml").await.unwrap(),
            Some(b"proxies: []".to_vec())
        );
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rejects_escaping_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("out"));
        assert!(matches!(
            store.put("../clash.yaml", vec![]).await,
            Err(StorageError::InvalidName(_))
        ));
        assert!(store.put("", vec![]).await.is_err());
        assert!(store.put("/etc/xr", vec![]).await.is_err());
        assert!(!dir.path().join("clash.yaml").exists());
    }
}
