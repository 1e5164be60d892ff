use anyhow::{Result, bail};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Flat key/value file storage addressed by stored filename.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Writes `data` under `name`, failing if the name is already taken.
    async fn write_new(&self, name: &str, data: &[u8]) -> Result<()>;
    async fn read_file(&self, name: &str) -> Result<Option<Vec<u8>>>;
    /// Returns `false` when there was nothing to delete.
    async fn delete_file(&self, name: &str) -> Result<bool>;
    async fn file_exists(&self, name: &str) -> Result<bool>;
}

/// Stores every image directly inside a single directory.
pub struct LocalStorageService {
    root: PathBuf,
}

impl LocalStorageService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains('/')
            || name.contains('\\')
            || name.contains('\0')
        {
            bail!("refusing to address storage with unsafe name {:?}", name);
        }
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl StorageService for LocalStorageService {
    async fn write_new(&self, name: &str, data: &[u8]) -> Result<()> {
        let path = self.path_for(name)?;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        let written = async {
            file.write_all(data).await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            drop(file);
            if let Err(cleanup) = fs::remove_file(&path).await {
                tracing::warn!(
                    "Failed to remove partially written file {}: {}",
                    path.display(),
                    cleanup
                );
            }
            return Err(e.into());
        }

        Ok(())
    }

    async fn read_file(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(name)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_file(&self, name: &str) -> Result<bool> {
        let path = self.path_for(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn file_exists(&self, name: &str) -> Result<bool> {
        let path = self.path_for(name)?;
        Ok(fs::try_exists(&path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_new_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorageService::new(dir.path());

        storage.write_new("cat.png", b"first").await.unwrap();
        assert!(storage.write_new("cat.png", b"second").await.is_err());

        let data = storage.read_file("cat.png").await.unwrap().unwrap();
        assert_eq!(data, b"first");
    }

    #[tokio::test]
    async fn test_delete_missing_file_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorageService::new(dir.path());

        storage.write_new("dog.gif", b"gif").await.unwrap();
        assert!(storage.delete_file("dog.gif").await.unwrap());
        assert!(!storage.delete_file("dog.gif").await.unwrap());
        assert!(!storage.file_exists("dog.gif").await.unwrap());
        assert!(storage.read_file("dog.gif").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejects_path_components() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorageService::new(dir.path());

        assert!(storage.write_new("../escape.png", b"x").await.is_err());
        assert!(storage.file_exists("a\\b.png").await.is_err());
        assert!(storage.delete_file("..").await.is_err());
    }
}
