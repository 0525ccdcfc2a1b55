use std::path::{Path, PathBuf};

use anyhow::Context;
use axum::async_trait;
use bytes::Bytes;

/// Storage seam for uploaded image files. Filenames are server-generated
/// opaque names, never client input.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn save(&self, name: &str, body: Bytes) -> anyhow::Result<()>;
    async fn remove(&self, name: &str) -> anyhow::Result<()>;
    async fn read(&self, name: &str) -> anyhow::Result<Bytes>;
}

/// Local-filesystem store rooted at the configured upload directory.
#[derive(Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

#[async_trait]
impl ImageStore for DiskStore {
    async fn save(&self, name: &str, body: Bytes) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("create upload dir {}", self.root.display()))?;
        let path = self.path_for(name);
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    async fn remove(&self, name: &str) -> anyhow::Result<()> {
        let path = self.path_for(name);
        tokio::fs::remove_file(&path)
            .await
            .with_context(|| format!("remove {}", path.display()))?;
        Ok(())
    }

    async fn read(&self, name: &str) -> anyhow::Result<Bytes> {
        let path = self.path_for(name);
        let data = tokio::fs::read(&path)
            .await
            .with_context(|| format!("read {}", path.display()))?;
        Ok(Bytes::from(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_read_remove_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path());

        store
            .save("abc.jpg", Bytes::from_static(b"jpeg-bytes"))
            .await
            .unwrap();
        let data = store.read("abc.jpg").await.unwrap();
        assert_eq!(&data[..], b"jpeg-bytes");

        store.remove("abc.jpg").await.unwrap();
        assert!(store.read("abc.jpg").await.is_err());
    }

    #[tokio::test]
    async fn save_creates_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("images/nested");
        let store = DiskStore::new(&nested);

        store
            .save("x.png", Bytes::from_static(b"png"))
            .await
            .unwrap();
        assert!(nested.join("x.png").exists());
    }

    #[tokio::test]
    async fn remove_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path());
        assert!(store.remove("nope.gif").await.is_err());
    }
}
