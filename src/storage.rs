use async_trait::async_trait;
use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("duplicate")]
    Duplicate,
    #[error("not_found")]
    NotFound,
    #[error("other: {0}")]
    Other(String),
}

/// Content-addressed blob store for uploads (avatars, chat attachments).
/// Keys are sha-256 hex digests; the MIME type is re-sniffed on load.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn save(&self, hash: &str, mime: &str, bytes: &[u8]) -> Result<(), FileStoreError>;
    async fn load(&self, hash: &str) -> Result<(Vec<u8>, String), FileStoreError>;
    async fn delete(&self, hash: &str) -> Result<(), FileStoreError>;
}

/// Local-disk implementation. Blobs land under `<root>/<hh>/<hash>` where
/// `hh` is the first two hex chars, keeping directories from growing
/// unbounded.
pub struct FsFileStore {
    root: PathBuf,
}

impl FsFileStore {
    pub fn new() -> Self {
        let root = std::env::var("STARTIVES_UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/uploads"));
        Self { root }
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, hash: &str) -> PathBuf {
        let mut p = self.root.clone();
        p.push(&hash[0..2]);
        p.push(hash);
        p
    }
}

impl Default for FsFileStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileStore for FsFileStore {
    async fn save(&self, hash: &str, _mime: &str, bytes: &[u8]) -> Result<(), FileStoreError> {
        if hash.len() < 2 {
            return Err(FileStoreError::Other("hash too short".into()));
        }
        let path = self.path_for(hash);
        if path.exists() {
            return Err(FileStoreError::Duplicate);
        }
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| FileStoreError::Other(e.to_string()))?;
        }
        std::fs::write(&path, bytes).map_err(|e| {
            error!("write failed for '{}': {e}", path.display());
            FileStoreError::Other(e.to_string())
        })
    }

    async fn load(&self, hash: &str) -> Result<(Vec<u8>, String), FileStoreError> {
        if hash.len() < 2 || hash.contains(['/', '\\', '.']) {
            return Err(FileStoreError::NotFound);
        }
        let path = self.path_for(hash);
        let bytes = std::fs::read(&path).map_err(|_| FileStoreError::NotFound)?;
        let mime = infer::get(&bytes)
            .map(|t| t.mime_type().to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        Ok((bytes, mime))
    }

    async fn delete(&self, hash: &str) -> Result<(), FileStoreError> {
        if hash.len() < 2 {
            return Ok(());
        }
        // best-effort: treat missing files as already deleted
        let _ = std::fs::remove_file(self.path_for(hash));
        Ok(())
    }
}

/// Factory used by `main`.
pub fn build_file_store() -> Arc<dyn FileStore> {
    let store = FsFileStore::new();
    info!("file store rooted at '{}'", store.root.display());
    Arc::new(store)
}
