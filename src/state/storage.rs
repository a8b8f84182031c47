//! Key-value backends the guess store persists through.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::StoreError;

/// Durable (or not) home for JSON blobs under fixed string keys.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Store `value` and hand back what was stored.
    async fn save(&mut self, key: &str, value: Value) -> Result<Value, StoreError>;
}

/// Lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: HashMap<String, Value>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn load(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    async fn save(&mut self, key: &str, value: Value) -> Result<Value, StoreError> {
        self.entries.insert(key.to_string(), value.clone());
        Ok(value)
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;
        if fs::metadata(&dir).await?.permissions().readonly() {
            return Err(StoreError::Storage(format!(
                "{} is read-only",
                dir.display()
            )));
        }
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl StorageBackend for FileBackend {
    async fn load(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let contents = match fs::read_to_string(self.path(key)).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&contents)?))
    }

    async fn save(&mut self, key: &str, value: Value) -> Result<Value, StoreError> {
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&value)?).await?;
        fs::rename(&tmp, &path).await?;
        debug!(path = %path.display(), "Saved");
        Ok(value)
    }
}

/// File backend at `dir`, or memory if the directory cannot be used.
pub async fn open_or_memory(dir: impl AsRef<Path>) -> Box<dyn StorageBackend> {
    let dir = dir.as_ref();
    match FileBackend::open(dir).await {
        Ok(backend) => Box::new(backend),
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Storage unavailable, keeping guesses in memory");
            Box::new(MemoryBackend::new())
        }
    }
}
