use std::io::ErrorKind;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, error, warn};

use crate::models::error::PersistenceError;
use crate::models::location::LocationRecord;

/// Key-value store of opaque blobs backing the persisted collections.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError>;
    async fn put(&self, key: &str, blob: Vec<u8>) -> Result<(), PersistenceError>;
}

#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<String, Vec<u8>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        Ok(self.blobs.get(key).map(|blob| blob.value().clone()))
    }

    async fn put(&self, key: &str, blob: Vec<u8>) -> Result<(), PersistenceError> {
        self.blobs.insert(key.to_string(), blob);
        Ok(())
    }
}

/// Stores each key as `<root>/<key>.blob`.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, PersistenceError> {
        let valid = !key.is_empty()
            && key != "."
            && key != ".."
            && !key.contains(['/', '\\', '\0']);
        if !valid {
            return Err(PersistenceError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.blob")))
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(PersistenceError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    async fn put(&self, key: &str, blob: Vec<u8>) -> Result<(), PersistenceError> {
        let path = self.path_for(key)?;
        let io_error = |source| PersistenceError::Io {
            key: key.to_string(),
            source,
        };

        tokio::fs::create_dir_all(&self.root).await.map_err(io_error)?;
        // Write aside and rename so readers never observe a half-written blob.
        let staging = path.with_extension("blob.tmp");
        tokio::fs::write(&staging, &blob).await.map_err(io_error)?;
        tokio::fs::rename(&staging, &path).await.map_err(io_error)?;
        Ok(())
    }
}

/// On-disk representation of a record list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Json,
    MessagePack,
}

impl Encoding {
    pub fn encode(self, records: &[LocationRecord]) -> Result<Vec<u8>, PersistenceError> {
        match self {
            Encoding::Json => Ok(serde_json::to_vec(records)?),
            Encoding::MessagePack => Ok(rmp_serde::to_vec_named(records)?),
        }
    }

    pub fn decode(self, blob: &[u8]) -> Result<Vec<LocationRecord>, PersistenceError> {
        match self {
            Encoding::Json => Ok(serde_json::from_slice(blob)?),
            Encoding::MessagePack => Ok(rmp_serde::from_slice(blob)?),
        }
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Encoding::Json),
            "msgpack" | "messagepack" => Ok(Encoding::MessagePack),
            other => Err(format!("unknown encoding {other}")),
        }
    }
}

/// Saves and loads record lists under a key; failures never reach the caller.
#[derive(Clone)]
pub struct PersistenceAdapter {
    store: Arc<dyn BlobStore>,
    encoding: Encoding,
}

impl PersistenceAdapter {
    pub fn new(store: Arc<dyn BlobStore>, encoding: Encoding) -> Self {
        Self { store, encoding }
    }

    /// Best-effort write; a failure is logged and the previous blob stays in place.
    pub async fn save(&self, key: &str, records: &[LocationRecord]) {
        match self.try_save(key, records).await {
            Ok(()) => debug!("Persisted {} locations under {}", records.len(), key),
            Err(e) => error!("Failed to persist {}: {}", key, e),
        }
    }

    /// Reads a record list, treating a missing or malformed blob as empty.
    pub async fn load(&self, key: &str) -> Vec<LocationRecord> {
        match self.try_load(key).await {
            Ok(Some(records)) => records,
            Ok(None) => {
                debug!("Nothing persisted under {}", key);
                Vec::new()
            }
            Err(e) => {
                warn!("Discarding unreadable {}: {}", key, e);
                Vec::new()
            }
        }
    }

    pub async fn try_save(&self, key: &str, records: &[LocationRecord]) -> Result<(), PersistenceError> {
        let blob = self.encoding.encode(records)?;
        self.store.put(key, blob).await
    }

    pub async fn try_load(&self, key: &str) -> Result<Option<Vec<LocationRecord>>, PersistenceError> {
        match self.store.get(key).await? {
            Some(blob) => Ok(Some(self.encoding.decode(&blob)?)),
            None => Ok(None),
        }
    }
}
