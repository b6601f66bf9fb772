//! JSON file store backend
//!
//! Keeps every row in a single versioned JSON file with an in-memory cache,
//! written atomically through a temp-file rename. Stands in for the managed
//! PostgreSQL instance in development and for the admin tooling.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::RecordStore;
use crate::error::{BackendError, Result};

/// JSON file store backend
pub struct JsonFileStore {
    path: PathBuf,
    state: Arc<RwLock<StoreState>>,
}

/// In-memory representation of stored data
#[derive(Debug, Default)]
struct StoreState {
    entries: HashMap<String, String>,
    sequences: HashMap<String, i64>,
    dirty: bool,
}

/// File format for persistent storage
#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    sequences: HashMap<String, i64>,
    entries: HashMap<String, String>,
}

impl JsonFileStore {
    /// Open (or create) a store at the given path, loading existing data
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let state = Self::load_from_file(&path)?;
        debug!("Record store opened at {:?}", path);

        Ok(Self {
            path,
            state: Arc::new(RwLock::new(state)),
        })
    }

    fn load_from_file(path: &Path) -> Result<StoreState> {
        if !path.exists() {
            debug!("No existing store file found");
            return Ok(StoreState::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let file: StoreFile = serde_json::from_str(&contents)?;

        Ok(StoreState {
            entries: file.entries,
            sequences: file.sequences,
            dirty: false,
        })
    }

    /// Persist the current state to disk
    async fn save(&self) -> Result<()> {
        let state = self.state.read().await;

        if !state.dirty {
            return Ok(());
        }

        let file = StoreFile {
            version: 1,
            sequences: state.sequences.clone(),
            entries: state.entries.clone(),
        };

        let contents = serde_json::to_string_pretty(&file)?;

        // Write atomically using a temp file
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;

        debug!("Saved {} rows to {:?}", state.entries.len(), self.path);
        Ok(())
    }

    /// Create the store file on disk even when no rows exist yet
    pub async fn initialize(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state.dirty = true;
        }
        self.save().await
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let row = String::from_utf8(value.to_vec())
            .map_err(|e| BackendError::StorageError(format!("row is not valid UTF-8: {}", e)))?;

        {
            let mut state = self.state.write().await;
            state.entries.insert(key.to_string(), row);
            state.dirty = true;
        }

        self.save().await?;
        debug!("Stored row: {}", key);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let state = self.state.read().await;
        Ok(state.entries.get(key).map(|row| row.clone().into_bytes()))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let removed = {
            let mut state = self.state.write().await;
            let removed = state.entries.remove(key).is_some();
            if removed {
                state.dirty = true;
            }
            removed
        };

        if removed {
            self.save().await?;
            debug!("Deleted row: {}", key);
        }

        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state.entries.contains_key(key))
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let state = self.state.read().await;

        let keys: Vec<String> = state
            .entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();

        Ok(keys)
    }

    async fn clear(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state.entries.clear();
            state.sequences.clear();
            state.dirty = true;
        }

        self.save().await?;
        debug!("Cleared all rows");
        Ok(())
    }

    async fn next_id(&self, sequence: &str) -> Result<i64> {
        let id = {
            let mut state = self.state.write().await;
            let counter = state.sequences.entry(sequence.to_string()).or_insert(0);
            *counter += 1;
            let id = *counter;
            state.dirty = true;
            id
        };

        self.save().await?;
        Ok(id)
    }

    fn backend_name(&self) -> &'static str {
        "JSON File Store"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store(dir: &TempDir) -> JsonFileStore {
        JsonFileStore::open(dir.path().join("factumovil.json")).unwrap()
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        store.put("sender:1", b"{\"id\":1}").await.unwrap();

        let row = store.get("sender:1").await.unwrap();
        assert_eq!(row, Some(b"{\"id\":1}".to_vec()));
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        assert_eq!(store.get("sender:999").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        store.put("sender:1", b"{}").await.unwrap();
        store.delete("sender:1").await.unwrap();

        assert_eq!(store.get("sender:1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_keys_by_prefix() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        store.put("sender:1", b"{}").await.unwrap();
        store.put("sender:2", b"{}").await.unwrap();
        store.put("client:1", b"{}").await.unwrap();

        let keys = store.list_keys("sender:").await.unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&"sender:1".to_string()));
        assert!(keys.contains(&"sender:2".to_string()));
    }

    #[tokio::test]
    async fn test_sequences_are_monotonic_per_table() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        assert_eq!(store.next_id("senders").await.unwrap(), 1);
        assert_eq!(store.next_id("senders").await.unwrap(), 2);
        assert_eq!(store.next_id("clients").await.unwrap(), 1);
        assert_eq!(store.next_id("senders").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_clear_resets_rows_and_sequences() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        store.put("sender:1", b"{}").await.unwrap();
        store.next_id("senders").await.unwrap();

        store.clear().await.unwrap();

        assert!(store.list_keys("").await.unwrap().is_empty());
        // sequence restarts after a wipe, like a dropped-and-recreated table
        assert_eq!(store.next_id("senders").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_persistence_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("factumovil.json");

        {
            let store = JsonFileStore::open(&path).unwrap();
            store.put("sender:1", b"{\"ruc\":\"20123456789\"}").await.unwrap();
            store.next_id("senders").await.unwrap();
        }

        {
            let store = JsonFileStore::open(&path).unwrap();
            let row = store.get("sender:1").await.unwrap();
            assert_eq!(row, Some(b"{\"ruc\":\"20123456789\"}".to_vec()));
            // sequence continues where it left off
            assert_eq!(store.next_id("senders").await.unwrap(), 2);
        }
    }

    #[tokio::test]
    async fn test_initialize_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("factumovil.json");

        let store = JsonFileStore::open(&path).unwrap();
        assert!(!path.exists());

        store.initialize().await.unwrap();
        assert!(path.exists());
    }
}
