//! Durable key/value storage for session state
//!
//! Plays the part browser local storage plays for a web page: string values
//! under string keys, surviving restarts, readable by every form.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use crate::error::Result;

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Volatile store, used by tests and when no data directory is available
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// JSON file backed store; every change rewrites the whole file
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let entries = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self { path, entries })
    }

    /// Default location: `<data_dir>/docchat/session.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("docchat").join("session.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_set_get_remove() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("accessToken"), None);

        store.set("accessToken", "A").unwrap();
        assert_eq!(store.get("accessToken").as_deref(), Some("A"));

        store.remove("accessToken").unwrap();
        assert_eq!(store.get("accessToken"), None);
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        {
            let mut store = FileStore::open(&path).unwrap();
            store.set("accessToken", "A").unwrap();
            store.set("refreshToken", "R").unwrap();
        }

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("accessToken").as_deref(), Some("A"));
        assert_eq!(store.get("refreshToken").as_deref(), Some("R"));
    }

    #[test]
    fn test_file_store_remove_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut store = FileStore::open(&path).unwrap();
        store.set("accessToken", "A").unwrap();
        store.remove("accessToken").unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("accessToken"), None);
    }

    #[test]
    fn test_file_store_empty_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("accessToken"), None);
    }
}
