//! Key-value storage backends for preset durability and session snapshots:
//! a `HashMap`-backed store for tests and ephemeral runs, and a single-file
//! JSON store for the demo viewer.

use crate::{GridFilterError, GridFilterResult, KeyValueStore};

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

/// Ephemeral in-memory key-value store.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: BTreeMap<String, String>,
    /// When set, every write fails. Used to test degraded-storage behavior.
    fail_writes: bool,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent `set`/`remove` calls fail with a storage error.
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> GridFilterResult<()> {
        if self.fail_writes {
            return Err(GridFilterError::Storage(format!(
                "simulated write failure for key '{key}'"
            )));
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> GridFilterResult<()> {
        if self.fail_writes {
            return Err(GridFilterError::Storage(format!(
                "simulated remove failure for key '{key}'"
            )));
        }
        self.entries.remove(key);
        Ok(())
    }
}

/// Key-value store persisted as one JSON object in a single file.
///
/// The whole map is rewritten on every mutation: entries are small (filter
/// state, presets) and write-through persistence is the point.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Opens the store, loading existing entries if the file is present.
    /// A missing file is an empty store; a malformed file is reported.
    pub fn open(path: &Path) -> GridFilterResult<Self> {
        let entries = if path.exists() {
            let contents = fs::read_to_string(path)
                .map_err(|e| GridFilterError::Storage(format!("read '{}': {e}", path.display())))?;
            serde_json::from_str(&contents).map_err(|e| {
                GridFilterError::Storage(format!("parse '{}': {e}", path.display()))
            })?
        } else {
            BTreeMap::new()
        };

        tracing::debug!(
            "opened JsonFileStore at '{}' with {} entries",
            path.display(),
            entries.len()
        );
        Ok(JsonFileStore {
            path: path.to_path_buf(),
            entries,
        })
    }

    fn flush(&self) -> GridFilterResult<()> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, json).map_err(|e| {
            GridFilterError::Storage(format!("write '{}': {e}", self.path.display()))
        })
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> GridFilterResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> GridFilterResult<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

//----------------------------------------------------------------------------//
//                                   Tests                                    //
//----------------------------------------------------------------------------//

/// Run tests with:
/// cargo test -- --show-output tests_storage
#[cfg(test)]
mod tests_storage {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_round_trip() {
        let mut store = MemoryKeyValueStore::new();
        assert_eq!(store.get("k"), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k"), Some("v".to_string()));
        store.remove("k").unwrap();
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn test_memory_store_simulated_failure() {
        let mut store = MemoryKeyValueStore::new();
        store.set_fail_writes(true);
        assert!(store.set("k", "v").is_err());
        assert!(store.remove("k").is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_json_file_store_persists_across_reopen() -> GridFilterResult<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("state.json");

        let mut store = JsonFileStore::open(&path)?;
        store.set("filters", "{\"age\":1}")?;
        store.set("presets", "[]")?;
        drop(store);

        // Simulated reload.
        let store = JsonFileStore::open(&path)?;
        assert_eq!(store.get("filters"), Some("{\"age\":1}".to_string()));
        assert_eq!(store.get("presets"), Some("[]".to_string()));
        Ok(())
    }

    #[test]
    fn test_json_file_store_remove() -> GridFilterResult<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("state.json");

        let mut store = JsonFileStore::open(&path)?;
        store.set("k", "v")?;
        store.remove("k")?;
        drop(store);

        let store = JsonFileStore::open(&path)?;
        assert_eq!(store.get("k"), None);
        Ok(())
    }

    #[test]
    fn test_json_file_store_rejects_malformed_file() -> GridFilterResult<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("state.json");
        fs::write(&path, "not json")?;

        let result = JsonFileStore::open(&path);
        assert!(matches!(result, Err(GridFilterError::Storage(_))));
        Ok(())
    }
}
