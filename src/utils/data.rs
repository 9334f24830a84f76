//! Local key/value persistence for the event cache and the ledger.
//!
//! Every slot holds one JSON document. `FileStore` keeps one `<key>.json` file
//! per slot inside a data directory; `MemoryStore` keeps them in a map.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on slot '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid slot key: {0}")]
    InvalidKey(String),

    #[error("Slot store lock poisoned")]
    Poisoned,
}

pub trait SlotStore: Send + Sync {
    /// Raw slot contents, None when the slot was never written
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

pub type SharedStore = Arc<dyn SlotStore>;

pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl SlotStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let io_err = |source| StoreError::Io {
            key: key.to_string(),
            source,
        };
        std::fs::create_dir_all(&self.dir).map_err(io_err)?;

        // Write next to the slot and rename so a crash never leaves half a document
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value).map_err(io_err)?;
        std::fs::rename(&tmp, &path).map_err(io_err)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SlotStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let slots = self.slots.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(slots.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut slots = self.slots.lock().map_err(|_| StoreError::Poisoned)?;
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut slots = self.slots.lock().map_err(|_| StoreError::Poisoned)?;
        slots.remove(key);
        Ok(())
    }
}

/// Serialize a value into a slot
pub fn save_to_slot<T: Serialize + ?Sized>(store: &dyn SlotStore, key: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string(value)
        .with_context(|| format!("Failed to serialize slot '{}'", key))?;
    store
        .write(key, &json)
        .with_context(|| format!("Failed to write slot '{}'", key))?;
    Ok(())
}

/// Load a value from a slot, None when the slot is empty
pub fn load_from_slot<T: DeserializeOwned>(store: &dyn SlotStore, key: &str) -> Result<Option<T>> {
    let json = match store
        .read(key)
        .with_context(|| format!("Failed to read slot '{}'", key))?
    {
        Some(json) => json,
        None => return Ok(None),
    };
    let value = serde_json::from_str(&json)
        .with_context(|| format!("Failed to deserialize slot '{}'", key))?;
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "sport_calendar_{}_{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = temp_dir("file_store");
        let store = FileStore::new(&dir);

        assert_eq!(store.read("wallet").unwrap(), None);
        store.write("wallet", "90").unwrap();
        assert_eq!(store.read("wallet").unwrap().as_deref(), Some("90"));
        assert!(dir.join("wallet.json").exists());

        store.remove("wallet").unwrap();
        assert_eq!(store.read("wallet").unwrap(), None);
        // Removing an empty slot is fine
        store.remove("wallet").unwrap();

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_file_store_rejects_path_keys() {
        let store = FileStore::new(temp_dir("bad_keys"));
        assert!(matches!(
            store.write("../escape", "1"),
            Err(StoreError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_typed_slots() {
        let store = MemoryStore::new();
        assert_eq!(load_from_slot::<Vec<u32>>(&store, "nums").unwrap(), None);

        save_to_slot(&store, "nums", &vec![1u32, 2, 3]).unwrap();
        let nums: Option<Vec<u32>> = load_from_slot(&store, "nums").unwrap();
        assert_eq!(nums, Some(vec![1, 2, 3]));

        store.write("nums", "not json").unwrap();
        assert!(load_from_slot::<Vec<u32>>(&store, "nums").is_err());
    }
}
