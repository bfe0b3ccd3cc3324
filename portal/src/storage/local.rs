//! Persistent key/value storage for client-side state.
//!
//! The file-backed store keeps a flat JSON object on disk and rewrites it
//! atomically (temp file + rename) on every mutation.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::PortalPaths;
use crate::errors::{PortalError, PortalResult};

pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> PortalResult<Option<String>>;
    fn set_items(&self, entries: &[(&str, &str)]) -> PortalResult<()>;
    fn remove_items(&self, keys: &[&str]) -> PortalResult<()>;
}

/// JSON file on disk.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    // serializes read-modify-write cycles within the process
    write_lock: Mutex<()>,
}

impl FileKeyValueStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn from_paths(paths: &PortalPaths) -> Self {
        Self::new(paths.local_state_file())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> PortalResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let bytes = fs::read(&self.path)?;
        if bytes.is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> PortalResult<()> {
        let serialized = serde_json::to_vec_pretty(map)?;
        let dir = self
            .path
            .parent()
            .ok_or_else(|| PortalError::StorageError("Invalid local state path".to_string()))?;
        fs::create_dir_all(dir)?;
        let tmp_path = self.path.with_extension("new");
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&serialized)?;
            file.sync_all()?;
        }
        fs::rename(tmp_path, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get_item(&self, key: &str) -> PortalResult<Option<String>> {
        Ok(self.read_map()?.get(key).cloned())
    }

    fn set_items(&self, entries: &[(&str, &str)]) -> PortalResult<()> {
        let _guard = self.write_lock.lock();
        let mut map = self.read_map()?;
        for (key, value) in entries {
            map.insert((*key).to_string(), (*value).to_string());
        }
        self.write_map(&map)
    }

    fn remove_items(&self, keys: &[&str]) -> PortalResult<()> {
        let _guard = self.write_lock.lock();
        let mut map = self.read_map()?;
        let before = map.len();
        for key in keys {
            map.remove(*key);
        }
        if map.len() == before {
            return Ok(());
        }
        self.write_map(&map)
    }
}

/// Process-local store, used for ephemeral sessions and tests.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get_item(&self, key: &str) -> PortalResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set_items(&self, entries: &[(&str, &str)]) -> PortalResult<()> {
        let mut map = self.entries.lock();
        for (key, value) in entries {
            map.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }

    fn remove_items(&self, keys: &[&str]) -> PortalResult<()> {
        let mut map = self.entries.lock();
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}

/// Storage that is switched off (private browsing, read-only media).
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableKeyValueStore;

impl KeyValueStore for UnavailableKeyValueStore {
    fn get_item(&self, _key: &str) -> PortalResult<Option<String>> {
        Err(PortalError::PermissionDenied(
            "Local storage is unavailable".to_string(),
        ))
    }

    fn set_items(&self, _entries: &[(&str, &str)]) -> PortalResult<()> {
        Err(PortalError::PermissionDenied(
            "Local storage is unavailable".to_string(),
        ))
    }

    fn remove_items(&self, _keys: &[&str]) -> PortalResult<()> {
        Err(PortalError::PermissionDenied(
            "Local storage is unavailable".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_store_persists_between_instances() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.json");

        FileKeyValueStore::new(&path)
            .set_items(&[("email", "a@b.c"), ("password", "pw")])
            .unwrap();

        let reopened = FileKeyValueStore::new(&path);
        assert_eq!(reopened.get_item("email").unwrap().as_deref(), Some("a@b.c"));
        assert_eq!(reopened.get_item("password").unwrap().as_deref(), Some("pw"));
        assert!(!path.with_extension("new").exists());
    }

    #[test]
    fn file_store_remove_keeps_unrelated_keys() {
        let temp = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(temp.path().join("state.json"));
        store
            .set_items(&[("email", "x"), ("password", "y"), ("theme", "dark")])
            .unwrap();
        store.remove_items(&["email", "password"]).unwrap();

        assert_eq!(store.get_item("email").unwrap(), None);
        assert_eq!(store.get_item("theme").unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let temp = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(temp.path().join("absent.json"));
        assert_eq!(store.get_item("email").unwrap(), None);
        store.remove_items(&["email"]).unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn corrupted_file_is_reported() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.json");
        fs::write(&path, b"{not json").unwrap();
        let store = FileKeyValueStore::new(&path);
        assert!(store.get_item("email").is_err());
    }

    #[test]
    fn unavailable_store_always_fails() {
        let store = UnavailableKeyValueStore;
        assert!(store.get_item("email").is_err());
        assert!(store.set_items(&[("email", "x")]).is_err());
        assert!(store.remove_items(&["email"]).is_err());
    }
}
