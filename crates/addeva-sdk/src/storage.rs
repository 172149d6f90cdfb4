//! Key/value storage backends for persisted credentials.
//!
//! The browser offers a process-wide string store with last-write-wins
//! semantics.  [`KeyValueStorage`] abstracts it so the credential store
//! can run against memory (tests, headless tools) or a JSON file on disk.
//!
//! Backend failures never reach the caller: they are logged and a failed
//! read looks like a missing key.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};

const APP_DIR: &str = "addeva";
const STORAGE_FILE: &str = "storage.json";

/// A string key/value store with at most one value per key.
pub trait KeyValueStorage: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str);

    /// Remove `key`.  Removing a missing key is a no-op.
    fn remove(&self, key: &str);
}

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

/// In-memory storage, lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.remove(key);
    }
}

// ---------------------------------------------------------------------------
// FileStorage
// ---------------------------------------------------------------------------

/// Storage persisted as a flat JSON object in a single file.
///
/// The file is re-read on every access so several processes sharing it
/// observe each other's writes.  Writes go to a temporary file in the same
/// directory which is then renamed over the target, so a reader never sees
/// a half-written file.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    // Serialises access within this process.
    lock: Mutex<()>,
}

impl FileStorage {
    /// Use the given file, which does not need to exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Use `<config dir>/addeva/storage.json`.
    ///
    /// Returns `None` when the platform has no config directory.
    pub fn in_config_dir() -> Option<Self> {
        let dir = dirs::config_dir()?.join(APP_DIR);
        Some(Self::new(dir.join(STORAGE_FILE)))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> BTreeMap<String, String> {
        if !self.path.exists() {
            return BTreeMap::new();
        }

        match fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(values) => values,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "failed to parse storage file");
                    BTreeMap::new()
                }
            },
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read storage file");
                BTreeMap::new()
            }
        }
    }

    fn save(&self, values: &BTreeMap<String, String>) {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        if !dir.exists() {
            if let Err(e) = fs::create_dir_all(dir) {
                warn!(path = %dir.display(), error = %e, "failed to create storage directory");
                return;
            }
        }

        let json = match serde_json::to_string_pretty(values) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialise storage");
                return;
            }
        };

        let written = tempfile::NamedTempFile::new_in(dir).and_then(|mut tmp| {
            tmp.write_all(json.as_bytes())?;
            tmp.persist(&self.path).map_err(|e| e.error)?;
            Ok(())
        });
        match written {
            Ok(()) => debug!(path = %self.path.display(), keys = values.len(), "storage saved"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to write storage file"),
        }
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.load().remove(key)
    }

    fn set(&self, key: &str, value: &str) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut values = self.load();
        values.insert(key.to_string(), value.to_string());
        self.save(&values);
    }

    fn remove(&self, key: &str) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut values = self.load();
        if values.remove(key).is_some() {
            self.save(&values);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::thread;

    #[test]
    fn memory_last_write_wins() {
        let storage = MemoryStorage::new();
        storage.set("k", "one");
        storage.set("k", "two");
        assert_eq!(storage.get("k").as_deref(), Some("two"));
    }

    #[test]
    fn memory_remove_missing_is_noop() {
        let storage = MemoryStorage::new();
        storage.remove("missing");
        assert_eq!(storage.get("missing"), None);
    }

    #[test]
    fn file_values_survive_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        FileStorage::new(&path).set("addeva_api_key", "abc123");

        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.get("addeva_api_key").as_deref(), Some("abc123"));

        reopened.remove("addeva_api_key");
        assert_eq!(FileStorage::new(&path).get("addeva_api_key"), None);
    }

    #[test]
    fn file_missing_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("absent.json"));
        assert_eq!(storage.get("anything"), None);
    }

    #[test]
    fn file_corrupt_reads_as_empty_and_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "not json").unwrap();

        let storage = FileStorage::new(&path);
        assert_eq!(storage.get("k"), None);

        storage.set("k", "v");
        assert_eq!(storage.get("k").as_deref(), Some("v"));
    }

    #[test]
    fn file_reads_never_miss_during_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        let storage = Arc::new(FileStorage::new(&path));
        storage.set("addeva_api_key", "abc123");

        let writer = {
            let storage = Arc::clone(&storage);
            thread::spawn(move || {
                for i in 0..300 {
                    storage.set("addeva_auth_token", &format!("token-{i}"));
                }
            })
        };

        // A second instance on the same file has its own lock, so only the
        // rename keeps its reads whole.
        let other = FileStorage::new(&path);
        let mut misses = 0;
        for _ in 0..1000 {
            if storage.get("addeva_api_key").as_deref() != Some("abc123") {
                misses += 1;
            }
            if other.get("addeva_api_key").as_deref() != Some("abc123") {
                misses += 1;
            }
        }
        writer.join().unwrap();

        assert_eq!(misses, 0);
        assert_eq!(storage.get("addeva_auth_token").as_deref(), Some("token-299"));
    }
}
