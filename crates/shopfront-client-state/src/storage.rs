use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("storage quota exceeded: {attempted} bytes over a {capacity} byte budget")]
    QuotaExceeded { attempted: usize, capacity: usize },
    #[error("storage write failed: {message}")]
    WriteFailed { message: String },
}

/// Durable per-origin key-value storage, abstracted so domain logic never
/// touches the underlying mechanism. All operations are synchronous.
/// Implementations are `Debug` so the structs holding a backend handle can
/// derive it.
pub trait StorageBackend: Send + Sync + std::fmt::Debug {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str);
    fn keys(&self) -> Vec<String>;
}

/// Shared in-memory backend. Two contexts holding the same `Arc` see each
/// other's writes, which is how tests model same-origin tabs. An optional
/// capacity budget simulates quota-exceeded write failures.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    capacity_bytes: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity_bytes(capacity_bytes: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity_bytes: Some(capacity_bytes),
        }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries();
        if let Some(capacity) = self.capacity_bytes {
            let used = entries
                .iter()
                .filter(|(existing, _)| existing.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum::<usize>();
            let attempted = used + key.len() + value.len();
            if attempted > capacity {
                return Err(StorageError::QuotaExceeded {
                    attempted,
                    capacity,
                });
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.entries().remove(key);
    }

    fn keys(&self) -> Vec<String> {
        let mut keys = self.entries().keys().cloned().collect::<Vec<_>>();
        keys.sort();
        keys
    }
}

/// File-backed backend: one file per key under a data directory. Used by the
/// desktop shells where no browser storage exists.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are `<prefix>-<name>` shaped; anything else is flattened so a
        // key can never escape the data directory.
        let sanitized = key
            .chars()
            .map(|ch| {
                if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.' {
                    ch
                } else {
                    '_'
                }
            })
            .collect::<String>();
        self.dir.join(format!("{sanitized}.json"))
    }
}

impl StorageBackend for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).map_err(|error| StorageError::WriteFailed {
            message: format!("mkdir failed: {error}"),
        })?;
        fs::write(self.path_for(key), value).map_err(|error| StorageError::WriteFailed {
            message: format!("write failed: {error}"),
        })
    }

    fn remove(&self, key: &str) {
        let _ = fs::remove_file(self.path_for(key));
    }

    fn keys(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut keys = entries
            .filter_map(|entry| {
                let name = entry.ok()?.file_name().into_string().ok()?;
                name.strip_suffix(".json").map(|key| key.to_string())
            })
            .collect::<Vec<_>>();
        keys.sort();
        keys
    }
}
