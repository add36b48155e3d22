//! Client-local key-value storage for the authenticated identity.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use facegate_ui::welcome_message;
use thiserror::Error;
use tracing::debug;

/// Key the authenticated identity is stored under.
pub const IDENTITY_KEY: &str = "username";

/// String key-value storage shared with other views.
pub trait KeyValueStore: Send + Sync {
    /// Reads a value.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes a value, overwriting any previous one.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the backing storage cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store persisted as one JSON object on disk.
///
/// Writes go to a sibling temporary file that is renamed over the target, so
/// readers never see a half-written file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Creates a store backed by `path`; the file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match fs::read(&self.path) {
            Ok(raw) if raw.is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_slice(&raw)?),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(error) => Err(error.into()),
        }
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut entries = self.read_entries()?;
        entries.insert(key.to_string(), value.to_string());

        let encoded = serde_json::to_vec_pretty(&entries)?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, encoded)?;
        fs::rename(&staging, &self.path)?;

        debug!(stage = "storage", action = "set", key, path = %self.path.display(), "entry written");
        Ok(())
    }
}

/// Welcome text for the stored identity, if anyone has logged in.
///
/// # Errors
/// Propagates [`StoreError`] from the backing store.
pub fn welcome_view(store: &dyn KeyValueStore) -> Result<Option<String>, StoreError> {
    Ok(store
        .get(IDENTITY_KEY)?
        .map(|identity| welcome_message(&identity)))
}

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// File I/O failed.
    #[error("storage i/o failure: {0}")]
    Io(#[from] io::Error),
    /// Stored JSON is invalid.
    #[error("storage codec failure: {0}")]
    Codec(#[from] serde_json::Error),
    /// A writer panicked while holding the store lock.
    #[error("storage lock poisoned")]
    Poisoned,
}
