//! Key-value preference backends
//!
//! The profile store keeps everything as string values under a handful of
//! keys. Backends only need to load and replace the whole map.

use crate::{InboxError, Result};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// All persisted preferences
pub type PreferenceMap = BTreeMap<String, String>;

/// A backend that can load and replace the whole preference map
pub trait KeyValueStore: Send + Sync {
    /// Read every entry. A missing backing store reads as empty.
    fn read(&self) -> Result<PreferenceMap>;

    /// Replace every entry
    fn write(&self, map: &PreferenceMap) -> Result<()>;
}

/// Preferences stored as a single JSON object on disk
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for JsonFileStore {
    fn read(&self) -> Result<PreferenceMap> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No preference file at {}", self.path.display());
                return Ok(PreferenceMap::new());
            }
            Err(e) => {
                return Err(InboxError::StorageError(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        // Bad encoding and bad JSON both read as empty
        match serde_json::from_slice(&content) {
            Ok(map) => Ok(map),
            Err(e) => {
                warn!(
                    "Preference file {} is unreadable, treating as empty: {}",
                    self.path.display(),
                    e
                );
                Ok(PreferenceMap::new())
            }
        }
    }

    fn write(&self, map: &PreferenceMap) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    InboxError::StorageError(format!(
                        "Failed to create {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let json = serde_json::to_string_pretty(map)
            .map_err(|e| InboxError::StorageError(e.to_string()))?;

        // Write a sibling file, then rename it over the target
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| {
            InboxError::StorageError(format!("Failed to write {}: {}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            InboxError::StorageError(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e
            ))
        })?;

        debug!("Wrote {} preference entries", map.len());
        Ok(())
    }
}

/// In-memory preferences, shared between clones
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<PreferenceMap>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-filled with raw entries
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: Arc::new(RwLock::new(map)),
        }
    }

    /// Get a raw value
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self) -> Result<PreferenceMap> {
        Ok(self.entries.read().clone())
    }

    fn write(&self, map: &PreferenceMap) -> Result<()> {
        *self.entries.write() = map.clone();
        Ok(())
    }
}
