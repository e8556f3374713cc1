//! Persistent store for endpoint profiles
//!
//! Profiles live as a JSON array under one preference key and the current
//! selection as a plain id under another. Every write is a read-modify-write
//! of the whole map, serialised by a mutex shared between clones of the store.
//!
//! The reserved `"default"` profile always exists: reads synthesise it when
//! storage is empty, corrupt or missing it, and writes persist it alongside
//! whatever else is saved.
//!
//! After each successful write a [`ProfileSnapshot`] is pushed to every
//! subscriber, in write order. Once a write returns `Ok`, `list()` and
//! `current()` on any clone observe it.

use super::preferences::{KeyValueStore, PreferenceMap};
use super::types::{EndpointProfile, DEFAULT_PROFILE_ID};
use crate::{InboxError, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Preference key holding the JSON-encoded profile list
pub const API_CONFIGS_KEY: &str = "api_configs";

/// Preference key holding the current selection
pub const CURRENT_CONFIG_ID_KEY: &str = "current_config_id";

/// Profiles and current selection as of one write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSnapshot {
    pub profiles: Vec<EndpointProfile>,
    pub current: EndpointProfile,
}

/// Store of endpoint profiles backed by a key-value backend
///
/// Cheap to clone; clones share the backend, lock and subscribers.
#[derive(Clone)]
pub struct ProfileStore {
    backend: Arc<dyn KeyValueStore>,
    seed: EndpointProfile,
    write_lock: Arc<Mutex<()>>,
    subscribers: Arc<Mutex<Vec<Sender<ProfileSnapshot>>>>,
}

impl ProfileStore {
    /// Create a store over a backend
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
            seed: EndpointProfile::create_default(),
            write_lock: Arc::new(Mutex::new(())),
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Replace the profile seeded when no default exists yet
    ///
    /// The seed always uses the reserved id and carries the default flag.
    pub fn with_seed(mut self, mut seed: EndpointProfile) -> Self {
        seed.id = DEFAULT_PROFILE_ID.to_string();
        seed.is_default = true;
        self.seed = seed;
        self
    }

    /// The profile seeded on first run
    pub fn seed(&self) -> &EndpointProfile {
        &self.seed
    }

    /// All profiles in stable order; never empty
    pub fn list(&self) -> Vec<EndpointProfile> {
        self.normalize(decode_profiles(&self.read_or_empty()))
    }

    /// The currently selected profile; never fails
    pub fn current(&self) -> EndpointProfile {
        self.current_in(&self.read_or_empty())
    }

    /// Profiles and current selection read together
    pub fn snapshot(&self) -> ProfileSnapshot {
        self.snapshot_of(&self.read_or_empty())
    }

    /// Subscribe to snapshots published after every write
    pub fn subscribe(&self) -> Receiver<ProfileSnapshot> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Generate an id for a new profile
    pub fn generate_id(&self) -> String {
        let id = Uuid::new_v4().to_string();
        debug!("Generated profile id {}", id);
        id
    }

    /// Insert or replace a profile by id
    ///
    /// Saving a default profile clears the flag everywhere else and makes it
    /// the current selection. The first profile saved into empty storage also
    /// becomes current.
    pub fn save(&self, profile: EndpointProfile) -> Result<()> {
        info!(id = %profile.id, name = %profile.name, "Saving profile");

        self.update(|map| {
            let stored = decode_profiles(map);
            let was_empty = stored.is_empty();

            let mut profiles: Vec<EndpointProfile> = self
                .normalize(stored)
                .into_iter()
                .filter(|p| p.id != profile.id)
                .collect();
            profiles.push(profile.clone());

            if profile.is_default {
                for p in profiles.iter_mut().filter(|p| p.id != profile.id) {
                    p.is_default = false;
                }
            }

            write_profiles(map, &profiles)?;

            if profile.is_default || was_empty {
                debug!("Selecting saved profile {}", profile.id);
                map.insert(CURRENT_CONFIG_ID_KEY.to_string(), profile.id.clone());
            }
            Ok(true)
        })
        .map(|_| ())
    }

    /// Remove a profile; the reserved default profile is never removed
    pub fn delete(&self, id: &str) -> Result<()> {
        if id == DEFAULT_PROFILE_ID {
            warn!("Refusing to delete the default profile");
            return Ok(());
        }
        info!(id = %id, "Deleting profile");

        let changed = self.update(|map| {
            let profiles = self.normalize(decode_profiles(map));
            if !profiles.iter().any(|p| p.id == id) {
                debug!("Profile {} not found, nothing to delete", id);
                return Ok(false);
            }

            let mut remaining: Vec<EndpointProfile> =
                profiles.into_iter().filter(|p| p.id != id).collect();
            if remaining.is_empty() {
                remaining.push(self.seed.clone());
            }
            write_profiles(map, &remaining)?;

            if map.get(CURRENT_CONFIG_ID_KEY).map(String::as_str) == Some(id) {
                let next = remaining[0].id.clone();
                debug!("Deleted the current profile, selecting {}", next);
                map.insert(CURRENT_CONFIG_ID_KEY.to_string(), next);
            }
            Ok(true)
        })?;

        if changed {
            info!(id = %id, "Profile deleted");
        }
        Ok(())
    }

    /// Point the selection at `id` without checking that it exists
    pub fn set_current(&self, id: &str) -> Result<()> {
        info!(id = %id, "Setting current profile");
        self.update(|map| {
            map.insert(CURRENT_CONFIG_ID_KEY.to_string(), id.to_string());
            Ok(true)
        })
        .map(|_| ())
    }

    /// Read-modify-write under the store lock, publishing on change
    fn update<F>(&self, f: F) -> Result<bool>
    where
        F: FnOnce(&mut PreferenceMap) -> Result<bool>,
    {
        let _guard = self.write_lock.lock();

        let mut map = self.backend.read()?;
        if !f(&mut map)? {
            return Ok(false);
        }

        if let Err(e) = self.backend.write(&map) {
            error!("Failed to persist profiles: {}", e);
            return Err(e);
        }

        self.publish(self.snapshot_of(&map));
        Ok(true)
    }

    fn publish(&self, snapshot: ProfileSnapshot) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(snapshot.clone()).is_ok());
        debug!("Published profile snapshot to {} subscribers", subscribers.len());
    }

    fn read_or_empty(&self) -> PreferenceMap {
        self.backend.read().unwrap_or_else(|e| {
            warn!("Failed to read preferences, using defaults: {}", e);
            PreferenceMap::new()
        })
    }

    fn snapshot_of(&self, map: &PreferenceMap) -> ProfileSnapshot {
        ProfileSnapshot {
            profiles: self.normalize(decode_profiles(map)),
            current: self.current_in(map),
        }
    }

    fn current_in(&self, map: &PreferenceMap) -> EndpointProfile {
        let profiles = self.normalize(decode_profiles(map));
        let id = map
            .get(CURRENT_CONFIG_ID_KEY)
            .map(String::as_str)
            .unwrap_or(DEFAULT_PROFILE_ID);

        profiles
            .iter()
            .find(|p| p.id == id)
            .or_else(|| profiles.first())
            .cloned()
            .unwrap_or_else(|| self.seed.clone())
    }

    /// Enforce the list invariants: one reserved profile, at most one default
    fn normalize(&self, mut profiles: Vec<EndpointProfile>) -> Vec<EndpointProfile> {
        let mut has_default = false;
        for p in profiles.iter_mut() {
            if p.is_default {
                if has_default {
                    p.is_default = false;
                }
                has_default = true;
            }
        }

        if !profiles.iter().any(EndpointProfile::is_reserved) {
            let seed = self.seed.clone().with_default(!has_default);
            profiles.insert(0, seed);
        }
        profiles
    }
}

/// Decode the stored list; absent or corrupt data reads as no profiles
fn decode_profiles(map: &PreferenceMap) -> Vec<EndpointProfile> {
    let Some(raw) = map.get(API_CONFIGS_KEY) else {
        return Vec::new();
    };
    if raw.trim().is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<Vec<EndpointProfile>>(raw) {
        Ok(profiles) => profiles,
        Err(e) => {
            warn!("Stored profiles are unreadable, falling back to defaults: {}", e);
            Vec::new()
        }
    }
}

fn write_profiles(map: &mut PreferenceMap, profiles: &[EndpointProfile]) -> Result<()> {
    let json =
        serde_json::to_string(profiles).map_err(|e| InboxError::StorageError(e.to_string()))?;
    map.insert(API_CONFIGS_KEY.to_string(), json);
    Ok(())
}
