//! Endpoint profiles and their persistence
//!
//! This module provides:
//! - `EndpointProfile`, the connection parameters for one workflow
//! - key-value preference backends (JSON file, in-memory)
//! - `ProfileStore`, the profile list with its default-profile invariants

pub mod preferences;
pub mod store;
pub mod types;

pub use preferences::{JsonFileStore, KeyValueStore, MemoryStore, PreferenceMap};
pub use store::{ProfileSnapshot, ProfileStore, API_CONFIGS_KEY, CURRENT_CONFIG_ID_KEY};
pub use types::{EndpointProfile, ProfileEdit, DEFAULT_BASE_URL, DEFAULT_PROFILE_ID};
