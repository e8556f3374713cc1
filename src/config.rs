//! Application configuration
//!
//! Loaded from an optional TOML file; every field has a default so an empty
//! or missing file is valid.

use crate::profiles::EndpointProfile;
use crate::{InboxError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// File name of the preference store inside the data directory
pub const PREFERENCES_FILE: &str = "preferences.json";

/// Configuration for the whole application
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding persisted preferences
    pub data_dir: PathBuf,

    /// TCP/TLS connect timeout for workflow calls
    pub connect_timeout_secs: u64,

    /// Overall timeout for one workflow call
    pub request_timeout_secs: u64,

    /// How long the success flag stays up after a send
    pub success_display_ms: u64,

    /// Tracing filter used when `RUST_LOG` is not set
    pub log_filter: String,

    /// Overrides for the seeded default profile
    pub default_profile: Option<DefaultProfileConfig>,
}

/// Values for the profile seeded on first run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultProfileConfig {
    pub name: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub workflow_id: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            connect_timeout_secs: 30,
            request_timeout_secs: 30,
            success_display_ms: 2000,
            log_filter: "inboxhub=info,warn".to_string(),
            default_profile: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file; a missing file yields defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No config file at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(InboxError::ConfigError(format!(
                    "Failed to read config '{}': {}",
                    path.display(),
                    e
                )))
            }
        };

        let config = Self::from_toml_str(&content).map_err(|e| match e {
            InboxError::ConfigError(msg) => {
                InboxError::ConfigError(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .map_err(|e| InboxError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Default location of the config file
    pub fn default_path() -> PathBuf {
        default_data_dir().join("config.toml")
    }

    /// Set the data directory
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Set how long the success flag stays up
    pub fn with_success_display(mut self, duration: Duration) -> Self {
        self.success_display_ms = duration.as_millis() as u64;
        self
    }

    /// Set both transport timeouts
    ///
    /// Fractions of a second round up; zero durations are rejected.
    pub fn with_timeouts(mut self, connect: Duration, request: Duration) -> Result<Self> {
        self.connect_timeout_secs = whole_secs(connect);
        self.request_timeout_secs = whole_secs(request);
        self.validate()?;
        Ok(self)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout_secs == 0 {
            return Err(InboxError::ConfigError(
                "connect_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(InboxError::ConfigError(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.log_filter.trim().is_empty() {
            return Err(InboxError::ConfigError("log_filter must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn success_display(&self) -> Duration {
        Duration::from_millis(self.success_display_ms)
    }

    /// Path of the preference file
    pub fn preferences_path(&self) -> PathBuf {
        self.data_dir.join(PREFERENCES_FILE)
    }

    /// The profile seeded when no default profile is stored yet
    pub fn seed_profile(&self) -> EndpointProfile {
        let mut profile = EndpointProfile::create_default();
        if let Some(overrides) = &self.default_profile {
            if let Some(name) = &overrides.name {
                profile.name = name.clone();
            }
            if let Some(base_url) = &overrides.base_url {
                profile.base_url = base_url.clone();
            }
            if let Some(api_key) = &overrides.api_key {
                profile.api_key = api_key.clone();
            }
            if let Some(workflow_id) = &overrides.workflow_id {
                profile.workflow_id = workflow_id.clone();
            }
        }
        profile
    }
}

fn whole_secs(duration: Duration) -> u64 {
    duration.as_millis().div_ceil(1000) as u64
}

fn default_data_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("inboxhub"))
        .unwrap_or_else(|| PathBuf::from(".inboxhub"))
}
