//! InboxHub - forward typed or dictated notes to a workflow-automation API
//!
//! The crate provides:
//! - endpoint profiles persisted in a key-value preference store
//! - a workflow client that sends one note per request
//! - view state holders for the main and settings screens

pub mod api;
pub mod config;
pub mod error;
pub mod messages;
pub mod profiles;
pub mod speech;
pub mod ui;

pub use config::AppConfig;
pub use error::{InboxError, Result, SendError};

pub use api::{MessageSender, WorkflowClient};
pub use profiles::{EndpointProfile, JsonFileStore, MemoryStore, ProfileStore};
pub use ui::{MainViewModel, SettingsViewModel};
