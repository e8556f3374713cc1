//! View state holders
//!
//! Rendering is left to the front-end; these types hold what a screen shows
//! and translate user actions into store updates and sends.

pub mod main_view;
pub mod settings_view;

pub use main_view::{MainUiState, MainViewModel, SendPhase};
pub use settings_view::{SettingsUiState, SettingsViewModel};
