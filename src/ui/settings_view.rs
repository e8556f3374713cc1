//! State holder for the settings screen

use crate::profiles::{EndpointProfile, ProfileEdit, ProfileSnapshot, ProfileStore};
use crate::{InboxError, Result};
use crossbeam_channel::Receiver;
use tracing::{debug, error, info, warn};

/// Editor state of the settings screen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsUiState {
    pub is_editing: bool,
    pub editing_profile: Option<EndpointProfile>,
}

/// View model for the settings screen
pub struct SettingsViewModel {
    store: ProfileStore,
    state: SettingsUiState,
    profiles: Vec<EndpointProfile>,
    current: EndpointProfile,
    profile_rx: Receiver<ProfileSnapshot>,
}

impl SettingsViewModel {
    pub fn new(store: ProfileStore) -> Self {
        let profile_rx = store.subscribe();
        let snapshot = store.snapshot();
        debug!("Settings view loaded {} profiles", snapshot.profiles.len());

        Self {
            store,
            state: SettingsUiState::default(),
            profiles: snapshot.profiles,
            current: snapshot.current,
            profile_rx,
        }
    }

    pub fn state(&self) -> &SettingsUiState {
        &self.state
    }

    pub fn profiles(&self) -> &[EndpointProfile] {
        &self.profiles
    }

    pub fn current_profile(&self) -> &EndpointProfile {
        &self.current
    }

    /// Apply profile changes published since the last call
    pub fn poll_events(&mut self) {
        if let Some(latest) = self.profile_rx.try_iter().last() {
            self.apply(latest);
        }
    }

    /// Select a profile; unknown ids are rejected
    pub fn set_current_profile(&mut self, id: &str) -> Result<()> {
        if !self.store.list().iter().any(|p| p.id == id) {
            warn!("Cannot select unknown profile {}", id);
            return Err(InboxError::ProfileNotFound(id.to_string()));
        }
        self.write(|store| store.set_current(id))
    }

    /// Delete a profile; deleting the default profile does nothing
    pub fn delete_profile(&mut self, id: &str) -> Result<()> {
        self.write(|store| store.delete(id))
    }

    pub fn save_profile(&mut self, profile: EndpointProfile) -> Result<()> {
        self.write(|store| store.save(profile))
    }

    pub fn generate_profile_id(&self) -> String {
        self.store.generate_id()
    }

    pub fn set_editing_profile(&mut self, profile: Option<EndpointProfile>) {
        debug!(
            "Editing profile: {}",
            profile.as_ref().map_or("none", |p| p.name.as_str())
        );
        self.state.editing_profile = profile;
    }

    /// Open the editor on a blank profile with a fresh id
    pub fn start_create_new_profile(&mut self) {
        let profile = EndpointProfile::new(
            self.store.generate_id(),
            "New profile",
            self.store.seed().base_url.clone(),
            "",
            "",
        );
        info!("Creating new profile {}", profile.id);
        self.state = SettingsUiState {
            is_editing: true,
            editing_profile: Some(profile),
        };
    }

    /// Open the editor on an existing profile
    pub fn start_edit_profile(&mut self, profile: EndpointProfile) {
        info!("Editing profile {}", profile.id);
        self.state = SettingsUiState {
            is_editing: true,
            editing_profile: Some(profile),
        };
    }

    /// Change fields of the profile being edited; no-op outside the editor
    pub fn update_editing_profile(&mut self, edit: ProfileEdit) {
        if let Some(profile) = self.state.editing_profile.as_mut() {
            profile.apply(edit);
        }
    }

    pub fn cancel_edit(&mut self) {
        debug!("Edit cancelled");
        self.state = SettingsUiState::default();
    }

    /// Save the profile being edited and close the editor
    ///
    /// The editor stays open when saving fails.
    pub fn finish_edit(&mut self) -> Result<()> {
        let Some(profile) = self.state.editing_profile.clone() else {
            return Ok(());
        };
        self.save_profile(profile)?;
        self.state = SettingsUiState::default();
        Ok(())
    }

    fn write<F>(&mut self, op: F) -> Result<()>
    where
        F: FnOnce(&ProfileStore) -> Result<()>,
    {
        if let Err(e) = op(&self.store) {
            error!("Failed to update profiles: {}", e);
            return Err(e);
        }
        // Reads are consistent as soon as the write returns
        let snapshot = self.store.snapshot();
        self.apply(snapshot);
        Ok(())
    }

    fn apply(&mut self, snapshot: ProfileSnapshot) {
        self.profiles = snapshot.profiles;
        self.current = snapshot.current;
    }
}
