use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of the profile that always exists and cannot be deleted
pub const DEFAULT_PROFILE_ID: &str = "default";

/// Base URL used for the seeded default profile and for new profiles
pub const DEFAULT_BASE_URL: &str = "https://api.coze.cn/";

/// A named bundle of endpoint connection parameters
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointProfile {
    /// Unique identifier ("default" or a UUID)
    pub id: String,
    /// Display name
    pub name: String,
    /// API base URL
    pub base_url: String,
    /// Bearer token sent with every request
    pub api_key: String,
    /// Remote workflow to run
    pub workflow_id: String,
    /// Whether this is the default profile
    #[serde(default)]
    pub is_default: bool,
}

impl EndpointProfile {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        workflow_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            workflow_id: workflow_id.into(),
            is_default: false,
        }
    }

    /// The hardcoded profile used on first run and whenever storage is unusable
    pub fn create_default() -> Self {
        Self {
            id: DEFAULT_PROFILE_ID.to_string(),
            name: "Default".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            workflow_id: String::new(),
            is_default: true,
        }
    }

    pub fn with_default(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }

    /// Whether this is the reserved, undeletable profile
    pub fn is_reserved(&self) -> bool {
        self.id == DEFAULT_PROFILE_ID
    }

    /// Whether every field needed for a request is filled in
    pub fn is_complete(&self) -> bool {
        !self.base_url.trim().is_empty()
            && !self.api_key.trim().is_empty()
            && !self.workflow_id.trim().is_empty()
    }

    /// Apply the non-empty overrides of an edit
    pub fn apply(&mut self, edit: ProfileEdit) {
        if let Some(name) = edit.name {
            self.name = name;
        }
        if let Some(base_url) = edit.base_url {
            self.base_url = base_url;
        }
        if let Some(api_key) = edit.api_key {
            self.api_key = api_key;
        }
        if let Some(workflow_id) = edit.workflow_id {
            self.workflow_id = workflow_id;
        }
        if let Some(is_default) = edit.is_default {
            self.is_default = is_default;
        }
    }
}

// Keeps API keys out of logs.
impl fmt::Debug for EndpointProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = if self.api_key.is_empty() { "" } else { "<redacted>" };
        f.debug_struct("EndpointProfile")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("api_key", &key)
            .field("workflow_id", &self.workflow_id)
            .field("is_default", &self.is_default)
            .finish()
    }
}

/// Field overrides for the profile being edited; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileEdit {
    pub name: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub workflow_id: Option<String>,
    pub is_default: Option<bool>,
}

impl ProfileEdit {
    pub fn is_empty(&self) -> bool {
        self == &ProfileEdit::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile() {
        let profile = EndpointProfile::create_default();
        assert!(profile.is_reserved());
        assert!(profile.is_default);
        assert!(!profile.is_complete());
    }

    #[test]
    fn test_persisted_field_names() {
        let profile = EndpointProfile::new("x", "Work", "https://example.com/", "k", "w");
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["baseUrl"], "https://example.com/");
        assert_eq!(json["apiKey"], "k");
        assert_eq!(json["workflowId"], "w");
        assert_eq!(json["isDefault"], false);
    }

    #[test]
    fn test_is_default_is_optional_when_decoding() {
        let profile: EndpointProfile = serde_json::from_str(
            r#"{"id":"a","name":"A","baseUrl":"u","apiKey":"k","workflowId":"w"}"#,
        )
        .unwrap();
        assert!(!profile.is_default);
    }

    #[test]
    fn test_debug_redacts_key() {
        let profile = EndpointProfile::new("x", "Work", "u", "pat_secret", "w");
        let debug = format!("{:?}", profile);
        assert!(!debug.contains("pat_secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_apply_edit() {
        let mut profile = EndpointProfile::new("x", "Work", "u", "k", "w");
        profile.apply(ProfileEdit {
            name: Some("Home".to_string()),
            is_default: Some(true),
            ..Default::default()
        });
        assert_eq!(profile.name, "Home");
        assert_eq!(profile.api_key, "k");
        assert!(profile.is_default);
        assert!(ProfileEdit::default().is_empty());
    }
}
