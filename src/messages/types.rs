use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A note on its way to the workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub id: Uuid,
    /// Trimmed note text
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl OutgoingMessage {
    /// Build a message from a draft; `None` when nothing is left after trimming
    pub fn from_draft(draft: &str) -> Option<Self> {
        let content = draft.trim();
        if content.is_empty() {
            return None;
        }
        Some(Self {
            id: Uuid::new_v4(),
            content: content.to_string(),
            created_at: Utc::now(),
        })
    }

    /// Character count of the content
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}
