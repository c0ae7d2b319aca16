//! Chat message model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::{Entity, EntityId, Revision};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(alias = "_id")]
    pub id: EntityId,
    pub conversation_id: String,
    pub sender: String,
    pub body: String,
    /// Users who have seen this message
    #[serde(default)]
    pub read_by: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Whether `reader` still has this message unread. Senders have always
    /// read their own messages.
    #[must_use]
    pub fn is_unread_by(&self, reader: &str) -> bool {
        self.sender != reader && !self.read_by.iter().any(|user| user == reader)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePatch {
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub read_by: Option<Vec<String>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for Message {
    type Patch = MessagePatch;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn revision(&self) -> Option<Revision> {
        self.updated_at.or(self.created_at)
    }

    fn merge(&mut self, patch: MessagePatch) {
        if let Some(body) = patch.body {
            self.body = body;
        }
        if let Some(read_by) = patch.read_by {
            self.read_by = read_by;
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = Some(updated_at);
        }
    }

    fn patch_revision(patch: &MessagePatch) -> Option<Revision> {
        patch.updated_at
    }
}
