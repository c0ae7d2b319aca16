//! Meeting model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::{nullable, Entity, EntityId, Revision};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    #[serde(alias = "_id")]
    pub id: EntityId,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub participants: Vec<String>,
    /// Room name or call link
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "nullable")]
    pub ends_at: Option<Option<DateTime<Utc>>>,
    #[serde(default)]
    pub participants: Option<Vec<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub location: Option<Option<String>>,
    #[serde(default)]
    pub cancelled: Option<bool>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for Meeting {
    type Patch = MeetingPatch;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn revision(&self) -> Option<Revision> {
        self.updated_at.or(self.created_at)
    }

    fn merge(&mut self, patch: MeetingPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(starts_at) = patch.starts_at {
            self.starts_at = starts_at;
        }
        if let Some(ends_at) = patch.ends_at {
            self.ends_at = ends_at;
        }
        if let Some(participants) = patch.participants {
            self.participants = participants;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        if let Some(cancelled) = patch.cancelled {
            self.cancelled = cancelled;
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = Some(updated_at);
        }
    }

    fn patch_revision(patch: &MeetingPatch) -> Option<Revision> {
        patch.updated_at
    }
}
