//! Goal model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::{nullable, Entity, EntityId, Revision};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    #[serde(alias = "_id")]
    pub id: EntityId,
    pub title: String,
    /// Percent complete, 0..=100
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub target_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Goal {
    #[must_use]
    pub fn new(id: EntityId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            progress: 0,
            completed: false,
            owner: None,
            target_date: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Progress clamped to 100, with completed goals pinned at 100.
    #[must_use]
    pub fn effective_progress(&self) -> u8 {
        if self.completed {
            100
        } else {
            self.progress.min(100)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub progress: Option<u8>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub owner: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub target_date: Option<Option<DateTime<Utc>>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for Goal {
    type Patch = GoalPatch;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn revision(&self) -> Option<Revision> {
        self.updated_at.or(self.created_at)
    }

    fn merge(&mut self, patch: GoalPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(progress) = patch.progress {
            self.progress = progress;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(owner) = patch.owner {
            self.owner = owner;
        }
        if let Some(target_date) = patch.target_date {
            self.target_date = target_date;
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = Some(updated_at);
        }
    }

    fn patch_revision(patch: &GoalPatch) -> Option<Revision> {
        patch.updated_at
    }
}
