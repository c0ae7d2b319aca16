//! Social feed post model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::{Entity, EntityId, Revision};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(alias = "_id")]
    pub id: EntityId,
    pub author: String,
    pub body: String,
    #[serde(default)]
    pub likes: u32,
    #[serde(default)]
    pub comment_count: u32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPatch {
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub likes: Option<u32>,
    #[serde(default)]
    pub comment_count: Option<u32>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for Post {
    type Patch = PostPatch;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn revision(&self) -> Option<Revision> {
        self.updated_at.or(self.created_at)
    }

    fn merge(&mut self, patch: PostPatch) {
        if let Some(body) = patch.body {
            self.body = body;
        }
        if let Some(likes) = patch.likes {
            self.likes = likes;
        }
        if let Some(comment_count) = patch.comment_count {
            self.comment_count = comment_count;
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = Some(updated_at);
        }
    }

    fn patch_revision(patch: &PostPatch) -> Option<Revision> {
        patch.updated_at
    }
}
