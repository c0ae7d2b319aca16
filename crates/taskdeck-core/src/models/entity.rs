//! Entity identity and the contract every synchronized record implements.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{Error, Result};

/// Last-modified marker used to order competing writes for the same entity.
///
/// The backend has no per-entity version counter, so `updatedAt` (falling back
/// to `createdAt`) is the best available proxy.
pub type Revision = DateTime<Utc>;

/// Backend-assigned identifier. Never empty, never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId(String);

impl EntityId {
    /// Build an id from raw text, trimming surrounding whitespace.
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("entity id cannot be empty".to_string()));
        }
        if trimmed.len() == raw.len() {
            Ok(Self(raw))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntityId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for EntityId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<EntityId> for String {
    fn from(value: EntityId) -> Self {
        value.0
    }
}

/// A record that can live in a [`LiveCollection`](crate::sync::LiveCollection).
///
/// The payload is opaque to the synchronizer: it only needs the id, an
/// optional revision, and a way to fold a partial update into the record.
pub trait Entity: Clone + PartialEq + fmt::Debug {
    /// Partial update carried by an `update` event. Present fields win.
    type Patch: Clone + PartialEq + fmt::Debug;

    fn id(&self) -> &EntityId;

    fn revision(&self) -> Option<Revision>;

    /// Overwrite every field the patch carries. The id is never changed.
    fn merge(&mut self, patch: Self::Patch);

    /// Revision stamped on a patch, if the backend sent one.
    fn patch_revision(patch: &Self::Patch) -> Option<Revision>;
}

/// Deserialize a field that distinguishes "absent" from "explicitly null".
///
/// Use with `#[serde(default, deserialize_with = "nullable")]` on an
/// `Option<Option<T>>` patch field: absent stays `None`, `null` becomes
/// `Some(None)`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
