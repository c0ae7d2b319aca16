//! Reconciliation policies chosen when a collection is constructed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Where new entities land in the collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertionPolicy {
    /// Creates go to the end; updates keep their position. Tabular views.
    #[default]
    Append,
    /// Creates go to the front; updates keep their position.
    Prepend,
    /// Creates and updates both move the entity to the front. Activity feeds
    /// and conversation lists ordered by latest activity.
    Surface,
}

/// What happens to mutations that arrive before the first snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingPolicy {
    /// Fail with [`Error::NotInitialized`](crate::Error::NotInitialized).
    #[default]
    Reject,
    /// Buffer in arrival order and replay on top of the first snapshot.
    Queue,
}

/// How competing writes for the same id are ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RevisionPolicy {
    /// Arrival order decides: the last applied event wins.
    #[default]
    LastArrival,
    /// Creates and updates whose revision is older than the held entity's
    /// are ignored. Missing revisions are never considered stale.
    RejectStale,
}

/// Construction-time options for a [`LiveCollection`](super::LiveCollection).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SyncOptions {
    pub insertion: InsertionPolicy,
    pub before_ready: PendingPolicy,
    pub revisions: RevisionPolicy,
    /// Upper bound on events buffered under [`PendingPolicy::Queue`].
    pub queue_capacity: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            insertion: InsertionPolicy::Append,
            before_ready: PendingPolicy::Reject,
            revisions: RevisionPolicy::LastArrival,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl SyncOptions {
    #[must_use]
    pub const fn with_insertion(mut self, insertion: InsertionPolicy) -> Self {
        self.insertion = insertion;
        self
    }

    #[must_use]
    pub const fn queue_before_ready(mut self, capacity: usize) -> Self {
        self.before_ready = PendingPolicy::Queue;
        self.queue_capacity = capacity;
        self
    }

    #[must_use]
    pub const fn reject_stale(mut self) -> Self {
        self.revisions = RevisionPolicy::RejectStale;
        self
    }
}

impl InsertionPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Append => "append",
            Self::Prepend => "prepend",
            Self::Surface => "surface",
        }
    }
}

impl fmt::Display for InsertionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InsertionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "append" => Ok(Self::Append),
            "prepend" => Ok(Self::Prepend),
            "surface" => Ok(Self::Surface),
            other => Err(format!(
                "unknown insertion policy `{other}` (expected append, prepend or surface)"
            )),
        }
    }
}

impl FromStr for PendingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "queue" => Ok(Self::Queue),
            other => Err(format!(
                "unknown pending policy `{other}` (expected reject or queue)"
            )),
        }
    }
}
