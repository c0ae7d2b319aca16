//! Live collection synchronization.
//!
//! A view fetches a snapshot over HTTP, seeds a [`LiveCollection`] with it,
//! and then feeds it push events as they arrive. The collection keeps one
//! entry per id, applies each event exactly once, and tells subscribers
//! after every change.

mod collection;
mod listeners;
mod options;
mod shared;

pub use collection::{IgnoreReason, LiveCollection, Outcome, Phase};
pub use listeners::{ChangeKind, Notification, Subscription};
pub use options::{InsertionPolicy, PendingPolicy, RevisionPolicy, SyncOptions};
pub use shared::{PumpReport, SharedCollection};
