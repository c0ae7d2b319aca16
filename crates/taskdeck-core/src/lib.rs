//! taskdeck-core - Core library for Taskdeck
//!
//! This crate contains the entity models, push event decoding and the live
//! collection synchronizer shared by every Taskdeck view, plus the snapshot
//! fetcher and configuration used to feed it.

pub mod aggregate;
pub mod api;
pub mod config;
pub mod error;
pub mod event;
pub mod models;
pub mod session;
pub mod state;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use event::{decode_event, MutationEvent, MutationKind};
pub use models::{Entity, EntityId};
pub use session::Session;
pub use sync::{LiveCollection, Outcome, SharedCollection, SyncOptions};
