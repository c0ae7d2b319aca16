//! The live collection synchronizer.

use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};

use crate::event::MutationEvent;
use crate::models::{Entity, EntityId, Revision};
use crate::{Error, Result};

use super::listeners::{ChangeKind, ListenerRegistry, Notification, Subscription};
use super::options::{InsertionPolicy, PendingPolicy, RevisionPolicy, SyncOptions};

/// Whether a first snapshot has been loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Update or delete for an id the collection does not hold.
    UnknownId,
    /// Older than the held entity under [`RevisionPolicy::RejectStale`].
    Stale,
}

/// Result of handing one event to the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Inserted,
    /// Create for an id already held; the entity was replaced in place.
    Replaced,
    Updated,
    Removed,
    /// Update whose fields already matched the held entity.
    Unchanged,
    Ignored(IgnoreReason),
    /// Buffered until the first snapshot arrives.
    Queued,
}

impl Outcome {
    /// The change listeners are told about, if any.
    #[must_use]
    pub const fn change(self) -> Option<ChangeKind> {
        match self {
            Self::Inserted => Some(ChangeKind::Inserted),
            Self::Replaced => Some(ChangeKind::Replaced),
            Self::Updated => Some(ChangeKind::Updated),
            Self::Removed => Some(ChangeKind::Removed),
            Self::Unchanged | Self::Ignored(_) | Self::Queued => None,
        }
    }

    #[must_use]
    pub const fn is_change(self) -> bool {
        self.change().is_some()
    }
}

/// An ordered, id-keyed collection kept consistent with a remote source.
///
/// The collection is seeded by [`initialize`](Self::initialize) from a bulk
/// fetch and then mutated only through the create/update/delete entry
/// points, one event at a time. Per id, the collection converges to the last
/// applied event: after a delete the id is absent and later updates are
/// no-ops, after a create or update it holds the merged payload.
///
/// Every state change notifies each active listener exactly once, after the
/// change, with the new snapshot. Events that change nothing notify no one.
///
/// All entry points run to completion synchronously and do no I/O. Hosts
/// that share a collection across threads wrap it in
/// [`SharedCollection`](super::SharedCollection).
#[derive(Debug)]
pub struct LiveCollection<E: Entity> {
    options: SyncOptions,
    phase: Phase,
    items: Vec<E>,
    pending: VecDeque<MutationEvent<E>>,
    listeners: ListenerRegistry<E>,
}

impl<E: Entity> Default for LiveCollection<E> {
    fn default() -> Self {
        Self::new(SyncOptions::default())
    }
}

impl<E: Entity> LiveCollection<E> {
    #[must_use]
    pub fn new(options: SyncOptions) -> Self {
        Self {
            options,
            phase: Phase::Uninitialized,
            items: Vec::new(),
            pending: VecDeque::new(),
            listeners: ListenerRegistry::default(),
        }
    }

    pub const fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub const fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase == Phase::Ready
    }

    /// The current collection in display order.
    pub fn snapshot(&self) -> &[E] {
        &self.items
    }

    pub fn get(&self, id: &EntityId) -> Option<&E> {
        self.items.iter().find(|entity| entity.id() == id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.position(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Events buffered while uninitialized.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Replace the whole collection with a freshly fetched snapshot.
    ///
    /// Duplicate ids keep the position of their first occurrence and the
    /// payload of their last. Events queued before the first snapshot are
    /// replayed on top of it. Listeners hear exactly one
    /// [`ChangeKind::Initialized`].
    pub fn initialize(&mut self, snapshot: Vec<E>) {
        let mut items: Vec<E> = Vec::with_capacity(snapshot.len());
        let mut positions: HashMap<EntityId, usize> = HashMap::with_capacity(snapshot.len());
        let mut duplicates = 0usize;

        for entity in snapshot {
            if let Some(&index) = positions.get(entity.id()) {
                items[index] = entity;
                duplicates += 1;
            } else {
                positions.insert(entity.id().clone(), items.len());
                items.push(entity);
            }
        }

        if duplicates > 0 {
            tracing::warn!(
                duplicates,
                "Snapshot contained duplicate ids; keeping the last copy of each"
            );
        }

        self.items = items;
        self.phase = Phase::Ready;

        let replayed = self.pending.len();
        while let Some(event) = self.pending.pop_front() {
            let id = event.id().clone();
            let outcome = self.reconcile(event);
            tracing::debug!(%id, ?outcome, "Replayed queued event");
        }

        tracing::debug!(
            entities = self.items.len(),
            replayed,
            "Collection initialized"
        );
        self.notify(ChangeKind::Initialized, None);
    }

    /// Insert an entity, or replace it if its id is already held.
    pub fn apply_create(&mut self, entity: E) -> Result<Outcome> {
        self.apply(MutationEvent::Create(entity))
    }

    /// Merge `patch` into the entity with this id. Unknown ids are ignored.
    pub fn apply_update(&mut self, id: &EntityId, patch: E::Patch) -> Result<Outcome> {
        self.apply(MutationEvent::Update {
            id: id.clone(),
            patch,
        })
    }

    /// Remove the entity with this id. Unknown ids are ignored.
    pub fn apply_delete(&mut self, id: &EntityId) -> Result<Outcome> {
        self.apply(MutationEvent::Delete { id: id.clone() })
    }

    /// Apply one decoded event.
    ///
    /// Before the first snapshot the event is rejected with
    /// [`Error::NotInitialized`] or queued, per
    /// [`SyncOptions::before_ready`].
    pub fn apply(&mut self, event: MutationEvent<E>) -> Result<Outcome> {
        if self.phase == Phase::Uninitialized {
            return self.hold(event);
        }

        let id = event.id().clone();
        let kind = event.kind();
        let outcome = self.reconcile(event);
        if let Some(change) = outcome.change() {
            tracing::debug!(%id, %kind, ?outcome, "Applied event");
            self.notify(change, Some(&id));
        } else {
            tracing::debug!(%id, %kind, ?outcome, "Event left collection unchanged");
        }
        Ok(outcome)
    }

    /// Re-sort the collection. Notifies once if the collection is ready.
    pub fn reorder<F>(&mut self, compare: F)
    where
        F: FnMut(&E, &E) -> Ordering,
    {
        self.items.sort_by(compare);
        if self.is_ready() {
            self.notify(ChangeKind::Reordered, None);
        }
    }

    /// Drop all entities and queued events and return to uninitialized.
    ///
    /// Listeners stay registered and hear one [`ChangeKind::Reset`] if the
    /// collection was ready.
    pub fn reset(&mut self) {
        let was_ready = self.is_ready();
        self.items.clear();
        self.pending.clear();
        self.phase = Phase::Uninitialized;
        if was_ready {
            self.notify(ChangeKind::Reset, None);
        }
    }

    /// Register a listener called once per state change.
    pub fn subscribe<F>(&mut self, listener: F) -> Subscription
    where
        E: 'static,
        F: FnMut(&Notification<'_, E>) + Send + 'static,
    {
        self.listeners.register(listener)
    }

    /// Stop and drop a listener. Safe to call repeatedly.
    pub fn unsubscribe(&mut self, subscription: &Subscription) -> bool {
        self.listeners.remove(subscription)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.active_count()
    }

    fn hold(&mut self, event: MutationEvent<E>) -> Result<Outcome> {
        match self.options.before_ready {
            PendingPolicy::Reject => Err(Error::NotInitialized(event.kind().as_str())),
            PendingPolicy::Queue => {
                if self.pending.len() >= self.options.queue_capacity {
                    return Err(Error::PendingOverflow(self.options.queue_capacity));
                }
                self.pending.push_back(event);
                Ok(Outcome::Queued)
            }
        }
    }

    fn reconcile(&mut self, event: MutationEvent<E>) -> Outcome {
        match event {
            MutationEvent::Create(entity) => self.reconcile_create(entity),
            MutationEvent::Update { id, patch } => self.reconcile_update(&id, patch),
            MutationEvent::Delete { id } => self.reconcile_delete(&id),
        }
    }

    fn reconcile_create(&mut self, entity: E) -> Outcome {
        let Some(index) = self.position(entity.id()) else {
            match self.options.insertion {
                InsertionPolicy::Append => self.items.push(entity),
                InsertionPolicy::Prepend | InsertionPolicy::Surface => self.items.insert(0, entity),
            }
            return Outcome::Inserted;
        };

        if self.is_stale(entity.revision(), &self.items[index]) {
            tracing::warn!(id = %entity.id(), "Ignoring create older than the held entity");
            return Outcome::Ignored(IgnoreReason::Stale);
        }

        self.items[index] = entity;
        self.surface(index);
        Outcome::Replaced
    }

    fn reconcile_update(&mut self, id: &EntityId, patch: E::Patch) -> Outcome {
        let Some(index) = self.position(id) else {
            return Outcome::Ignored(IgnoreReason::UnknownId);
        };

        if self.is_stale(E::patch_revision(&patch), &self.items[index]) {
            tracing::warn!(%id, "Ignoring update older than the held entity");
            return Outcome::Ignored(IgnoreReason::Stale);
        }

        let current = &mut self.items[index];
        let before = current.clone();
        current.merge(patch);
        if *current == before {
            return Outcome::Unchanged;
        }

        self.surface(index);
        Outcome::Updated
    }

    fn reconcile_delete(&mut self, id: &EntityId) -> Outcome {
        match self.position(id) {
            Some(index) => {
                self.items.remove(index);
                Outcome::Removed
            }
            None => Outcome::Ignored(IgnoreReason::UnknownId),
        }
    }

    fn is_stale(&self, incoming: Option<Revision>, current: &E) -> bool {
        if self.options.revisions != RevisionPolicy::RejectStale {
            return false;
        }
        matches!(
            (incoming, current.revision()),
            (Some(incoming), Some(current)) if incoming < current
        )
    }

    /// Move the entity at `index` to the front under [`InsertionPolicy::Surface`].
    fn surface(&mut self, index: usize) {
        if self.options.insertion == InsertionPolicy::Surface && index > 0 {
            self.items[..=index].rotate_right(1);
        }
    }

    fn position(&self, id: &EntityId) -> Option<usize> {
        self.items.iter().position(|entity| entity.id() == id)
    }

    fn notify(&mut self, kind: ChangeKind, id: Option<&EntityId>) {
        let notification = Notification {
            kind,
            id,
            snapshot: &self.items,
        };
        self.listeners.notify(&notification);
    }
}
