//! Change listeners and their subscription handles.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::models::EntityId;

/// What changed in the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// A snapshot replaced the whole collection.
    Initialized,
    Inserted,
    /// A create arrived for an id already held.
    Replaced,
    Updated,
    Removed,
    Reordered,
    /// The collection was cleared back to uninitialized.
    Reset,
}

/// Passed to every listener once per state change.
#[derive(Debug)]
pub struct Notification<'a, E> {
    pub kind: ChangeKind,
    /// The entity that changed, for single-entity mutations.
    pub id: Option<&'a EntityId>,
    /// The collection as it stands after the change.
    pub snapshot: &'a [E],
}

type Listener<E> = Box<dyn FnMut(&Notification<'_, E>) + Send>;

/// Per-listener storage shared between the registry and its handle.
///
/// While a listener runs it is moved out of the slot, so cancelling from
/// inside any listener never waits on the slot's lock for long.
struct Slot<E> {
    state: Mutex<SlotState<E>>,
}

struct SlotState<E> {
    cancelled: bool,
    listener: Option<Listener<E>>,
}

impl<E> Slot<E> {
    fn lock(&self) -> MutexGuard<'_, SlotState<E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    fn take_listener(&self) -> Option<Listener<E>> {
        let mut state = self.lock();
        if state.cancelled {
            None
        } else {
            state.listener.take()
        }
    }

    fn invoke(&self, notification: &Notification<'_, E>) {
        let Some(mut listener) = self.take_listener() else {
            return;
        };

        listener(notification);

        let mut state = self.lock();
        if !state.cancelled {
            state.listener = Some(listener);
        }
    }
}

/// Type-erased view of a [`Slot`] held by [`Subscription`].
trait Release: Send + Sync {
    fn release(&self);
    fn is_released(&self) -> bool;
}

impl<E> Release for Slot<E> {
    fn release(&self) {
        let dropped = {
            let mut state = self.lock();
            state.cancelled = true;
            state.listener.take()
        };
        drop(dropped);
    }

    fn is_released(&self) -> bool {
        self.is_cancelled()
    }
}

/// Handle returned by `subscribe`.
///
/// [`Subscription::cancel`] stops delivery and drops the listener closure
/// along with everything it captured. It may be called any number of times,
/// from any thread. A listener that cancels itself is dropped as soon as it
/// returns.
#[derive(Clone)]
pub struct Subscription {
    id: u64,
    slot: Arc<dyn Release>,
}

impl Subscription {
    pub fn cancel(&self) {
        self.slot.release();
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.slot.is_released()
    }

    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

struct Entry<E> {
    id: u64,
    slot: Arc<Slot<E>>,
}

pub(crate) struct ListenerRegistry<E> {
    next_id: u64,
    entries: Vec<Entry<E>>,
}

impl<E> Default for ListenerRegistry<E> {
    fn default() -> Self {
        Self {
            next_id: 1,
            entries: Vec::new(),
        }
    }
}

impl<E: 'static> ListenerRegistry<E> {
    pub(crate) fn register<F>(&mut self, listener: F) -> Subscription
    where
        F: FnMut(&Notification<'_, E>) + Send + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        let slot = Arc::new(Slot {
            state: Mutex::new(SlotState {
                cancelled: false,
                listener: Some(Box::new(listener)),
            }),
        });
        self.entries.push(Entry {
            id,
            slot: Arc::clone(&slot),
        });
        Subscription { id, slot }
    }
}

impl<E> ListenerRegistry<E> {
    /// Cancel and forget the listener. Returns whether it was still registered.
    pub(crate) fn remove(&mut self, subscription: &Subscription) -> bool {
        let was_active = subscription.is_active();
        subscription.cancel();
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != subscription.id);
        was_active && self.entries.len() != before
    }

    pub(crate) fn notify(&mut self, notification: &Notification<'_, E>) {
        self.entries.retain(|entry| !entry.slot.is_cancelled());
        for entry in &self.entries {
            // A listener earlier in this pass may have cancelled a later one.
            entry.slot.invoke(notification);
        }
    }

    pub(crate) fn active_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| !entry.slot.is_cancelled())
            .count()
    }
}

impl<E> fmt::Debug for ListenerRegistry<E> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ListenerRegistry")
            .field("next_id", &self.next_id)
            .field("listeners", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn notification(snapshot: &[u8]) -> Notification<'_, u8> {
        Notification {
            kind: ChangeKind::Updated,
            id: None,
            snapshot,
        }
    }

    #[test]
    fn cancel_is_idempotent_and_stops_delivery() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ListenerRegistry::<u8>::default();
        let counter = Arc::clone(&calls);
        let subscription = registry.register(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        registry.notify(&notification(&[]));
        subscription.cancel();
        subscription.cancel();
        registry.notify(&notification(&[]));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!subscription.is_active());
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn remove_drops_listener_once() {
        let mut registry = ListenerRegistry::<u8>::default();
        let subscription = registry.register(|_| {});
        assert!(registry.remove(&subscription));
        assert!(!registry.remove(&subscription));
        assert_eq!(format!("{registry:?}"), "ListenerRegistry { next_id: 2, listeners: 0 }");
    }

    #[test]
    fn listener_cancelled_mid_pass_is_skipped() {
        let mut registry = ListenerRegistry::<u8>::default();
        let victim: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let seen = Arc::new(AtomicUsize::new(0));

        let handle = Arc::clone(&victim);
        registry.register(move |_| {
            if let Some(subscription) = handle.lock().unwrap().as_ref() {
                subscription.cancel();
            }
        });
        let counter = Arc::clone(&seen);
        let second = registry.register(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        *victim.lock().unwrap() = Some(second);

        registry.notify(&notification(&[1]));
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cancel_drops_captured_state_immediately() {
        let mut registry = ListenerRegistry::<u8>::default();
        let captured = Arc::new(());
        let held = Arc::clone(&captured);
        let subscription = registry.register(move |_| {
            let _ = &held;
        });
        assert_eq!(Arc::strong_count(&captured), 2);

        subscription.cancel();

        assert_eq!(Arc::strong_count(&captured), 1);
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn self_cancel_drops_listener_after_it_returns() {
        let mut registry = ListenerRegistry::<u8>::default();
        let own: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let captured = Arc::new(());
        let calls = Arc::new(AtomicUsize::new(0));

        let handle = Arc::clone(&own);
        let held = Arc::clone(&captured);
        let counter = Arc::clone(&calls);
        let subscription = registry.register(move |_| {
            let _ = &held;
            counter.fetch_add(1, Ordering::SeqCst);
            if let Some(subscription) = handle.lock().unwrap().take() {
                subscription.cancel();
            }
        });
        *own.lock().unwrap() = Some(subscription.clone());

        registry.notify(&notification(&[]));
        registry.notify(&notification(&[]));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!subscription.is_active());
        assert_eq!(Arc::strong_count(&captured), 1);
    }
}
