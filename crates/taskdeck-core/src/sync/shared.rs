//! Shared, thread-safe collection handle used by fetchers, push consumers and views.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::event::{decode_event, MutationEvent};
use crate::models::{Entity, EntityId};
use crate::{Error, Result};

use super::collection::{LiveCollection, Outcome, Phase};
use super::listeners::{Notification, Subscription};
use super::options::SyncOptions;

/// Totals for one run of [`SharedCollection::pump_frames`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PumpReport {
    pub received: usize,
    /// Frames that changed the collection.
    pub applied: usize,
    /// Frames that decoded fine but changed nothing.
    pub skipped: usize,
    pub queued: usize,
    pub malformed: usize,
    /// Frames refused because the collection was not ready.
    pub refused: usize,
}

/// Cloneable handle to one [`LiveCollection`].
///
/// Every operation takes the lock for its whole duration, so mutations are
/// applied one at a time in the order they acquire it. Listeners run while
/// the lock is held and must not call back into the same handle.
#[derive(Debug)]
pub struct SharedCollection<E: Entity> {
    inner: Arc<Mutex<LiveCollection<E>>>,
}

impl<E: Entity> Clone for SharedCollection<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Entity> Default for SharedCollection<E> {
    fn default() -> Self {
        Self::new(SyncOptions::default())
    }
}

impl<E: Entity> From<LiveCollection<E>> for SharedCollection<E> {
    fn from(collection: LiveCollection<E>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(collection)),
        }
    }
}

impl<E: Entity> SharedCollection<E> {
    #[must_use]
    pub fn new(options: SyncOptions) -> Self {
        LiveCollection::new(options).into()
    }

    pub async fn initialize(&self, snapshot: Vec<E>) {
        self.inner.lock().await.initialize(snapshot);
    }

    pub async fn apply_create(&self, entity: E) -> Result<Outcome> {
        self.inner.lock().await.apply_create(entity)
    }

    pub async fn apply_update(&self, id: &EntityId, patch: E::Patch) -> Result<Outcome> {
        self.inner.lock().await.apply_update(id, patch)
    }

    pub async fn apply_delete(&self, id: &EntityId) -> Result<Outcome> {
        self.inner.lock().await.apply_delete(id)
    }

    pub async fn apply(&self, event: MutationEvent<E>) -> Result<Outcome> {
        self.inner.lock().await.apply(event)
    }

    /// Owned copy of the current collection.
    pub async fn snapshot(&self) -> Vec<E> {
        self.inner.lock().await.snapshot().to_vec()
    }

    pub async fn phase(&self) -> Phase {
        self.inner.lock().await.phase()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    /// Run `read` against the collection without cloning it.
    pub async fn with<R>(&self, read: impl FnOnce(&LiveCollection<E>) -> R) -> R {
        read(&*self.inner.lock().await)
    }

    pub async fn subscribe<F>(&self, listener: F) -> Subscription
    where
        E: 'static,
        F: FnMut(&Notification<'_, E>) + Send + 'static,
    {
        self.inner.lock().await.subscribe(listener)
    }

    pub async fn unsubscribe(&self, subscription: &Subscription) -> bool {
        self.inner.lock().await.unsubscribe(subscription)
    }

    pub async fn reorder<F>(&self, compare: F)
    where
        F: FnMut(&E, &E) -> Ordering,
    {
        self.inner.lock().await.reorder(compare);
    }

    pub async fn reset(&self) {
        self.inner.lock().await.reset();
    }
}

impl<E> SharedCollection<E>
where
    E: Entity + DeserializeOwned + Send + 'static,
    E::Patch: DeserializeOwned + Send,
{
    /// Decode and apply one raw push frame.
    pub async fn apply_frame(&self, frame: &str) -> Result<Outcome> {
        let event = decode_event::<E>(frame)?;
        self.apply(event).await
    }

    /// Apply frames until the sender side closes.
    ///
    /// Bad frames are logged and dropped; they never stop the pump or touch
    /// the collection.
    pub async fn pump_frames(&self, mut frames: mpsc::Receiver<String>) -> PumpReport {
        let mut report = PumpReport::default();

        while let Some(frame) = frames.recv().await {
            report.received += 1;
            match self.apply_frame(&frame).await {
                Ok(Outcome::Queued) => report.queued += 1,
                Ok(outcome) if outcome.is_change() => report.applied += 1,
                Ok(_) => report.skipped += 1,
                Err(error @ Error::MalformedEvent(_)) => {
                    report.malformed += 1;
                    tracing::warn!("Dropping malformed push frame: {error}");
                }
                Err(error) => {
                    report.refused += 1;
                    tracing::warn!("Push frame refused: {error}");
                }
            }
        }

        tracing::info!(
            received = report.received,
            applied = report.applied,
            skipped = report.skipped,
            queued = report.queued,
            malformed = report.malformed,
            refused = report.refused,
            "Push stream closed"
        );
        report
    }

    /// Run [`pump_frames`](Self::pump_frames) on the tokio runtime.
    pub fn spawn_pump(&self, frames: mpsc::Receiver<String>) -> JoinHandle<PumpReport> {
        let collection = self.clone();
        tokio::spawn(async move { collection.pump_frames(frames).await })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::models::{Record, Task};

    fn id(raw: &str) -> EntityId {
        EntityId::new(raw).unwrap()
    }

    #[tokio::test]
    async fn clones_share_one_collection() {
        let writer = SharedCollection::<Record>::default();
        let reader = writer.clone();

        writer
            .initialize(vec![Record::from_value(json!({"id": "1", "title": "A"})).unwrap()])
            .await;
        writer.apply_delete(&id("1")).await.unwrap();

        assert!(reader.is_empty().await);
        assert_eq!(reader.phase().await, Phase::Ready);
    }

    #[tokio::test]
    async fn pump_applies_frames_and_counts_failures() {
        let collection = SharedCollection::<Task>::default();
        collection.initialize(vec![Task::new(id("t1"), "Draft")]).await;

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        collection
            .subscribe(move |_| {
                counter.fetch_add(1, AtomicOrdering::SeqCst);
            })
            .await;

        let (sender, receiver) = mpsc::channel(8);
        let pump = collection.spawn_pump(receiver);
        for frame in [
            r#"{"type":"create","payload":{"_id":"t2","title":"Review"}}"#,
            r#"{"type":"update","id":"t1","payload":{"done":true}}"#,
            r#"{"type":"update","id":"t1","payload":{"done":true}}"#,
            r#"{"type":"delete","id":"missing"}"#,
            r#"{"type":"explode","id":"t1"}"#,
            "{",
        ] {
            sender.send(frame.to_string()).await.unwrap();
        }
        drop(sender);

        let report = pump.await.unwrap();
        assert_eq!(
            report,
            PumpReport {
                received: 6,
                applied: 2,
                skipped: 2,
                queued: 0,
                malformed: 2,
                refused: 0,
            }
        );
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 2);

        let tasks = collection.snapshot().await;
        assert_eq!(tasks.len(), 2);
        assert!(tasks[0].completed);
        assert_eq!(tasks[1].title, "Review");
    }

    #[tokio::test]
    async fn pump_counts_refusals_before_first_snapshot() {
        let collection = SharedCollection::<Record>::default();
        let (sender, receiver) = mpsc::channel(2);
        sender
            .send(r#"{"type":"delete","id":"1"}"#.to_string())
            .await
            .unwrap();
        drop(sender);

        let report = collection.pump_frames(receiver).await;
        assert_eq!(report.refused, 1);
        assert_eq!(collection.phase().await, Phase::Uninitialized);
    }

    #[tokio::test]
    async fn queued_frames_wait_for_the_snapshot() {
        let collection =
            SharedCollection::<Record>::new(SyncOptions::default().queue_before_ready(4));
        let outcome = collection
            .apply_frame(r#"{"type":"create","payload":{"id":"2"}}"#)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Queued);

        collection
            .initialize(vec![Record::from_value(json!({"id": "1"})).unwrap()])
            .await;

        let ids = collection
            .with(|live| {
                live.snapshot()
                    .iter()
                    .map(|record| record.id().to_string())
                    .collect::<Vec<_>>()
            })
            .await;
        assert_eq!(ids, vec!["1", "2"]);
    }
}
