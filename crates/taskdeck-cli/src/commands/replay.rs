use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use taskdeck_core::models::{Entity, Goal, Meeting, Message, Post, Record, Task};
use taskdeck_core::sync::{InsertionPolicy, PumpReport, SharedCollection, SyncOptions};
use tokio::sync::mpsc;

use crate::cli::EntityKind;
use crate::commands::common::{print_entities, read_frames, read_snapshot_file, Describe};
use crate::error::CliError;

const FRAME_BUFFER: usize = 64;

#[derive(Debug, Clone)]
pub struct ReplayArgs {
    pub snapshot: PathBuf,
    pub events: Option<PathBuf>,
    pub kind: EntityKind,
    pub options: SyncOptions,
    /// Deliver events before the snapshot lands.
    pub events_first: bool,
    pub json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Replay<E> {
    pub entities: Vec<E>,
    pub report: PumpReport,
    /// Listener invocations observed during the replay.
    pub notifications: usize,
}

/// Layer the replay flags over the configured sync options.
///
/// `queue_early` keeps the configured queue capacity.
pub fn replay_options(
    configured: SyncOptions,
    insertion: Option<InsertionPolicy>,
    queue_early: bool,
    reject_stale: bool,
) -> SyncOptions {
    let mut options = configured;
    if let Some(insertion) = insertion {
        options = options.with_insertion(insertion);
    }
    if queue_early {
        options = options.queue_before_ready(options.queue_capacity);
    }
    if reject_stale {
        options = options.reject_stale();
    }
    options
}

pub async fn run_replay(args: &ReplayArgs) -> Result<(), CliError> {
    match args.kind {
        EntityKind::Task => replay_and_print::<Task>(args).await,
        EntityKind::Goal => replay_and_print::<Goal>(args).await,
        EntityKind::Meeting => replay_and_print::<Meeting>(args).await,
        EntityKind::Message => replay_and_print::<Message>(args).await,
        EntityKind::Post => replay_and_print::<Post>(args).await,
        EntityKind::Record => replay_and_print::<Record>(args).await,
    }
}

async fn replay_and_print<E>(args: &ReplayArgs) -> Result<(), CliError>
where
    E: Entity + Describe + Serialize + DeserializeOwned + Send + 'static,
    E::Patch: DeserializeOwned + Send,
{
    let snapshot = read_snapshot_file::<E>(&args.snapshot)?;
    let frames = match &args.events {
        Some(path) => read_frames(path)?,
        None => Vec::new(),
    };

    let replay = replay(snapshot, frames, args.options, args.events_first).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&replay)?);
    } else {
        print_entities(&replay.entities, false)?;
        println!("{}", format_report(&replay.report, replay.notifications));
    }
    Ok(())
}

/// Feed `frames` through a fresh collection seeded with `snapshot`.
///
/// With `events_first` the frames arrive while the collection is still
/// waiting for its snapshot, which exercises the pre-snapshot policy.
pub async fn replay<E>(
    snapshot: Vec<E>,
    frames: Vec<String>,
    options: SyncOptions,
    events_first: bool,
) -> Result<Replay<E>, CliError>
where
    E: Entity + DeserializeOwned + Send + 'static,
    E::Patch: DeserializeOwned + Send,
{
    let collection = SharedCollection::<E>::new(options);
    let notifications = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&notifications);
    let subscription = collection
        .subscribe(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        })
        .await;

    let report = if events_first {
        let report = pump(&collection, frames).await?;
        collection.initialize(snapshot).await;
        report
    } else {
        collection.initialize(snapshot).await;
        pump(&collection, frames).await?
    };

    collection.unsubscribe(&subscription).await;
    Ok(Replay {
        entities: collection.snapshot().await,
        report,
        notifications: notifications.load(Ordering::Relaxed),
    })
}

async fn pump<E>(collection: &SharedCollection<E>, frames: Vec<String>) -> Result<PumpReport, CliError>
where
    E: Entity + DeserializeOwned + Send + 'static,
    E::Patch: DeserializeOwned + Send,
{
    let (sender, receiver) = mpsc::channel(FRAME_BUFFER);
    let handle = collection.spawn_pump(receiver);
    for frame in frames {
        if sender.send(frame).await.is_err() {
            break;
        }
    }
    drop(sender);
    Ok(handle.await?)
}

pub fn format_report(report: &PumpReport, notifications: usize) -> String {
    format!(
        "{} frames: {} applied, {} unchanged, {} queued, {} malformed, {} refused ({} notifications)",
        report.received,
        report.applied,
        report.skipped,
        report.queued,
        report.malformed,
        report.refused,
        notifications
    )
}
