use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use pretty_assertions::assert_eq;
use serde_json::json;
use taskdeck_core::config::ClientConfig;
use taskdeck_core::models::{Entity, EntityId, Record, Task};
use taskdeck_core::state::{FeedPhase, FeedStatus};
use taskdeck_core::sync::{InsertionPolicy, PumpReport, SyncOptions};

use crate::cli::{Cli, Commands, CompletionShell, EntityKind, InsertionArg};
use crate::commands::common::{
    format_relative_time, read_frames, read_snapshot_file, resolve_client_config, Describe,
};
use crate::commands::completions::render_completions;
use crate::commands::config::{apply_profile_init, format_config_lines};
use crate::commands::dashboard::{
    build_dashboard, feed_status_line, format_dashboard_lines, load_dashboard, DirectorySource,
};
use crate::commands::fetch::run_fetch;
use crate::commands::replay::{format_report, replay, replay_options};
use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;

fn now() -> DateTime<Utc> {
    "2024-05-01T12:00:00Z".parse().unwrap()
}

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn replay_flags_parse() {
    let cli = Cli::try_parse_from([
        "taskdeck",
        "replay",
        "--snapshot",
        "tasks.json",
        "--events",
        "events.ndjson",
        "--kind",
        "task",
        "--insertion",
        "surface",
        "--queue-early",
    ])
    .unwrap();

    let Commands::Replay {
        kind,
        insertion,
        queue_early,
        reject_stale,
        ..
    } = cli.command
    else {
        panic!("expected replay command");
    };
    assert_eq!(kind, EntityKind::Task);
    assert_eq!(insertion, Some(InsertionArg::Surface));
    assert!(queue_early);
    assert!(!reject_stale);
    assert_eq!(
        InsertionPolicy::from(InsertionArg::Surface),
        InsertionPolicy::Surface
    );
}

#[tokio::test]
async fn replay_reconciles_snapshot_and_event_log() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = write(
        dir.path(),
        "snapshot.json",
        r#"[{"id":"1","title":"A","done":false}]"#,
    );
    let events = write(
        dir.path(),
        "events.ndjson",
        concat!(
            r#"{"type":"create","payload":{"id":"2","title":"B","done":false}}"#,
            "\n\n",
            r#"{"type":"update","id":"1","payload":{"done":true}}"#,
            "\n",
            r#"{"type":"delete","id":"2"}"#,
            "\n",
            r#"{"type":"update","payload":{"done":false}}"#,
            "\n",
            r#"{"type":"delete","id":"2"}"#,
            "\n",
        ),
    );

    let result = replay(
        read_snapshot_file::<Record>(&snapshot).unwrap(),
        read_frames(&events).unwrap(),
        SyncOptions::default(),
        false,
    )
    .await
    .unwrap();

    let values: Vec<_> = result.entities.iter().map(Record::to_value).collect();
    assert_eq!(values, vec![json!({"id": "1", "title": "A", "done": true})]);
    assert_eq!(
        result.report,
        PumpReport {
            received: 5,
            applied: 3,
            skipped: 1,
            queued: 0,
            malformed: 1,
            refused: 0,
        }
    );
    assert_eq!(result.notifications, 4);
}

#[tokio::test]
async fn early_events_are_queued_or_refused() {
    let snapshot = vec![Task::new(EntityId::new("t1").unwrap(), "Plan")];
    let frames = vec![
        r#"{"type":"update","id":"t1","payload":{"done":true}}"#.to_string(),
        r#"{"type":"create","payload":{"_id":"t2","title":"Ship"}}"#.to_string(),
    ];

    let queued = replay(
        snapshot.clone(),
        frames.clone(),
        SyncOptions::default().queue_before_ready(8),
        true,
    )
    .await
    .unwrap();
    assert_eq!(queued.report.queued, 2);
    assert_eq!(queued.notifications, 1);
    let ids: Vec<&str> = queued.entities.iter().map(|task| task.id().as_str()).collect();
    assert_eq!(ids, vec!["t1", "t2"]);
    assert!(queued.entities[0].completed);

    let refused = replay(snapshot, frames, SyncOptions::default(), true)
        .await
        .unwrap();
    assert_eq!(refused.report.refused, 2);
    assert_eq!(refused.entities.len(), 1);
    assert!(!refused.entities[0].completed);
}

#[tokio::test]
async fn environment_sync_settings_reach_replay() {
    let mut snapshot = Task::new(EntityId::new("t1").unwrap(), "Current");
    snapshot.updated_at = Some(now());
    let older = (now() - Duration::hours(1)).to_rfc3339();
    let frames = vec![json!({
        "type": "update",
        "id": "t1",
        "payload": {"title": "Outdated", "updatedAt": older},
    })
    .to_string()];

    let env = HashMap::from([("TASKDECK_REJECT_STALE".to_string(), "true".to_string())]);
    let configured = resolve_client_config(&env, &CliProfile::default()).unwrap();
    let options = replay_options(configured.sync, None, false, false);
    let guarded = replay(vec![snapshot.clone()], frames.clone(), options, false)
        .await
        .unwrap();
    assert_eq!(guarded.report.skipped, 1);
    assert_eq!(guarded.entities[0].title, "Current");

    let unconfigured = resolve_client_config(&HashMap::new(), &CliProfile::default()).unwrap();
    let options = replay_options(unconfigured.sync, None, false, false);
    let last_arrival = replay(vec![snapshot], frames, options, false)
        .await
        .unwrap();
    assert_eq!(last_arrival.report.applied, 1);
    assert_eq!(last_arrival.entities[0].title, "Outdated");
}

#[test]
fn replay_flags_layer_over_configured_options() {
    let env = HashMap::from([
        ("TASKDECK_INSERTION".to_string(), "prepend".to_string()),
        ("TASKDECK_BEFORE_READY".to_string(), "queue".to_string()),
    ]);
    let configured = resolve_client_config(&env, &CliProfile::default()).unwrap().sync;

    let untouched = replay_options(configured, None, false, false);
    assert_eq!(untouched, configured);

    let flagged = replay_options(configured, Some(InsertionPolicy::Surface), true, true);
    assert_eq!(
        flagged,
        configured
            .with_insertion(InsertionPolicy::Surface)
            .reject_stale()
    );
}

#[test]
fn report_line_lists_every_counter() {
    let report = PumpReport {
        received: 6,
        applied: 3,
        skipped: 1,
        queued: 0,
        malformed: 2,
        refused: 0,
    };
    assert_eq!(
        format_report(&report, 4),
        "6 frames: 3 applied, 1 unchanged, 0 queued, 2 malformed, 0 refused (4 notifications)"
    );
}

#[test]
fn missing_snapshot_file_names_the_path() {
    let error = read_snapshot_file::<Record>(Path::new("/definitely/not/here.json")).unwrap_err();
    assert!(matches!(error, CliError::ReadFile { .. }));
    assert!(error.to_string().contains("/definitely/not/here.json"));
}

#[tokio::test]
async fn dashboard_reads_snapshot_directory() {
    let dir = tempfile::tempdir().unwrap();
    let overdue = (now() - Duration::days(2)).to_rfc3339();
    let soon = (now() + Duration::hours(3)).to_rfc3339();
    write(
        dir.path(),
        "tasks.json",
        &json!([
            {"_id": "t1", "title": "Plan", "owner": "ana", "dueDate": overdue},
            {"_id": "t2", "title": "Ship", "owner": "bo", "priority": "high"},
            {"_id": "t3", "title": "Done", "owner": "bo", "completed": true},
        ])
        .to_string(),
    );
    write(
        dir.path(),
        "meetings.json",
        &json!({"data": [{"_id": "m1", "title": "Standup", "startsAt": soon}]}).to_string(),
    );

    let dashboard = build_dashboard(&DirectorySource::new(dir.path()), now())
        .await
        .unwrap();

    assert_eq!(dashboard.tasks.total, 3);
    assert_eq!(dashboard.tasks.overdue, 1);
    assert_eq!(dashboard.tasks.completion_percent, 33);
    assert_eq!(dashboard.goals.total, 0);
    assert_eq!(dashboard.top_assignees[0].name, "ana");
    assert_eq!(dashboard.upcoming_meetings[0].title, "Standup");

    let lines = format_dashboard_lines(&dashboard, now());
    assert_eq!(
        lines[0],
        "Tasks: 3 total, 2 open, 1 done (33%), 1 overdue"
    );
    assert!(lines.iter().any(|line| line == "  Standup  in 3h"));
}

#[tokio::test]
async fn failed_dashboard_reload_keeps_prior_data() {
    let dir = tempfile::tempdir().unwrap();
    let source = DirectorySource::new(dir.path());

    write(dir.path(), "tasks.json", "{not json");
    let mut fresh = FeedStatus::default();
    assert!(load_dashboard(&source, now(), &mut fresh).await.is_err());
    assert!(matches!(
        fresh.phase(),
        FeedPhase::LoadFailed { has_data: false, .. }
    ));
    assert!(feed_status_line(&fresh)
        .unwrap()
        .starts_with("Could not load the dashboard"));

    let mut status = FeedStatus::default();
    write(dir.path(), "tasks.json", r#"[{"_id": "t1", "title": "Plan"}]"#);
    load_dashboard(&source, now(), &mut status).await.unwrap();
    assert!(status.is_live());
    assert_eq!(feed_status_line(&status), None);

    write(dir.path(), "tasks.json", "{not json");
    assert!(load_dashboard(&source, now(), &mut status).await.is_err());
    assert!(matches!(
        status.phase(),
        FeedPhase::LoadFailed { has_data: true, .. }
    ));
    assert!(feed_status_line(&status)
        .unwrap()
        .contains("keeping the last loaded figures"));
}

#[test]
fn relative_time_covers_past_and_future() {
    assert_eq!(format_relative_time(now(), now()), "just now");
    assert_eq!(
        format_relative_time(now() + Duration::minutes(5), now()),
        "in 5m"
    );
    assert_eq!(format_relative_time(now() - Duration::days(3), now()), "3d ago");
    assert_eq!(
        format_relative_time(now() - Duration::days(400), now()),
        "1y ago"
    );
}

#[test]
fn task_line_shows_state_owner_and_due() {
    let mut task = Task::new(EntityId::new("t1").unwrap(), "Plan sprint");
    task.owner = Some("ana".to_string());
    task.due_date = Some(now() - Duration::hours(2));

    assert_eq!(
        task.describe(now()),
        "[ ] t1  Plan sprint  (medium)  @ana  overdue 2h ago"
    );
}

#[test]
fn environment_overrides_profile_values() {
    let profile = CliProfile {
        api_base_url: Some("https://profile.example.com".to_string()),
        insertion: Some(InsertionPolicy::Prepend),
    };

    let from_profile = resolve_client_config(&HashMap::new(), &profile).unwrap();
    assert_eq!(
        from_profile.api_url.as_deref(),
        Some("https://profile.example.com")
    );
    assert_eq!(from_profile.sync.insertion, InsertionPolicy::Prepend);

    let env = HashMap::from([(
        "TASKDECK_API_URL".to_string(),
        "https://env.example.com/".to_string(),
    )]);
    let from_env = resolve_client_config(&env, &profile).unwrap();
    assert_eq!(from_env.api_url.as_deref(), Some("https://env.example.com"));
}

#[test]
fn profile_init_validates_and_activates() {
    let mut config = CliProfilesConfig::default();
    let error = apply_profile_init(
        &mut config,
        "work",
        Some("api.example.com".to_string()),
        None,
        None,
        false,
    )
    .unwrap_err();
    assert!(error.to_string().contains("http://"));

    apply_profile_init(
        &mut config,
        "work",
        None,
        Some("https://env.example.com/".to_string()),
        Some(InsertionPolicy::Surface),
        false,
    )
    .unwrap();
    assert_eq!(config.active_profile.as_deref(), Some("work"));
    assert_eq!(config.version, 1);
    let profile = config.profile("work").unwrap();
    assert_eq!(profile.api_base_url.as_deref(), Some("https://env.example.com"));
    assert_eq!(profile.insertion, Some(InsertionPolicy::Surface));
}

#[test]
fn config_lines_redact_token() {
    let config = ClientConfig {
        access_token: Some("sensitive".to_string()),
        ..ClientConfig::default()
    };
    let lines = format_config_lines("default", false, &config);
    assert_eq!(lines[0], "profile: default (not saved)");
    assert!(lines.iter().all(|line| !line.contains("sensitive")));
    assert!(lines.contains(&"access_token: [REDACTED]".to_string()));
}

#[tokio::test]
async fn fetch_rejects_unknown_resource_before_network() {
    let error = run_fetch("invoices", false, None).await.unwrap_err();
    assert!(matches!(error, CliError::InvalidResource(_)));
}

#[test]
fn completions_mention_binary_name() {
    let script = String::from_utf8(render_completions(CompletionShell::Bash)).unwrap();
    assert!(script.contains("taskdeck"));
    assert!(script.contains("replay"));
}
