use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use taskdeck_core::aggregate::{top_assignees, upcoming_meetings, GoalProgress, TaskSummary};
use taskdeck_core::api::{parse_snapshot, ApiClient, ApiResult, Endpoint, SnapshotSource};
use taskdeck_core::models::{Goal, Meeting, Task};
use taskdeck_core::state::{FeedPhase, FeedStatus};

use crate::commands::common::{format_relative_time, load_client_config};
use crate::error::CliError;

const TOP_ASSIGNEES: usize = 3;
const UPCOMING_MEETINGS: usize = 5;

/// Reads snapshots saved as `<resource>.json` files in one directory.
///
/// A missing file is an empty snapshot.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SnapshotSource for DirectorySource {
    fn fetch_snapshot<E>(&self, endpoint: &Endpoint) -> impl Future<Output = ApiResult<Vec<E>>> + Send
    where
        E: DeserializeOwned + Send,
    {
        let path = self.root.join(endpoint.file_name());
        async move {
            match tokio::fs::read_to_string(&path).await {
                Ok(raw) => parse_snapshot(&raw),
                Err(error) if error.kind() == ErrorKind::NotFound => {
                    tracing::warn!("No snapshot at {}; treating it as empty", path.display());
                    Ok(Vec::new())
                }
                Err(error) => Err(error.into()),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignee {
    pub name: String,
    pub open_tasks: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingMeeting {
    pub id: String,
    pub title: String,
    pub starts_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub tasks: TaskSummary,
    pub goals: GoalProgress,
    pub top_assignees: Vec<Assignee>,
    pub upcoming_meetings: Vec<UpcomingMeeting>,
}

pub async fn run_dashboard(
    snapshot_dir: Option<&Path>,
    as_json: bool,
    profile: Option<&str>,
) -> Result<(), CliError> {
    let now = Utc::now();
    let mut status = FeedStatus::default();
    let loaded = if let Some(dir) = snapshot_dir {
        load_dashboard(&DirectorySource::new(dir), now, &mut status).await
    } else {
        let config = load_client_config(profile)?;
        let client = ApiClient::new(config.session()?, config.http_timeout)?;
        load_dashboard(&client, now, &mut status).await
    };
    if let Some(line) = feed_status_line(&status) {
        eprintln!("{line}");
    }
    let dashboard = loaded?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&dashboard)?);
    } else {
        for line in format_dashboard_lines(&dashboard, now) {
            println!("{line}");
        }
    }
    Ok(())
}

/// Build the dashboard and record the outcome on `status`.
pub async fn load_dashboard(
    source: &impl SnapshotSource,
    now: DateTime<Utc>,
    status: &mut FeedStatus,
) -> Result<Dashboard, CliError> {
    status.begin_load();
    match build_dashboard(source, now).await {
        Ok(dashboard) => {
            status.load_succeeded();
            Ok(dashboard)
        }
        Err(error) => {
            status.load_failed(error.to_string());
            Err(error)
        }
    }
}

/// The user-facing note for a failed load, if any.
pub fn feed_status_line(status: &FeedStatus) -> Option<String> {
    match status.phase() {
        FeedPhase::LoadFailed {
            has_data: true,
            message,
        } => Some(format!(
            "Refresh failed ({message}); keeping the last loaded figures. Run again to retry."
        )),
        FeedPhase::LoadFailed { message, .. } => {
            Some(format!("Could not load the dashboard ({message}). Run again to retry."))
        }
        _ => None,
    }
}

pub async fn build_dashboard(
    source: &impl SnapshotSource,
    now: DateTime<Utc>,
) -> Result<Dashboard, CliError> {
    let tasks = source.fetch_snapshot::<Task>(&Endpoint::Tasks).await?;
    let goals = source.fetch_snapshot::<Goal>(&Endpoint::Goals).await?;
    let meetings = source.fetch_snapshot::<Meeting>(&Endpoint::Meetings).await?;

    Ok(Dashboard {
        tasks: TaskSummary::from_tasks(&tasks, now),
        goals: GoalProgress::from_goals(&goals),
        top_assignees: top_assignees(&tasks, TOP_ASSIGNEES)
            .into_iter()
            .map(|(name, open_tasks)| Assignee { name, open_tasks })
            .collect(),
        upcoming_meetings: upcoming_meetings(&meetings, now, UPCOMING_MEETINGS)
            .into_iter()
            .map(|meeting| UpcomingMeeting {
                id: meeting.id.to_string(),
                title: meeting.title.clone(),
                starts_at: meeting.starts_at,
            })
            .collect(),
    })
}

pub fn format_dashboard_lines(dashboard: &Dashboard, now: DateTime<Utc>) -> Vec<String> {
    let tasks = &dashboard.tasks;
    let mut lines = vec![
        format!(
            "Tasks: {} total, {} open, {} done ({}%), {} overdue",
            tasks.total, tasks.open, tasks.completed, tasks.completion_percent, tasks.overdue
        ),
        format!(
            "  by priority: {}",
            tasks
                .by_priority
                .iter()
                .map(|(priority, count)| format!("{priority} {count}"))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        format!(
            "Goals: {} total, {} complete, {}% average progress",
            dashboard.goals.total, dashboard.goals.completed, dashboard.goals.average_percent
        ),
    ];

    if !dashboard.top_assignees.is_empty() {
        lines.push("Busiest owners:".to_string());
        for assignee in &dashboard.top_assignees {
            lines.push(format!("  {}  {} open", assignee.name, assignee.open_tasks));
        }
    }

    if dashboard.upcoming_meetings.is_empty() {
        lines.push("No upcoming meetings".to_string());
    } else {
        lines.push("Upcoming meetings:".to_string());
        for meeting in &dashboard.upcoming_meetings {
            lines.push(format!(
                "  {}  {}",
                meeting.title,
                format_relative_time(meeting.starts_at, now)
            ));
        }
    }

    lines
}
