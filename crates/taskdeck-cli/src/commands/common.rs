use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use taskdeck_core::api::parse_snapshot;
use taskdeck_core::config::{ClientConfig, API_URL_VAR, INSERTION_VAR};
use taskdeck_core::models::{Entity, Goal, Meeting, Message, Post, Record, Task};
use taskdeck_core::util::truncate_chars;

use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;

const PREVIEW_CHARS: usize = 60;

/// One-line terminal rendering of an entity.
pub trait Describe {
    fn describe(&self, now: DateTime<Utc>) -> String;
}

impl Describe for Task {
    fn describe(&self, now: DateTime<Utc>) -> String {
        let mark = if self.is_complete() { "x" } else { " " };
        let mut line = format!("[{mark}] {}  {}  ({})", self.id, self.title, self.priority);
        if let Some(owner) = &self.owner {
            line.push_str(&format!("  @{owner}"));
        }
        if let Some(due) = self.due_date {
            let label = if self.is_overdue(now) { "overdue" } else { "due" };
            line.push_str(&format!("  {label} {}", format_relative_time(due, now)));
        }
        line
    }
}

impl Describe for Goal {
    fn describe(&self, _now: DateTime<Utc>) -> String {
        format!("{}  {}  {}%", self.id, self.title, self.effective_progress())
    }
}

impl Describe for Meeting {
    fn describe(&self, now: DateTime<Utc>) -> String {
        let mut line = format!(
            "{}  {}  {}",
            self.id,
            self.title,
            format_relative_time(self.starts_at, now)
        );
        if self.cancelled {
            line.push_str("  (cancelled)");
        }
        if !self.participants.is_empty() {
            line.push_str(&format!("  [{}]", self.participants.join(", ")));
        }
        line
    }
}

impl Describe for Message {
    fn describe(&self, now: DateTime<Utc>) -> String {
        let when = self
            .created_at
            .map(|created| format!("  {}", format_relative_time(created, now)))
            .unwrap_or_default();
        format!(
            "{}  {}: {}{when}",
            self.id,
            self.sender,
            preview(&self.body)
        )
    }
}

impl Describe for Post {
    fn describe(&self, _now: DateTime<Utc>) -> String {
        format!(
            "{}  {}: {}  ({} likes, {} comments)",
            self.id,
            self.author,
            preview(&self.body),
            self.likes,
            self.comment_count
        )
    }
}

impl Describe for Record {
    fn describe(&self, _now: DateTime<Utc>) -> String {
        let fields = Value::Object(self.fields().clone());
        format!("{}  {}", self.id(), preview(&fields.to_string()))
    }
}

pub fn print_entities<E: Describe + Serialize>(entities: &[E], as_json: bool) -> Result<(), CliError> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(entities)?);
    } else {
        let now = Utc::now();
        for entity in entities {
            println!("{}", entity.describe(now));
        }
    }
    Ok(())
}

pub fn preview(text: &str) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() > PREVIEW_CHARS {
        format!("{}...", truncate_chars(&single_line, PREVIEW_CHARS - 3))
    } else {
        single_line
    }
}

/// "in 2h" for future instants, "3d ago" for past ones.
pub fn format_relative_time(target: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff_ms = target.timestamp_millis() - now.timestamp_millis();
    let span = diff_ms.unsigned_abs();
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if span < minute {
        return "just now".to_string();
    }
    let amount = if span < hour {
        format!("{}m", span / minute)
    } else if span < day {
        format!("{}h", span / hour)
    } else if span < week {
        format!("{}d", span / day)
    } else if span < month {
        format!("{}w", span / week)
    } else if span < year {
        format!("{}mo", span / month)
    } else {
        format!("{}y", span / year)
    };

    if diff_ms > 0 {
        format!("in {amount}")
    } else {
        format!("{amount} ago")
    }
}

pub fn read_snapshot_file<E: DeserializeOwned>(path: &Path) -> Result<Vec<E>, CliError> {
    let raw = read_file(path)?;
    Ok(parse_snapshot(&raw)?)
}

/// Non-blank lines of a newline-delimited event log.
pub fn read_frames(path: &Path) -> Result<Vec<String>, CliError> {
    let raw = read_file(path)?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

fn read_file(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::ReadFile {
        path: path.display().to_string(),
        source,
    })
}

/// Resolve the profile named on the command line (or the active one).
pub fn load_profile(explicit: Option<&str>) -> Result<(String, CliProfile), CliError> {
    let config = CliProfilesConfig::load()?;
    let name = config.resolve_profile_name(explicit);
    let profile = config.profile(&name).cloned().unwrap_or_default();
    Ok((name, profile))
}

/// Environment values win; the profile fills in what the environment leaves unset.
pub fn resolve_client_config(
    env: &HashMap<String, String>,
    profile: &CliProfile,
) -> Result<ClientConfig, CliError> {
    let profile_api_url = profile.api_base_url();
    let profile_insertion = profile.insertion.map(|policy| policy.as_str().to_string());

    Ok(ClientConfig::from_lookup(|name| {
        env.get(name).cloned().or_else(|| match name {
            API_URL_VAR => profile_api_url.clone(),
            INSERTION_VAR => profile_insertion.clone(),
            _ => None,
        })
    })?)
}

pub fn load_client_config(explicit_profile: Option<&str>) -> Result<ClientConfig, CliError> {
    let (name, profile) = load_profile(explicit_profile)?;
    let env: HashMap<String, String> = std::env::vars().collect();
    let config = resolve_client_config(&env, &profile)?;
    tracing::debug!(profile = %name, ?config, "Resolved client configuration");
    Ok(config)
}
