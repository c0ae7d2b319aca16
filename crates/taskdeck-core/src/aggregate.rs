//! Dashboard figures derived from collection snapshots.
//!
//! Everything here is a pure function of a slice, so views recompute it on
//! each change notification instead of keeping counters in step with events.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Goal, Meeting, Message, Post, Priority, Task, TaskStatus};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub total: usize,
    pub completed: usize,
    pub open: usize,
    /// Open tasks whose due date has passed.
    pub overdue: usize,
    pub by_priority: BTreeMap<Priority, usize>,
    pub by_status: BTreeMap<TaskStatus, usize>,
    /// Whole percent of tasks completed; 0 when there are no tasks.
    pub completion_percent: u8,
}

impl TaskSummary {
    #[must_use]
    pub fn from_tasks(tasks: &[Task], now: DateTime<Utc>) -> Self {
        let mut summary = Self {
            total: tasks.len(),
            ..Self::default()
        };

        for task in tasks {
            if task.is_complete() {
                summary.completed += 1;
            } else if task.is_overdue(now) {
                summary.overdue += 1;
            }
            *summary.by_priority.entry(task.priority).or_default() += 1;
            *summary.by_status.entry(task.status).or_default() += 1;
        }

        summary.open = summary.total - summary.completed;
        summary.completion_percent = percent(summary.completed, summary.total);
        summary
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgress {
    pub total: usize,
    pub completed: usize,
    /// Mean of each goal's effective progress, rounded to a whole percent.
    pub average_percent: u8,
}

impl GoalProgress {
    #[must_use]
    pub fn from_goals(goals: &[Goal]) -> Self {
        if goals.is_empty() {
            return Self::default();
        }

        let completed = goals
            .iter()
            .filter(|goal| goal.effective_progress() == 100)
            .count();
        let sum: usize = goals
            .iter()
            .map(|goal| usize::from(goal.effective_progress()))
            .sum();
        let average = (sum + goals.len() / 2) / goals.len();

        Self {
            total: goals.len(),
            completed,
            average_percent: u8::try_from(average).unwrap_or(100),
        }
    }
}

/// Owners with the most open tasks, busiest first, ties broken by name.
#[must_use]
pub fn top_assignees(tasks: &[Task], limit: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for task in tasks.iter().filter(|task| !task.is_complete()) {
        if let Some(owner) = task.owner.as_deref() {
            *counts.entry(owner).or_default() += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(owner, count)| (owner.to_string(), count))
        .collect();
    ranked.sort_by(|left, right| right.1.cmp(&left.1).then_with(|| left.0.cmp(&right.0)));
    ranked.truncate(limit);
    ranked
}

/// The next `limit` meetings that start at or after `now`, earliest first.
///
/// Cancelled meetings are skipped.
#[must_use]
pub fn upcoming_meetings(meetings: &[Meeting], now: DateTime<Utc>, limit: usize) -> Vec<&Meeting> {
    let mut upcoming: Vec<&Meeting> = meetings
        .iter()
        .filter(|meeting| !meeting.cancelled && meeting.starts_at >= now)
        .collect();
    upcoming.sort_by(|left, right| {
        left.starts_at
            .cmp(&right.starts_at)
            .then_with(|| left.id.cmp(&right.id))
    });
    upcoming.truncate(limit);
    upcoming
}

#[must_use]
pub fn unread_messages(messages: &[Message], reader: &str) -> usize {
    messages
        .iter()
        .filter(|message| message.is_unread_by(reader))
        .count()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedDigest<'a> {
    pub posts: usize,
    pub total_likes: u64,
    /// Earliest in feed order wins a tie.
    pub most_liked: Option<&'a Post>,
}

impl<'a> FeedDigest<'a> {
    #[must_use]
    pub fn from_posts(posts: &'a [Post]) -> Self {
        let most_liked = posts.iter().fold(None::<&Post>, |best, post| match best {
            Some(best) if best.likes >= post.likes => Some(best),
            _ => Some(post),
        });

        Self {
            posts: posts.len(),
            total_likes: posts.iter().map(|post| u64::from(post.likes)).sum(),
            most_liked,
        }
    }
}

fn percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    let rounded = (part * 100 + whole / 2) / whole;
    u8::try_from(rounded).unwrap_or(100)
}
