//! Task model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::{nullable, Entity, EntityId, Revision};

/// Task urgency as set by its owner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" | "normal" => Ok(Self::Medium),
            "high" | "urgent" => Ok(Self::High),
            other => Err(format!("unknown priority `{other}`")),
        }
    }
}

/// Board column a task sits in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    #[default]
    Todo,
    #[serde(alias = "in-progress", alias = "in_progress")]
    InProgress,
    #[serde(alias = "completed")]
    Done,
}

impl TaskStatus {
    pub const ALL: [Self; 3] = [Self::Todo, Self::InProgress, Self::Done];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in-progress",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A to-do item on a personal or team board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(alias = "_id")]
    pub id: EntityId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Completion flag toggled from the list view
    #[serde(default, alias = "done")]
    pub completed: bool,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    /// Assigned user, if any
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create an open task with default priority.
    #[must_use]
    pub fn new(id: EntityId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            completed: false,
            status: TaskStatus::Todo,
            priority: Priority::Medium,
            owner: None,
            due_date: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// The list view's checkbox and the board's `done` column both count.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed || self.status == TaskStatus::Done
    }

    /// Open and past its due date.
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.is_complete() && self.due_date.is_some_and(|due| due < now)
    }
}

/// Partial task update; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, alias = "done")]
    pub completed: Option<bool>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "nullable")]
    pub owner: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for Task {
    type Patch = TaskPatch;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn revision(&self) -> Option<Revision> {
        self.updated_at.or(self.created_at)
    }

    fn merge(&mut self, patch: TaskPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(owner) = patch.owner {
            self.owner = owner;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = Some(updated_at);
        }
    }

    fn patch_revision(patch: &TaskPatch) -> Option<Revision> {
        patch.updated_at
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn deserializes_backend_shape() {
        let task: Task = serde_json::from_value(json!({
            "_id": "t1",
            "title": "Write report",
            "done": true,
            "status": "in-progress",
            "priority": "high",
            "dueDate": "2024-05-01T12:00:00Z"
        }))
        .unwrap();

        assert_eq!(task.id.as_str(), "t1");
        assert!(task.completed);
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.priority, Priority::High);
        assert!(task.due_date.is_some());
        assert_eq!(task.owner, None);
    }

    #[test]
    fn merge_only_touches_present_fields() {
        let mut task = Task::new(EntityId::new("t1").unwrap(), "A");
        task.owner = Some("sam".to_string());

        let patch: TaskPatch =
            serde_json::from_value(json!({"priority": "low", "owner": null})).unwrap();
        task.merge(patch);

        assert_eq!(task.title, "A");
        assert_eq!(task.priority, Priority::Low);
        assert_eq!(task.owner, None);
    }

    #[test]
    fn absent_nullable_field_is_not_cleared() {
        let mut task = Task::new(EntityId::new("t1").unwrap(), "A");
        task.owner = Some("sam".to_string());

        let patch: TaskPatch = serde_json::from_value(json!({"title": "B"})).unwrap();
        task.merge(patch);

        assert_eq!(task.owner.as_deref(), Some("sam"));
        assert_eq!(task.title, "B");
    }

    #[test]
    fn overdue_requires_open_task_past_due() {
        let now = "2024-05-02T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let mut task = Task::new(EntityId::new("t1").unwrap(), "A");
        assert!(!task.is_overdue(now));

        task.due_date = Some("2024-05-01T00:00:00Z".parse().unwrap());
        assert!(task.is_overdue(now));

        task.status = TaskStatus::Done;
        assert!(!task.is_overdue(now));
    }

    #[test]
    fn priority_parses_aliases() {
        assert_eq!("Urgent".parse::<Priority>(), Ok(Priority::High));
        assert_eq!("normal".parse::<Priority>(), Ok(Priority::Medium));
        assert!("whenever".parse::<Priority>().is_err());
    }
}
