//! Wire-level DTOs for the todo API.
//!
//! # Design
//! These types mirror the server schema but are defined independently of the
//! mock-server crate; integration tests catch drift between the two. Optional
//! request fields are skipped when absent so partial updates never send
//! `null`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A named grouping of todos, addressed by its unique slug.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub id: i64,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub todo_count: Option<i64>,
}

impl Project {
    /// The server omits `todo_count` when it is zero.
    pub fn todo_count_or_zero(&self) -> i64 {
        self.todo_count.unwrap_or(0)
    }
}

/// Todo priority. Ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Priority::Low => "Low Priority",
            Priority::Medium => "Medium Priority",
            Priority::High => "High Priority",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown priority `{0}` (expected low, medium or high)")]
pub struct UnknownPriority(pub String);

impl FromStr for Priority {
    type Err = UnknownPriority;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(UnknownPriority(other.to_string())),
        }
    }
}

/// A single task record owned by a project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<Project>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<Comment>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub id: i64,
    pub todo_id: i64,
    pub content: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

/// Server-computed aggregate counts over todos, optionally scoped to a
/// project.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodoStats {
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
    pub high_priority: i64,
    pub overdue: i64,
}

impl TodoStats {
    /// `completed + pending == total`.
    pub fn is_consistent(&self) -> bool {
        self.completed + self.pending == self.total
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateProjectRequest {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: String,
}

/// Partial project update. Only present fields are sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateProjectRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateTodoRequest {
    pub project_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub author: String,
}

/// Partial todo update. Only present fields are sent; omitted fields remain
/// unchanged on the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateTodoRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
}

impl UpdateTodoRequest {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateCommentRequest {
    pub todo_id: i64,
    pub content: String,
    pub author: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_uses_lowercase_wire_names() {
        assert_eq!(serde_json::to_value(Priority::High).unwrap(), "high");
        let p: Priority = serde_json::from_str(r#""low""#).unwrap();
        assert_eq!(p, Priority::Low);
        assert!(serde_json::from_str::<Priority>(r#""urgent""#).is_err());
    }

    #[test]
    fn priority_orders_low_to_high() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::Medium < Priority::High);
        assert_eq!("medium".parse::<Priority>().unwrap(), Priority::Medium);
        assert!("HIGH".parse::<Priority>().is_err());
    }

    #[test]
    fn unknown_priority_is_a_std_error() {
        let err: Box<dyn std::error::Error + Send + Sync> =
            Box::new("urgent".parse::<Priority>().unwrap_err());
        assert_eq!(
            err.to_string(),
            "unknown priority `urgent` (expected low, medium or high)"
        );
    }

    #[test]
    fn update_todo_omits_absent_fields() {
        let input = UpdateTodoRequest {
            completed: Some(true),
            ..Default::default()
        };
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json, serde_json::json!({ "completed": true }));
        assert!(UpdateTodoRequest::default().is_empty());
        assert!(!input.is_empty());
    }

    #[test]
    fn create_todo_omits_missing_due_date() {
        let input = CreateTodoRequest {
            project_id: 1,
            title: "Buy milk".to_string(),
            description: String::new(),
            priority: Priority::Low,
            due_date: None,
            author: "Ann".to_string(),
        };
        let json = serde_json::to_value(&input).unwrap();
        assert!(json.get("due_date").is_none());
        assert_eq!(json["priority"], "low");
    }

    #[test]
    fn todo_parses_without_optional_fields() {
        let raw = r#"{
            "id": 7, "project_id": 1, "title": "Walk dog", "description": "",
            "completed": false, "priority": "medium",
            "created_at": "2024-05-01T10:00:00Z", "updated_at": "2024-05-01T10:00:00Z",
            "author": "Ann"
        }"#;
        let todo: Todo = serde_json::from_str(raw).unwrap();
        assert_eq!(todo.id, 7);
        assert!(todo.due_date.is_none());
        assert!(todo.project.is_none());
        assert!(todo.comments.is_none());
    }

    #[test]
    fn project_todo_count_defaults_to_zero() {
        let raw = r##"{"id":1,"slug":"home","name":"Home","description":"","color":"#3b82f6","created_at":"2024-05-01T10:00:00Z"}"##;
        let project: Project = serde_json::from_str(raw).unwrap();
        assert_eq!(project.todo_count, None);
        assert_eq!(project.todo_count_or_zero(), 0);
    }

    #[test]
    fn stats_consistency() {
        let stats = TodoStats {
            total: 3,
            completed: 1,
            pending: 2,
            high_priority: 1,
            overdue: 0,
        };
        assert!(stats.is_consistent());
        assert!(!TodoStats { pending: 1, ..stats }.is_consistent());
    }
}
