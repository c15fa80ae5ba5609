use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_COLOR: &str = "#3b82f6";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub todo_count: Option<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Todo {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub description: String,
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

impl Todo {
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.due_date.is_some_and(|due| due < now)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub todo_id: i64,
    pub content: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoStats {
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
    pub high_priority: i64,
    pub overdue: i64,
}

impl TodoStats {
    pub fn collect<'a>(todos: impl IntoIterator<Item = &'a Todo>, now: DateTime<Utc>) -> Self {
        let mut stats = Self::default();
        for todo in todos {
            stats.total += 1;
            if todo.completed {
                stats.completed += 1;
                continue;
            }
            stats.pending += 1;
            if todo.priority == Priority::High {
                stats.high_priority += 1;
            }
            if todo.is_overdue(now) {
                stats.overdue += 1;
            }
        }
        stats
    }
}

#[derive(Deserialize)]
pub struct CreateProject {
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: String,
}

#[derive(Deserialize)]
pub struct UpdateProject {
    pub slug: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateTodo {
    pub project_id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub priority: Option<Priority>,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub author: String,
}

#[derive(Deserialize)]
pub struct UpdateTodo {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub due_date: Option<DateTime<Utc>>,
}

impl UpdateTodo {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.completed.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
    }
}

/// The todo id comes from the path; a body `todo_id` is accepted and ignored.
#[derive(Deserialize)]
pub struct CreateComment {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: String,
}

/// Raw list parameters. Unparseable values are ignored rather than rejected.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub project_id: Option<String>,
    pub completed: Option<String>,
    pub priority: Option<String>,
    pub author: Option<String>,
    pub search: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn todo(completed: bool, priority: Priority, due: Option<DateTime<Utc>>) -> Todo {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Todo {
            id: 1,
            project_id: 1,
            title: "t".to_string(),
            description: String::new(),
            completed,
            priority,
            due_date: due,
            created_at: at,
            updated_at: at,
            author: "a".to_string(),
            project: None,
            comments: None,
        }
    }

    #[test]
    fn stats_count_only_pending_for_high_and_overdue() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let past = Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        let todos = [
            todo(false, Priority::High, past),
            todo(true, Priority::High, past),
            todo(false, Priority::Low, None),
        ];
        let stats = TodoStats::collect(&todos, now);
        assert_eq!(
            stats,
            TodoStats {
                total: 3,
                completed: 1,
                pending: 2,
                high_priority: 1,
                overdue: 1,
            }
        );
    }

    #[test]
    fn create_todo_defaults_optional_fields() {
        let input: CreateTodo =
            serde_json::from_str(r#"{"project_id":1,"title":"Buy milk","author":"Ann"}"#).unwrap();
        assert!(input.priority.is_none());
        assert!(input.due_date.is_none());
        assert_eq!(input.description, "");
    }

    #[test]
    fn create_todo_rejects_unknown_priority() {
        let result: Result<CreateTodo, _> =
            serde_json::from_str(r#"{"project_id":1,"title":"x","author":"a","priority":"urgent"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn update_todo_all_fields_optional() {
        let input: UpdateTodo = serde_json::from_str("{}").unwrap();
        assert!(input.is_empty());
        let input: UpdateTodo = serde_json::from_str(r#"{"completed":false}"#).unwrap();
        assert!(!input.is_empty());
    }

    #[test]
    fn zero_todo_count_is_omitted() {
        let project = Project {
            id: 1,
            slug: "home".to_string(),
            name: "Home".to_string(),
            description: String::new(),
            color: DEFAULT_COLOR.to_string(),
            created_at: Utc::now(),
            todo_count: None,
        };
        let json = serde_json::to_value(&project).unwrap();
        assert!(json.get("todo_count").is_none());
    }
}
