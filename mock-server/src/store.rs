//! In-memory state behind the mock API.
//!
//! Plain synchronous data; the router wraps it in `Arc<RwLock<_>>`. Every
//! method that stamps time takes `now` so tests can pin the clock.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};

use crate::models::{
    Comment, CreateComment, CreateProject, CreateTodo, ListParams, Priority, Project, Todo,
    TodoStats, UpdateProject, UpdateTodo, DEFAULT_COLOR,
};

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    pub status: StatusCode,
    pub message: &'static str,
}

impl StoreError {
    fn bad_request(message: &'static str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message,
        }
    }

    fn not_found(message: &'static str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message,
        }
    }

    fn conflict(message: &'static str) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message,
        }
    }
}

const PROJECT_NOT_FOUND: &str = "Project not found";
const TODO_NOT_FOUND: &str = "Todo not found";
const COMMENT_NOT_FOUND: &str = "Comment not found";
const NO_FIELDS: &str = "No fields to update";

/// Parsed list parameters with server defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoQuery {
    pub project_id: Option<i64>,
    pub completed: Option<bool>,
    pub priority: Option<String>,
    pub author: Option<String>,
    pub search: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for TodoQuery {
    fn default() -> Self {
        Self {
            project_id: None,
            completed: None,
            priority: None,
            author: None,
            search: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl From<ListParams> for TodoQuery {
    fn from(params: ListParams) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
        Self {
            project_id: params.project_id.and_then(|v| v.parse().ok()),
            completed: params.completed.and_then(|v| v.parse().ok()),
            priority: non_empty(params.priority),
            author: non_empty(params.author),
            search: non_empty(params.search),
            limit: params
                .limit
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|l| (1..=MAX_LIMIT).contains(l))
                .unwrap_or(DEFAULT_LIMIT),
            offset: params
                .offset
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(0),
        }
    }
}

impl TodoQuery {
    fn matches(&self, todo: &Todo) -> bool {
        if self.project_id.is_some_and(|id| id != todo.project_id) {
            return false;
        }
        if self.completed.is_some_and(|c| c != todo.completed) {
            return false;
        }
        if let Some(priority) = &self.priority {
            if priority != priority_name(todo.priority) {
                return false;
            }
        }
        if let Some(author) = &self.author {
            if author != &todo.author {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !todo.title.to_lowercase().contains(&needle)
                && !todo.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

fn priority_name(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "low",
        Priority::Medium => "medium",
        Priority::High => "high",
    }
}

#[derive(Debug, Default)]
pub struct Store {
    projects: BTreeMap<i64, Project>,
    todos: BTreeMap<i64, Todo>,
    comments: BTreeMap<i64, Comment>,
    last_id: i64,
}

impl Store {
    /// A store holding one "General" project with id 1, which is what a new
    /// todo form points at by default.
    pub fn with_default_project(now: DateTime<Utc>) -> Self {
        let mut store = Self::default();
        let input = CreateProject {
            slug: "general".to_string(),
            name: "General".to_string(),
            description: "Default project".to_string(),
            color: String::new(),
        };
        store
            .create_project(input, now)
            .expect("empty store accepts the default project");
        store
    }

    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn project_by_slug(&self, slug: &str) -> Result<&Project, StoreError> {
        self.projects
            .values()
            .find(|p| p.slug == slug)
            .ok_or(StoreError::not_found(PROJECT_NOT_FOUND))
    }

    fn todo_mut(&mut self, id: i64) -> Result<&mut Todo, StoreError> {
        self.todos
            .get_mut(&id)
            .ok_or(StoreError::not_found(TODO_NOT_FOUND))
    }

    // --- projects ---

    /// Newest first, each with its todo count.
    pub fn list_projects(&self) -> Vec<Project> {
        let mut projects: Vec<Project> = self
            .projects
            .values()
            .map(|p| {
                let count = self.todos.values().filter(|t| t.project_id == p.id).count() as i64;
                Project {
                    todo_count: (count > 0).then_some(count),
                    ..p.clone()
                }
            })
            .collect();
        projects.sort_by_key(|p| Reverse((p.created_at, p.id)));
        projects
    }

    pub fn create_project(&mut self, input: CreateProject, now: DateTime<Utc>) -> Result<Project, StoreError> {
        if input.slug.is_empty() || input.name.is_empty() {
            return Err(StoreError::bad_request("Slug and name are required"));
        }
        if self.project_by_slug(&input.slug).is_ok() {
            return Err(StoreError::conflict("Project with this slug already exists"));
        }
        let project = Project {
            id: self.next_id(),
            slug: input.slug,
            name: input.name,
            description: input.description,
            color: if input.color.is_empty() {
                DEFAULT_COLOR.to_string()
            } else {
                input.color
            },
            created_at: now,
            todo_count: None,
        };
        self.projects.insert(project.id, project.clone());
        Ok(project)
    }

    pub fn project(&self, slug: &str) -> Result<Project, StoreError> {
        self.project_by_slug(slug).cloned()
    }

    pub fn update_project(&mut self, slug: &str, input: UpdateProject) -> Result<(), StoreError> {
        let id = self.project_by_slug(slug)?.id;
        if input.slug.is_none() && input.name.is_none() && input.description.is_none() && input.color.is_none() {
            return Err(StoreError::bad_request(NO_FIELDS));
        }
        if let Some(new_slug) = &input.slug {
            if new_slug.is_empty() {
                return Err(StoreError::bad_request("Slug and name are required"));
            }
            if self.projects.values().any(|p| &p.slug == new_slug && p.id != id) {
                return Err(StoreError::conflict("Project with this slug already exists"));
            }
        }
        let Some(project) = self.projects.get_mut(&id) else {
            return Err(StoreError::not_found(PROJECT_NOT_FOUND));
        };
        if let Some(slug) = input.slug {
            project.slug = slug;
        }
        if let Some(name) = input.name {
            project.name = name;
        }
        if let Some(description) = input.description {
            project.description = description;
        }
        if let Some(color) = input.color {
            project.color = color;
        }
        Ok(())
    }

    /// Removes the project together with its todos and their comments.
    pub fn delete_project(&mut self, slug: &str) -> Result<(), StoreError> {
        let id = self.project_by_slug(slug)?.id;
        self.projects.remove(&id);
        let doomed: Vec<i64> = self
            .todos
            .values()
            .filter(|t| t.project_id == id)
            .map(|t| t.id)
            .collect();
        for todo_id in doomed {
            self.todos.remove(&todo_id);
            self.comments.retain(|_, c| c.todo_id != todo_id);
        }
        Ok(())
    }

    // --- todos ---

    /// Pending first, then high to low priority, then newest first.
    pub fn list_todos(&self, query: &TodoQuery) -> Vec<Todo> {
        let mut rows: Vec<&Todo> = self.todos.values().filter(|t| query.matches(t)).collect();
        rows.sort_by_key(|t| (t.completed, Reverse(t.priority), Reverse(t.created_at), Reverse(t.id)));
        rows.into_iter()
            .skip(query.offset)
            .take(query.limit)
            .map(|t| Todo {
                project: self.projects.get(&t.project_id).cloned(),
                ..t.clone()
            })
            .collect()
    }

    pub fn create_todo(&mut self, input: CreateTodo, now: DateTime<Utc>) -> Result<Todo, StoreError> {
        if input.title.is_empty() || input.author.is_empty() {
            return Err(StoreError::bad_request("Title and author are required"));
        }
        if !self.projects.contains_key(&input.project_id) {
            return Err(StoreError::bad_request(PROJECT_NOT_FOUND));
        }
        let todo = Todo {
            id: self.next_id(),
            project_id: input.project_id,
            title: input.title,
            description: input.description,
            completed: false,
            priority: input.priority.unwrap_or_default(),
            due_date: input.due_date,
            created_at: now,
            updated_at: now,
            author: input.author,
            project: None,
            comments: None,
        };
        self.todos.insert(todo.id, todo.clone());
        Ok(todo)
    }

    /// The todo with its project and its comments (oldest first) embedded.
    pub fn todo(&self, id: i64) -> Result<Todo, StoreError> {
        let todo = self
            .todos
            .get(&id)
            .ok_or(StoreError::not_found(TODO_NOT_FOUND))?;
        let comments = self.comments_for(id);
        Ok(Todo {
            project: self.projects.get(&todo.project_id).cloned(),
            comments: (!comments.is_empty()).then_some(comments),
            ..todo.clone()
        })
    }

    pub fn update_todo(&mut self, id: i64, input: UpdateTodo, now: DateTime<Utc>) -> Result<(), StoreError> {
        if input.is_empty() {
            return Err(StoreError::bad_request(NO_FIELDS));
        }
        let todo = self.todo_mut(id)?;
        if let Some(title) = input.title {
            todo.title = title;
        }
        if let Some(description) = input.description {
            todo.description = description;
        }
        if let Some(completed) = input.completed {
            todo.completed = completed;
        }
        if let Some(priority) = input.priority {
            todo.priority = priority;
        }
        if let Some(due_date) = input.due_date {
            todo.due_date = Some(due_date);
        }
        todo.updated_at = now;
        Ok(())
    }

    pub fn set_completed(&mut self, id: i64, completed: bool, now: DateTime<Utc>) -> Result<(), StoreError> {
        let todo = self.todo_mut(id)?;
        todo.completed = completed;
        todo.updated_at = now;
        Ok(())
    }

    pub fn delete_todo(&mut self, id: i64) -> Result<(), StoreError> {
        self.todos
            .remove(&id)
            .ok_or(StoreError::not_found(TODO_NOT_FOUND))?;
        self.comments.retain(|_, c| c.todo_id != id);
        Ok(())
    }

    // --- comments ---

    fn comments_for(&self, todo_id: i64) -> Vec<Comment> {
        let mut comments: Vec<Comment> = self
            .comments
            .values()
            .filter(|c| c.todo_id == todo_id)
            .cloned()
            .collect();
        comments.sort_by_key(|c| (c.created_at, c.id));
        comments
    }

    pub fn comments(&self, todo_id: i64) -> Result<Vec<Comment>, StoreError> {
        if !self.todos.contains_key(&todo_id) {
            return Err(StoreError::not_found(TODO_NOT_FOUND));
        }
        Ok(self.comments_for(todo_id))
    }

    pub fn create_comment(
        &mut self,
        todo_id: i64,
        input: CreateComment,
        now: DateTime<Utc>,
    ) -> Result<Comment, StoreError> {
        if input.content.is_empty() || input.author.is_empty() {
            return Err(StoreError::bad_request("Content and author are required"));
        }
        if !self.todos.contains_key(&todo_id) {
            return Err(StoreError::not_found(TODO_NOT_FOUND));
        }
        let comment = Comment {
            id: self.next_id(),
            todo_id,
            content: input.content,
            author: input.author,
            created_at: now,
        };
        self.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    pub fn delete_comment(&mut self, id: i64) -> Result<(), StoreError> {
        self.comments
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::not_found(COMMENT_NOT_FOUND))
    }

    // --- stats ---

    pub fn stats(&self, now: DateTime<Utc>) -> TodoStats {
        TodoStats::collect(self.todos.values(), now)
    }

    pub fn project_stats(&self, slug: &str, now: DateTime<Utc>) -> Result<TodoStats, StoreError> {
        let id = self.project_by_slug(slug)?.id;
        Ok(TodoStats::collect(
            self.todos.values().filter(|t| t.project_id == id),
            now,
        ))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    fn new_todo(store: &mut Store, title: &str, priority: Priority, at: DateTime<Utc>) -> i64 {
        store
            .create_todo(
                CreateTodo {
                    project_id: 1,
                    title: title.to_string(),
                    description: String::new(),
                    priority: Some(priority),
                    due_date: None,
                    author: "Ann".to_string(),
                },
                at,
            )
            .unwrap()
            .id
    }

    #[test]
    fn list_orders_pending_then_priority_then_newest() {
        let mut store = Store::with_default_project(t0());
        let low = new_todo(&mut store, "low", Priority::Low, t0());
        let high = new_todo(&mut store, "high", Priority::High, t0());
        let done = new_todo(&mut store, "done", Priority::High, t0());
        let newer_low = new_todo(&mut store, "newer low", Priority::Low, t0() + Duration::minutes(5));
        store.set_completed(done, true, t0()).unwrap();

        let ids: Vec<i64> = store.list_todos(&TodoQuery::default()).iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![high, newer_low, low, done]);
    }

    #[test]
    fn list_paginates_and_embeds_project() {
        let mut store = Store::with_default_project(t0());
        for i in 0..5 {
            new_todo(&mut store, &format!("t{i}"), Priority::Medium, t0() + Duration::minutes(i));
        }
        let query = TodoQuery {
            limit: 2,
            offset: 4,
            ..Default::default()
        };
        let page = store.list_todos(&query);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].title, "t0");
        assert_eq!(page[0].project.as_ref().unwrap().slug, "general");
    }

    #[test]
    fn list_params_fall_back_to_defaults() {
        let params = ListParams {
            limit: Some("500".to_string()),
            offset: Some("-1".to_string()),
            completed: Some("maybe".to_string()),
            search: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(TodoQuery::from(params), TodoQuery::default());
    }

    #[test]
    fn search_is_case_insensitive_over_title_and_description() {
        let mut store = Store::with_default_project(t0());
        new_todo(&mut store, "Buy MILK", Priority::Low, t0());
        new_todo(&mut store, "Walk dog", Priority::Low, t0());
        let query = TodoQuery {
            search: Some("milk".to_string()),
            ..Default::default()
        };
        assert_eq!(store.list_todos(&query).len(), 1);
    }

    #[test]
    fn duplicate_slug_conflicts() {
        let mut store = Store::with_default_project(t0());
        let dup = CreateProject {
            slug: "general".to_string(),
            name: "Again".to_string(),
            description: String::new(),
            color: String::new(),
        };
        let err = store.create_project(dup, t0()).unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[test]
    fn deleting_a_project_cascades() {
        let mut store = Store::with_default_project(t0());
        let id = new_todo(&mut store, "t", Priority::Low, t0());
        store
            .create_comment(
                id,
                CreateComment {
                    content: "c".to_string(),
                    author: "a".to_string(),
                },
                t0(),
            )
            .unwrap();
        store.delete_project("general").unwrap();
        assert!(store.list_todos(&TodoQuery::default()).is_empty());
        assert!(store.comments.is_empty());
        assert_eq!(store.stats(t0()).total, 0);
    }

    #[test]
    fn missing_todo_is_not_found() {
        let mut store = Store::default();
        assert_eq!(store.delete_todo(42).unwrap_err().message, "Todo not found");
        assert_eq!(
            store.set_completed(42, true, t0()).unwrap_err().status,
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn default_project_is_seeded_with_id_one() {
        let store = Store::with_default_project(t0());
        let project = store.project("general").unwrap();
        assert_eq!(project.id, 1);
        assert_eq!(project.color, DEFAULT_COLOR);
    }

    #[test]
    fn project_todo_counts() {
        let mut store = Store::with_default_project(t0());
        new_todo(&mut store, "a", Priority::Low, t0());
        new_todo(&mut store, "b", Priority::Low, t0());
        let projects = store.list_projects();
        assert_eq!(projects[0].todo_count, Some(2));
    }
}
