//! Derived view logic: overdue detection, completion rate, paged list state,
//! the per-form edit toggle, and the dashboard summary.
//!
//! None of this renders anything. Hosts read these values and draw them.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::error::ApiError;
use crate::filter::TodoFilter;
use crate::query::QueryClient;
use crate::transport::Transport;
use crate::types::{CreateTodoRequest, Priority, Project, Todo, TodoStats, UpdateTodoRequest};

/// Incomplete, has a due date, and that date is strictly before `now`.
pub fn is_overdue(todo: &Todo, now: DateTime<Utc>) -> bool {
    match todo.due_date {
        Some(due) => !todo.completed && due < now,
        None => false,
    }
}

impl Todo {
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        is_overdue(self, now)
    }
}

/// `completed / total`, or `None` when there is nothing to measure.
pub fn completion_rate(stats: &TodoStats) -> Option<f64> {
    if stats.total <= 0 {
        return None;
    }
    Some((stats.completed as f64 / stats.total as f64).clamp(0.0, 1.0))
}

/// Completion rate as a whole percentage, rounded to nearest.
pub fn completion_percent(stats: &TodoStats) -> Option<u32> {
    completion_rate(stats).map(|rate| (rate * 100.0).round() as u32)
}

// ---------------------------------------------------------------------------
// Todo list
// ---------------------------------------------------------------------------

/// Filter state plus the rows currently on screen.
///
/// Changing any filter field starts over: offset is cleared and the next
/// page replaces the rows. `load_more` only moves the offset, and the page
/// it fetches is appended.
#[derive(Debug, Clone, Default)]
pub struct TodoListView {
    filter: TodoFilter,
    rows: Vec<Todo>,
    last_page_len: Option<usize>,
    append_next: bool,
}

impl TodoListView {
    pub fn new(filter: TodoFilter) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }

    /// The filter for the next fetch, paging included.
    pub fn filter(&self) -> &TodoFilter {
        &self.filter
    }

    pub fn rows(&self) -> &[Todo] {
        &self.rows
    }

    fn reset(&mut self) {
        self.filter.offset = None;
        self.rows.clear();
        self.last_page_len = None;
        self.append_next = false;
    }

    pub fn set_project(&mut self, project_id: Option<i64>) {
        self.filter.project_id = project_id;
        self.reset();
    }

    pub fn set_completed(&mut self, completed: Option<bool>) {
        self.filter.completed = completed;
        self.reset();
    }

    pub fn set_priority(&mut self, priority: Option<Priority>) {
        self.filter.priority = priority;
        self.reset();
    }

    pub fn set_author(&mut self, author: &str) {
        self.filter.author = non_empty(author);
        self.reset();
    }

    /// An empty search box clears the search.
    pub fn set_search(&mut self, search: &str) {
        self.filter.search = non_empty(search);
        self.reset();
    }

    /// A full last page means the server may have more.
    pub fn has_more(&self) -> bool {
        self.last_page_len
            .is_some_and(|len| len >= self.filter.page_size() as usize)
    }

    /// Advance to the next page; the page fetched next is appended.
    pub fn load_more(&mut self) {
        let offset = self.filter.offset.unwrap_or(0);
        self.filter.offset = Some(offset + self.filter.page_size());
        self.append_next = true;
    }

    pub fn apply_page(&mut self, page: &[Todo]) {
        if !self.append_next {
            self.rows.clear();
        }
        self.rows.extend_from_slice(page);
        self.last_page_len = Some(page.len());
        self.append_next = false;
    }

    /// Fetch the page for the current filter through the cache and apply it.
    pub fn load<T: Transport>(&mut self, client: &QueryClient<T>) -> Result<(), ApiError> {
        let page = client.todos(&self.filter)?;
        self.apply_page(&page);
        Ok(())
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

// ---------------------------------------------------------------------------
// Todo form
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("invalid due date `{0}` (expected YYYY-MM-DD)")]
    InvalidDueDate(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Field values of the create/edit form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoForm {
    pub project_id: i64,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    /// `YYYY-MM-DD`, RFC 3339, or empty for no due date.
    pub due_date: String,
    pub author: String,
}

impl Default for TodoForm {
    fn default() -> Self {
        Self {
            project_id: 1,
            title: String::new(),
            description: String::new(),
            priority: Priority::Medium,
            due_date: String::new(),
            author: "Student".to_string(),
        }
    }
}

impl TodoForm {
    pub fn from_todo(todo: &Todo) -> Self {
        Self {
            project_id: todo.project_id,
            title: todo.title.clone(),
            description: todo.description.clone(),
            priority: todo.priority,
            due_date: todo
                .due_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            author: todo.author.clone(),
        }
    }

    pub fn create_request(&self) -> Result<CreateTodoRequest, FormError> {
        if self.title.trim().is_empty() {
            return Err(FormError::Required("title"));
        }
        if self.author.trim().is_empty() {
            return Err(FormError::Required("author"));
        }
        Ok(CreateTodoRequest {
            project_id: self.project_id,
            title: self.title.clone(),
            description: self.description.clone(),
            priority: self.priority,
            due_date: parse_due_date(&self.due_date)?,
            author: self.author.clone(),
        })
    }

    /// Editing sends title, description, priority and due date; project and
    /// author are fixed once created.
    pub fn update_request(&self) -> Result<UpdateTodoRequest, FormError> {
        if self.title.trim().is_empty() {
            return Err(FormError::Required("title"));
        }
        Ok(UpdateTodoRequest {
            title: Some(self.title.clone()),
            description: Some(self.description.clone()),
            completed: None,
            priority: Some(self.priority),
            due_date: parse_due_date(&self.due_date)?,
        })
    }
}

/// Empty → no due date. A bare date means midnight UTC.
pub fn parse_due_date(input: &str) -> Result<Option<DateTime<Utc>>, FormError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()));
    }
    DateTime::parse_from_rfc3339(input)
        .map(|dt| Some(dt.with_timezone(&Utc)))
        .map_err(|_| FormError::InvalidDueDate(input.to_string()))
}

// ---------------------------------------------------------------------------
// Edit toggle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditorMode {
    #[default]
    Viewing,
    Editing { todo_id: i64, form: TodoForm },
}

/// Viewing/editing toggle of one todo form instance.
#[derive(Debug, Clone, Default)]
pub struct TodoEditor {
    mode: EditorMode,
}

impl TodoEditor {
    pub fn mode(&self) -> &EditorMode {
        &self.mode
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.mode, EditorMode::Editing { .. })
    }

    pub fn edit(&mut self, todo: &Todo) {
        self.mode = EditorMode::Editing {
            todo_id: todo.id,
            form: TodoForm::from_todo(todo),
        };
    }

    pub fn form_mut(&mut self) -> Option<&mut TodoForm> {
        match &mut self.mode {
            EditorMode::Editing { form, .. } => Some(form),
            EditorMode::Viewing => None,
        }
    }

    pub fn cancel(&mut self) {
        self.mode = EditorMode::Viewing;
    }

    /// Back to viewing after the host applied the edit itself.
    pub fn finish(&mut self) {
        self.mode = EditorMode::Viewing;
    }

    /// Send the edit. Returns to viewing only on success; on failure the form
    /// stays open with its values.
    pub fn submit<T: Transport>(&mut self, client: &QueryClient<T>) -> Result<(), SubmitError> {
        let EditorMode::Editing { todo_id, form } = &self.mode else {
            return Ok(());
        };
        let request = form.update_request()?;
        client.update_todo(*todo_id, &request)?;
        self.finish();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DashboardSummary {
    pub stats: Arc<TodoStats>,
    pub projects: Arc<Vec<Project>>,
}

impl DashboardSummary {
    /// Stats and projects are fetched in parallel; each lands in its own
    /// cache entry.
    pub fn load<T: Transport + Sync>(client: &QueryClient<T>) -> Result<Self, ApiError> {
        let (stats, projects) = std::thread::scope(|s| {
            let stats = s.spawn(|| client.stats());
            let projects = s.spawn(|| client.projects());
            (join(stats), join(projects))
        });
        Ok(Self {
            stats: stats?,
            projects: projects?,
        })
    }

    pub fn completion_percent(&self) -> Option<u32> {
        completion_percent(&self.stats)
    }
}

fn join<V>(handle: std::thread::ScopedJoinHandle<'_, Result<V, ApiError>>) -> Result<V, ApiError> {
    handle
        .join()
        .unwrap_or_else(|_| Err(ApiError::Transport("fetch thread panicked".to_string())))
}
