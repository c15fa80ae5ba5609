//! Stateless HTTP request builder and response parser for the todo API.
//!
//! # Design
//! `TodoClient` holds only a `base_url` (including the `/api` prefix) and
//! carries no mutable state between calls. Each endpoint is split into a
//! `build_*` method that produces an `HttpRequest` and a `parse_*` method
//! that consumes an `HttpResponse`. The caller executes the round-trip, so
//! every call is exactly one request with no retries and no caching here.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ApiError;
use crate::filter::TodoFilter;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    Comment, CreateCommentRequest, CreateProjectRequest, CreateTodoRequest, Project, Todo,
    TodoStats, UpdateProjectRequest, UpdateTodoRequest,
};

const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Synchronous, stateless client for the todo API.
#[derive(Debug, Clone)]
pub struct TodoClient {
    base_url: String,
}

impl TodoClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn project_url(&self, slug: &str, suffix: &str) -> String {
        let slug = utf8_percent_encode(slug, PATH_SEGMENT);
        self.url(&format!("/projects/{slug}{suffix}"))
    }

    // --- projects ---

    pub fn build_list_projects(&self) -> HttpRequest {
        HttpRequest::empty(HttpMethod::Get, self.url("/projects"))
    }

    pub fn build_create_project(&self, input: &CreateProjectRequest) -> Result<HttpRequest, ApiError> {
        Ok(HttpRequest::json(HttpMethod::Post, self.url("/projects"), to_body(input)?))
    }

    pub fn build_get_project(&self, slug: &str) -> HttpRequest {
        HttpRequest::empty(HttpMethod::Get, self.project_url(slug, ""))
    }

    pub fn build_update_project(
        &self,
        slug: &str,
        input: &UpdateProjectRequest,
    ) -> Result<HttpRequest, ApiError> {
        Ok(HttpRequest::json(HttpMethod::Put, self.project_url(slug, ""), to_body(input)?))
    }

    pub fn build_delete_project(&self, slug: &str) -> HttpRequest {
        HttpRequest::empty(HttpMethod::Delete, self.project_url(slug, ""))
    }

    pub fn build_get_project_stats(&self, slug: &str) -> HttpRequest {
        HttpRequest::empty(HttpMethod::Get, self.project_url(slug, "/stats"))
    }

    pub fn parse_list_projects(&self, response: HttpResponse) -> Result<Vec<Project>, ApiError> {
        parse_list(response)
    }

    pub fn parse_create_project(&self, response: HttpResponse) -> Result<Project, ApiError> {
        parse_json(response)
    }

    pub fn parse_get_project(&self, response: HttpResponse) -> Result<Project, ApiError> {
        parse_json(response)
    }

    pub fn parse_update_project(&self, response: HttpResponse) -> Result<(), ApiError> {
        parse_empty(response)
    }

    pub fn parse_delete_project(&self, response: HttpResponse) -> Result<(), ApiError> {
        parse_empty(response)
    }

    pub fn parse_get_project_stats(&self, response: HttpResponse) -> Result<TodoStats, ApiError> {
        parse_json(response)
    }

    // --- todos ---

    pub fn build_list_todos(&self, filter: &TodoFilter) -> HttpRequest {
        let query = filter.to_query_string();
        let url = if query.is_empty() {
            self.url("/todos")
        } else {
            self.url(&format!("/todos?{query}"))
        };
        HttpRequest::empty(HttpMethod::Get, url)
    }

    pub fn build_create_todo(&self, input: &CreateTodoRequest) -> Result<HttpRequest, ApiError> {
        Ok(HttpRequest::json(HttpMethod::Post, self.url("/todos"), to_body(input)?))
    }

    pub fn build_get_todo(&self, id: i64) -> HttpRequest {
        HttpRequest::empty(HttpMethod::Get, self.url(&format!("/todos/{id}")))
    }

    pub fn build_update_todo(&self, id: i64, input: &UpdateTodoRequest) -> Result<HttpRequest, ApiError> {
        Ok(HttpRequest::json(
            HttpMethod::Put,
            self.url(&format!("/todos/{id}")),
            to_body(input)?,
        ))
    }

    pub fn build_delete_todo(&self, id: i64) -> HttpRequest {
        HttpRequest::empty(HttpMethod::Delete, self.url(&format!("/todos/{id}")))
    }

    pub fn build_complete_todo(&self, id: i64) -> HttpRequest {
        HttpRequest::empty(HttpMethod::Post, self.url(&format!("/todos/{id}/complete")))
    }

    pub fn build_uncomplete_todo(&self, id: i64) -> HttpRequest {
        HttpRequest::empty(HttpMethod::Post, self.url(&format!("/todos/{id}/uncomplete")))
    }

    pub fn parse_list_todos(&self, response: HttpResponse) -> Result<Vec<Todo>, ApiError> {
        parse_list(response)
    }

    pub fn parse_create_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        parse_json(response)
    }

    pub fn parse_get_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        parse_json(response)
    }

    pub fn parse_update_todo(&self, response: HttpResponse) -> Result<(), ApiError> {
        parse_empty(response)
    }

    pub fn parse_delete_todo(&self, response: HttpResponse) -> Result<(), ApiError> {
        parse_empty(response)
    }

    pub fn parse_complete_todo(&self, response: HttpResponse) -> Result<(), ApiError> {
        parse_empty(response)
    }

    pub fn parse_uncomplete_todo(&self, response: HttpResponse) -> Result<(), ApiError> {
        parse_empty(response)
    }

    // --- comments ---

    pub fn build_list_comments(&self, todo_id: i64) -> HttpRequest {
        HttpRequest::empty(HttpMethod::Get, self.url(&format!("/todos/{todo_id}/comments")))
    }

    /// The todo id in the path is taken from the request body.
    pub fn build_create_comment(&self, input: &CreateCommentRequest) -> Result<HttpRequest, ApiError> {
        Ok(HttpRequest::json(
            HttpMethod::Post,
            self.url(&format!("/todos/{}/comments", input.todo_id)),
            to_body(input)?,
        ))
    }

    pub fn build_delete_comment(&self, id: i64) -> HttpRequest {
        HttpRequest::empty(HttpMethod::Delete, self.url(&format!("/comments/{id}")))
    }

    pub fn parse_list_comments(&self, response: HttpResponse) -> Result<Vec<Comment>, ApiError> {
        parse_list(response)
    }

    pub fn parse_create_comment(&self, response: HttpResponse) -> Result<Comment, ApiError> {
        parse_json(response)
    }

    pub fn parse_delete_comment(&self, response: HttpResponse) -> Result<(), ApiError> {
        parse_empty(response)
    }

    // --- stats ---

    pub fn build_get_stats(&self) -> HttpRequest {
        HttpRequest::empty(HttpMethod::Get, self.url("/stats"))
    }

    pub fn parse_get_stats(&self, response: HttpResponse) -> Result<TodoStats, ApiError> {
        parse_json(response)
    }
}

fn to_body<T: Serialize>(input: &T) -> Result<String, ApiError> {
    serde_json::to_string(input).map_err(|e| ApiError::Serialization(e.to_string()))
}

/// Any non-2xx status is a failure carrying the body text.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    Err(ApiError::from_status(response.status, &response.body))
}

fn parse_json<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    check_status(&response)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

/// Lists may come back as JSON `null` when the server has no rows.
fn parse_list<T: DeserializeOwned>(response: HttpResponse) -> Result<Vec<T>, ApiError> {
    let items: Option<Vec<T>> = parse_json(response)?;
    Ok(items.unwrap_or_default())
}

fn parse_empty(response: HttpResponse) -> Result<(), ApiError> {
    check_status(&response)
}
