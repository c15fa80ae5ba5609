//! In-memory implementation of the todo REST API, mounted under `/api`.
//!
//! Errors are plain-text bodies with the status code, the way the production
//! server reports them.

pub mod models;
pub mod store;

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;

pub use models::{Comment, Priority, Project, Todo, TodoStats};
pub use store::{Store, StoreError, TodoQuery};

use models::{CreateComment, CreateProject, CreateTodo, ListParams, UpdateProject, UpdateTodo};

pub type Db = Arc<RwLock<Store>>;

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

type ApiResult<T> = Result<T, StoreError>;

/// Router over an empty store.
pub fn app() -> Router {
    app_with_store(Store::default())
}

pub fn app_with_store(store: Store) -> Router {
    let db: Db = Arc::new(RwLock::new(store));
    let api = Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/{slug}",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/projects/{slug}/stats", get(get_project_stats))
        .route("/todos", get(list_todos).post(create_todo))
        .route("/todos/{id}", get(get_todo).put(update_todo).delete(delete_todo))
        .route("/todos/{id}/complete", post(complete_todo))
        .route("/todos/{id}/uncomplete", post(uncomplete_todo))
        .route("/todos/{id}/comments", get(list_comments).post(create_comment))
        .route("/comments/{id}", delete(delete_comment))
        .route("/stats", get(get_stats))
        .with_state(db);
    Router::new().nest("/api", api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_store(listener, Store::default()).await
}

pub async fn run_with_store(listener: TcpListener, store: Store) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_store(store)).await
}

// --- projects ---

async fn list_projects(State(db): State<Db>) -> Json<Vec<Project>> {
    Json(db.read().await.list_projects())
}

async fn create_project(
    State(db): State<Db>,
    Json(input): Json<CreateProject>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let project = db.write().await.create_project(input, Utc::now())?;
    debug!(id = project.id, slug = %project.slug, "project created");
    Ok((StatusCode::CREATED, Json(project)))
}

async fn get_project(State(db): State<Db>, Path(slug): Path<String>) -> ApiResult<Json<Project>> {
    db.read().await.project(&slug).map(Json)
}

async fn update_project(
    State(db): State<Db>,
    Path(slug): Path<String>,
    Json(input): Json<UpdateProject>,
) -> ApiResult<StatusCode> {
    db.write().await.update_project(&slug, input)?;
    Ok(StatusCode::OK)
}

async fn delete_project(State(db): State<Db>, Path(slug): Path<String>) -> ApiResult<StatusCode> {
    db.write().await.delete_project(&slug)?;
    debug!(%slug, "project deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn get_project_stats(
    State(db): State<Db>,
    Path(slug): Path<String>,
) -> ApiResult<Json<TodoStats>> {
    db.read().await.project_stats(&slug, Utc::now()).map(Json)
}

// --- todos ---

async fn list_todos(State(db): State<Db>, Query(params): Query<ListParams>) -> Json<Vec<Todo>> {
    let query = TodoQuery::from(params);
    Json(db.read().await.list_todos(&query))
}

async fn create_todo(
    State(db): State<Db>,
    Json(input): Json<CreateTodo>,
) -> ApiResult<(StatusCode, Json<Todo>)> {
    let todo = db.write().await.create_todo(input, Utc::now())?;
    debug!(id = todo.id, "todo created");
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn get_todo(State(db): State<Db>, Path(id): Path<i64>) -> ApiResult<Json<Todo>> {
    db.read().await.todo(id).map(Json)
}

async fn update_todo(
    State(db): State<Db>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateTodo>,
) -> ApiResult<StatusCode> {
    db.write().await.update_todo(id, input, Utc::now())?;
    Ok(StatusCode::OK)
}

async fn complete_todo(State(db): State<Db>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    db.write().await.set_completed(id, true, Utc::now())?;
    Ok(StatusCode::OK)
}

async fn uncomplete_todo(State(db): State<Db>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    db.write().await.set_completed(id, false, Utc::now())?;
    Ok(StatusCode::OK)
}

async fn delete_todo(State(db): State<Db>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    db.write().await.delete_todo(id)?;
    debug!(id, "todo deleted");
    Ok(StatusCode::NO_CONTENT)
}

// --- comments ---

async fn list_comments(State(db): State<Db>, Path(id): Path<i64>) -> ApiResult<Json<Vec<Comment>>> {
    db.read().await.comments(id).map(Json)
}

async fn create_comment(
    State(db): State<Db>,
    Path(id): Path<i64>,
    Json(input): Json<CreateComment>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let comment = db.write().await.create_comment(id, input, Utc::now())?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn delete_comment(State(db): State<Db>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    db.write().await.delete_comment(id)?;
    Ok(StatusCode::NO_CONTENT)
}

// --- stats ---

async fn get_stats(State(db): State<Db>) -> Json<TodoStats> {
    Json(db.read().await.stats(Utc::now()))
}
