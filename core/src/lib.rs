//! Synchronous API client core for the todo service.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). On top of that sits a query
//! cache keyed by structural query identity, a `QueryClient` that routes
//! reads through the cache and invalidates it after successful mutations,
//! and the derived view logic hosts render from.
//!
//! # Design
//! - `TodoClient` is stateless; it holds only `base_url`.
//! - Each endpoint is split into `build_*` (produces request) and `parse_*`
//!   (consumes response), so the I/O boundary is explicit.
//! - The host supplies a [`Transport`] and owns the [`QueryCache`]; nothing
//!   here is a global.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod cache;
pub mod client;
pub mod error;
pub mod filter;
pub mod http;
pub mod keys;
pub mod query;
pub mod transport;
pub mod types;
pub mod view;

pub use cache::{CacheConfig, QueryCache, QueryKey, QueryState, QueryStatus};
pub use client::TodoClient;
pub use error::ApiError;
pub use filter::TodoFilter;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use query::QueryClient;
pub use transport::Transport;
pub use types::{
    Comment, CreateCommentRequest, CreateProjectRequest, CreateTodoRequest, Priority, Project,
    Todo, TodoStats, UpdateProjectRequest, UpdateTodoRequest,
};
pub use view::{DashboardSummary, TodoEditor, TodoForm, TodoListView};
