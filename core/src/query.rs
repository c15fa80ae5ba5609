//! Cached reads and invalidating mutations over a [`Transport`].
//!
//! # Design
//! `QueryClient` pairs the stateless [`TodoClient`] with a host transport and
//! an injected [`QueryCache`]. Reads go through the cache under the keys in
//! [`crate::keys`]. Mutations hit the network directly and, only after the
//! response parsed successfully, invalidate the query prefixes they affect.
//! A failed mutation invalidates nothing and hands its error back.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::{Lookup, QueryCache, QueryKey};
use crate::client::TodoClient;
use crate::error::ApiError;
use crate::filter::TodoFilter;
use crate::http::{HttpRequest, HttpResponse};
use crate::keys;
use crate::transport::Transport;
use crate::types::{
    Comment, CreateCommentRequest, CreateProjectRequest, CreateTodoRequest, Project, Todo,
    TodoStats, UpdateProjectRequest, UpdateTodoRequest,
};

pub struct QueryClient<T> {
    api: TodoClient,
    transport: T,
    cache: Arc<QueryCache>,
}

impl<T: Transport> QueryClient<T> {
    pub fn new(api: TodoClient, transport: T, cache: Arc<QueryCache>) -> Self {
        Self {
            api,
            transport,
            cache,
        }
    }

    pub fn api(&self) -> &TodoClient {
        &self.api
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = %request.method, url = %request.url, "sending request");
        self.transport.execute(request)
    }

    fn query<V, F>(&self, key: QueryKey, fetch: F) -> Result<Arc<V>, ApiError>
    where
        V: Send + Sync + 'static,
        F: FnOnce(&Self) -> Result<V, ApiError>,
    {
        match self.cache.lookup::<V>(&key)? {
            Lookup::Fresh(value) => Ok(value),
            Lookup::Join(pending) => pending.wait(&key),
            Lookup::Fetch(ticket) => {
                let result = fetch(self);
                self.cache.resolve(ticket, result)
            }
        }
    }

    fn mutate<V, F>(&self, name: &'static str, invalidates: &[QueryKey], run: F) -> Result<V, ApiError>
    where
        F: FnOnce(&Self) -> Result<V, ApiError>,
    {
        match run(self) {
            Ok(value) => {
                for prefix in invalidates {
                    self.cache.invalidate(prefix);
                }
                Ok(value)
            }
            Err(err) => {
                warn!(mutation = name, error = %err, "mutation failed");
                Err(err)
            }
        }
    }

    // --- reads ---

    pub fn projects(&self) -> Result<Arc<Vec<Project>>, ApiError> {
        self.query(keys::projects(), |c| {
            c.api.parse_list_projects(c.send(c.api.build_list_projects())?)
        })
    }

    pub fn project(&self, slug: &str) -> Result<Arc<Project>, ApiError> {
        self.query(keys::project(slug), |c| {
            c.api.parse_get_project(c.send(c.api.build_get_project(slug))?)
        })
    }

    pub fn todos(&self, filter: &TodoFilter) -> Result<Arc<Vec<Todo>>, ApiError> {
        self.query(keys::todos(filter), |c| {
            c.api.parse_list_todos(c.send(c.api.build_list_todos(filter))?)
        })
    }

    pub fn todo(&self, id: i64) -> Result<Arc<Todo>, ApiError> {
        self.query(keys::todo(id), |c| c.api.parse_get_todo(c.send(c.api.build_get_todo(id))?))
    }

    pub fn comments(&self, todo_id: i64) -> Result<Arc<Vec<Comment>>, ApiError> {
        self.query(keys::comments(todo_id), |c| {
            c.api.parse_list_comments(c.send(c.api.build_list_comments(todo_id))?)
        })
    }

    pub fn stats(&self) -> Result<Arc<TodoStats>, ApiError> {
        self.query(keys::stats(), |c| c.api.parse_get_stats(c.send(c.api.build_get_stats())?))
    }

    pub fn project_stats(&self, slug: &str) -> Result<Arc<TodoStats>, ApiError> {
        self.query(keys::project_stats(slug), |c| {
            c.api.parse_get_project_stats(c.send(c.api.build_get_project_stats(slug))?)
        })
    }

    // --- project mutations ---

    pub fn create_project(&self, input: &CreateProjectRequest) -> Result<Project, ApiError> {
        self.mutate("create_project", &[keys::projects()], |c| {
            c.api.parse_create_project(c.send(c.api.build_create_project(input)?)?)
        })
    }

    /// A slug rename also moves the per-project stats key.
    pub fn update_project(&self, slug: &str, input: &UpdateProjectRequest) -> Result<(), ApiError> {
        let mut invalidates = vec![keys::projects()];
        if input.slug.is_some() {
            invalidates.push(keys::stats());
        }
        self.mutate("update_project", &invalidates, |c| {
            c.api.parse_update_project(c.send(c.api.build_update_project(slug, input)?)?)
        })
    }

    /// Deleting a project takes its todos and comments with it.
    pub fn delete_project(&self, slug: &str) -> Result<(), ApiError> {
        let invalidates = [
            keys::projects(),
            keys::todos_root(),
            keys::comments_root(),
            keys::stats(),
        ];
        self.mutate("delete_project", &invalidates, |c| {
            c.api.parse_delete_project(c.send(c.api.build_delete_project(slug))?)
        })
    }

    // --- todo mutations ---

    pub fn create_todo(&self, input: &CreateTodoRequest) -> Result<Todo, ApiError> {
        let invalidates = [keys::todos_root(), keys::stats(), keys::projects()];
        self.mutate("create_todo", &invalidates, |c| {
            c.api.parse_create_todo(c.send(c.api.build_create_todo(input)?)?)
        })
    }

    pub fn update_todo(&self, id: i64, input: &UpdateTodoRequest) -> Result<(), ApiError> {
        self.mutate("update_todo", &[keys::todos_root(), keys::stats()], |c| {
            c.api.parse_update_todo(c.send(c.api.build_update_todo(id, input)?)?)
        })
    }

    pub fn delete_todo(&self, id: i64) -> Result<(), ApiError> {
        let invalidates = [keys::todos_root(), keys::stats(), keys::projects()];
        self.mutate("delete_todo", &invalidates, |c| {
            c.api.parse_delete_todo(c.send(c.api.build_delete_todo(id))?)
        })
    }

    pub fn complete_todo(&self, id: i64) -> Result<(), ApiError> {
        self.mutate("complete_todo", &[keys::todos_root(), keys::stats()], |c| {
            c.api.parse_complete_todo(c.send(c.api.build_complete_todo(id))?)
        })
    }

    pub fn uncomplete_todo(&self, id: i64) -> Result<(), ApiError> {
        self.mutate("uncomplete_todo", &[keys::todos_root(), keys::stats()], |c| {
            c.api.parse_uncomplete_todo(c.send(c.api.build_uncomplete_todo(id))?)
        })
    }

    /// Flip completion based on the state the caller is looking at.
    pub fn toggle_todo(&self, todo: &Todo) -> Result<(), ApiError> {
        if todo.completed {
            self.uncomplete_todo(todo.id)
        } else {
            self.complete_todo(todo.id)
        }
    }

    // --- comment mutations ---

    pub fn create_comment(&self, input: &CreateCommentRequest) -> Result<Comment, ApiError> {
        self.mutate("create_comment", &[keys::comments(input.todo_id), keys::todos_root()], |c| {
            c.api.parse_create_comment(c.send(c.api.build_create_comment(input)?)?)
        })
    }

    pub fn delete_comment(&self, id: i64) -> Result<(), ApiError> {
        self.mutate("delete_comment", &[keys::comments_root(), keys::todos_root()], |c| {
            c.api.parse_delete_comment(c.send(c.api.build_delete_comment(id))?)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use parking_lot::Mutex;

    use super::*;
    use crate::cache::QueryStatus;
    use crate::http::HttpMethod;

    const STATS_JSON: &str =
        r#"{"total":2,"completed":1,"pending":1,"high_priority":0,"overdue":0}"#;

    /// Replies with queued responses in order and records every request.
    #[derive(Default)]
    struct Scripted {
        replies: Mutex<VecDeque<Result<HttpResponse, ApiError>>>,
        seen: Mutex<Vec<(HttpMethod, String)>>,
    }

    impl Scripted {
        fn reply(self, status: u16, body: &str) -> Self {
            self.replies.lock().push_back(Ok(HttpResponse::new(status, body)));
            self
        }

        fn fail(self, message: &str) -> Self {
            self.replies
                .lock()
                .push_back(Err(ApiError::Transport(message.to_string())));
            self
        }

        fn urls(&self) -> Vec<String> {
            self.seen.lock().iter().map(|(m, u)| format!("{m} {u}")).collect()
        }
    }

    impl Transport for Scripted {
        fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
            self.seen.lock().push((request.method, request.url));
            self.replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(HttpResponse::new(599, "no scripted reply")))
        }
    }

    fn client(transport: Scripted) -> QueryClient<Scripted> {
        QueryClient::new(
            TodoClient::new("http://api.test/api"),
            transport,
            Arc::new(QueryCache::default()),
        )
    }

    #[test]
    fn second_read_is_served_from_cache() {
        let qc = client(Scripted::default().reply(200, STATS_JSON));
        assert_eq!(qc.stats().unwrap().total, 2);
        assert_eq!(qc.stats().unwrap().total, 2);
        assert_eq!(qc.transport.urls(), vec!["GET http://api.test/api/stats"]);
    }

    #[test]
    fn distinct_filters_are_cached_separately() {
        let qc = client(Scripted::default().reply(200, "[]").reply(200, "[]"));
        qc.todos(&TodoFilter::default()).unwrap();
        let pending = TodoFilter {
            completed: Some(false),
            ..Default::default()
        };
        qc.todos(&pending).unwrap();
        qc.todos(&pending).unwrap();
        assert_eq!(
            qc.transport.urls(),
            vec![
                "GET http://api.test/api/todos",
                "GET http://api.test/api/todos?completed=false",
            ]
        );
    }

    #[test]
    fn successful_mutation_invalidates_todos_and_stats() {
        let qc = client(
            Scripted::default()
                .reply(200, "[]")
                .reply(200, STATS_JSON)
                .reply(200, "")
                .reply(200, "[]")
                .reply(200, STATS_JSON),
        );
        qc.todos(&TodoFilter::default()).unwrap();
        qc.stats().unwrap();

        qc.complete_todo(1).unwrap();

        qc.todos(&TodoFilter::default()).unwrap();
        qc.stats().unwrap();
        assert_eq!(
            qc.transport.urls(),
            vec![
                "GET http://api.test/api/todos",
                "GET http://api.test/api/stats",
                "POST http://api.test/api/todos/1/complete",
                "GET http://api.test/api/todos",
                "GET http://api.test/api/stats",
            ]
        );
    }

    #[test]
    fn slug_rename_refreshes_project_stats() {
        let qc = client(
            Scripted::default()
                .reply(200, STATS_JSON)
                .reply(200, STATS_JSON)
                .reply(204, "")
                .reply(200, STATS_JSON),
        );
        qc.project_stats("home").unwrap();
        qc.stats().unwrap();

        let rename = UpdateProjectRequest {
            slug: Some("house".to_string()),
            ..Default::default()
        };
        qc.update_project("home", &rename).unwrap();
        qc.project_stats("home").unwrap();
        assert_eq!(qc.transport.urls().len(), 4);
        assert!(qc.cache().state::<TodoStats>(&keys::stats()).stale);
    }

    #[test]
    fn project_rename_without_slug_change_keeps_stats() {
        let qc = client(Scripted::default().reply(200, STATS_JSON).reply(204, ""));
        qc.project_stats("home").unwrap();

        let rename = UpdateProjectRequest {
            name: Some("Household".to_string()),
            ..Default::default()
        };
        qc.update_project("home", &rename).unwrap();
        qc.project_stats("home").unwrap();
        assert_eq!(qc.transport.urls().len(), 2);
    }

    #[test]
    fn failed_mutation_invalidates_nothing() {
        let qc = client(Scripted::default().reply(200, "[]").reply(404, "Todo not found"));
        qc.todos(&TodoFilter::default()).unwrap();

        let err = qc.delete_todo(99).unwrap_err();
        assert_eq!(err.to_string(), "Todo not found");

        qc.todos(&TodoFilter::default()).unwrap();
        assert_eq!(qc.transport.urls().len(), 2);
    }

    #[test]
    fn failed_refetch_keeps_previous_data() {
        let qc = client(Scripted::default().reply(200, STATS_JSON).fail("connection refused"));
        qc.stats().unwrap();
        qc.cache().invalidate(&keys::stats());

        let err = qc.stats().unwrap_err();
        assert_eq!(err.to_string(), "connection refused");

        let state = qc.cache().state::<TodoStats>(&keys::stats());
        assert_eq!(state.status, QueryStatus::Error);
        assert_eq!(state.data.unwrap().total, 2);
    }

    #[test]
    fn toggle_picks_the_transition_from_current_state() {
        let todo: Todo = serde_json::from_str(
            r#"{"id":5,"project_id":1,"title":"t","description":"","completed":true,"priority":"low","created_at":"2024-05-01T10:00:00Z","updated_at":"2024-05-01T10:00:00Z","author":"a"}"#,
        )
        .unwrap();
        let qc = client(Scripted::default().reply(200, "").reply(200, ""));
        qc.toggle_todo(&todo).unwrap();
        qc.toggle_todo(&Todo {
            completed: false,
            ..todo
        })
        .unwrap();
        assert_eq!(
            qc.transport.urls(),
            vec![
                "POST http://api.test/api/todos/5/uncomplete",
                "POST http://api.test/api/todos/5/complete",
            ]
        );
    }

    #[test]
    fn comment_mutations_refresh_comment_lists() {
        let qc = client(
            Scripted::default()
                .reply(200, "[]")
                .reply(
                    201,
                    r#"{"id":1,"todo_id":4,"content":"hi","author":"a","created_at":"2024-05-01T10:00:00Z"}"#,
                )
                .reply(200, "[]"),
        );
        qc.comments(4).unwrap();
        qc.create_comment(&CreateCommentRequest {
            todo_id: 4,
            content: "hi".to_string(),
            author: "a".to_string(),
        })
        .unwrap();
        qc.comments(4).unwrap();
        assert_eq!(qc.transport.urls().len(), 3);
    }

    #[test]
    fn parallel_reads_fill_independent_entries() {
        let qc = client(Scripted::default());
        qc.cache().set(&keys::projects(), Vec::<Project>::new());
        qc.transport.replies.lock().push_back(Ok(HttpResponse::new(200, STATS_JSON)));

        let (stats, projects) = std::thread::scope(|s| {
            let stats = s.spawn(|| qc.stats());
            let projects = s.spawn(|| qc.projects());
            (stats.join().unwrap(), projects.join().unwrap())
        });
        assert_eq!(stats.unwrap().completed, 1);
        assert!(projects.unwrap().is_empty());
    }
}
