//! Query keys for every cached read.
//!
//! Keys are grouped under four roots (`projects`, `todos`, `comments`,
//! `stats`) so a mutation can invalidate a whole resource class by prefix.
//! Project stats sit under `stats` so `stats()` as a prefix covers them too.

use crate::cache::QueryKey;
use crate::filter::TodoFilter;

pub const PROJECTS: &str = "projects";
pub const TODOS: &str = "todos";
pub const COMMENTS: &str = "comments";
pub const STATS: &str = "stats";

pub fn projects() -> QueryKey {
    QueryKey::new(PROJECTS)
}

pub fn project(slug: &str) -> QueryKey {
    projects().with(slug)
}

pub fn todos_root() -> QueryKey {
    QueryKey::new(TODOS)
}

/// One key per distinct filter, paging included.
pub fn todos(filter: &TodoFilter) -> QueryKey {
    todos_root().with("list").with(filter.to_query_string())
}

pub fn todo(id: i64) -> QueryKey {
    todos_root().with("detail").with(id.to_string())
}

pub fn comments_root() -> QueryKey {
    QueryKey::new(COMMENTS)
}

pub fn comments(todo_id: i64) -> QueryKey {
    comments_root().with(todo_id.to_string())
}

pub fn stats() -> QueryKey {
    QueryKey::new(STATS)
}

pub fn project_stats(slug: &str) -> QueryKey {
    stats().with(slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_produce_distinct_keys() {
        let pending = TodoFilter {
            completed: Some(false),
            ..Default::default()
        };
        assert_ne!(todos(&pending), todos(&TodoFilter::default()));
        assert!(todos(&pending).starts_with(&todos_root()));
        assert!(todo(3).starts_with(&todos_root()));
    }

    #[test]
    fn stats_prefix_covers_project_stats() {
        assert!(project_stats("home").starts_with(&stats()));
        assert!(!project_stats("home").starts_with(&projects()));
    }
}
