//! Subcommand dispatch: each command drives the query client and renders the
//! result.

use std::io::Write;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use todo_core::view::{DashboardSummary, TodoEditor, TodoForm, TodoListView};
use todo_core::{
    CreateCommentRequest, CreateProjectRequest, QueryClient, Transport, UpdateProjectRequest,
};
use tracing::debug;

use crate::args::{
    AddTodoArgs, CommentCommand, Command, EditTodoArgs, ListArgs, ProjectCommand, TodoCommand,
};
use crate::render;

pub fn run<T: Transport + Sync>(
    client: &QueryClient<T>,
    command: Command,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Command::Dashboard => {
            let summary = DashboardSummary::load(client)?;
            render::dashboard(out, &summary)?;
        }
        Command::Todos { command } => todos(client, command, out)?,
        Command::Projects { command } => projects(client, command, out)?,
        Command::Comments { command } => comments(client, command, out)?,
    }
    Ok(())
}

fn todos<T: Transport>(client: &QueryClient<T>, command: TodoCommand, out: &mut impl Write) -> Result<()> {
    let now = Utc::now();
    match command {
        TodoCommand::List(args) => list_todos(client, &args, out)?,
        TodoCommand::Show { id } => {
            let todo = client.todo(id)?;
            render::todo_detail(out, &todo, now)?;
        }
        TodoCommand::Add(args) => {
            let todo = add_todo(client, args)?;
            write!(out, "Created ")?;
            render::todo_row(out, &todo, now)?;
        }
        TodoCommand::Edit(args) => {
            let id = args.id;
            edit_todo(client, args)?;
            writeln!(out, "Updated todo #{id}")?;
        }
        TodoCommand::Complete { id } => {
            client.complete_todo(id)?;
            writeln!(out, "Completed todo #{id}")?;
        }
        TodoCommand::Uncomplete { id } => {
            client.uncomplete_todo(id)?;
            writeln!(out, "Reopened todo #{id}")?;
        }
        TodoCommand::Toggle { id } => {
            let todo = client.todo(id)?;
            client.toggle_todo(&todo)?;
            let state = if todo.completed { "Reopened" } else { "Completed" };
            writeln!(out, "{state} todo #{id}")?;
        }
        TodoCommand::Delete { id } => {
            client.delete_todo(id)?;
            writeln!(out, "Deleted todo #{id}")?;
        }
    }
    Ok(())
}

fn list_todos<T: Transport>(client: &QueryClient<T>, args: &ListArgs, out: &mut impl Write) -> Result<()> {
    if args.pages == 0 {
        bail!("--pages must be at least 1");
    }
    let mut view = TodoListView::new(args.filter());
    view.load(client)?;
    for _ in 1..args.pages {
        if !view.has_more() {
            break;
        }
        view.load_more();
        view.load(client)?;
    }
    debug!(rows = view.rows().len(), more = view.has_more(), "todo list loaded");
    render::todo_list(out, view.rows(), Utc::now())?;
    if view.has_more() {
        writeln!(out, "(more available, raise --pages)")?;
    }
    Ok(())
}

fn add_todo<T: Transport>(client: &QueryClient<T>, args: AddTodoArgs) -> Result<todo_core::Todo> {
    let defaults = TodoForm::default();
    let form = TodoForm {
        project_id: args.project_id.unwrap_or(defaults.project_id),
        title: args.title,
        description: args.description.unwrap_or_default(),
        priority: args.priority.unwrap_or(defaults.priority),
        due_date: args.due.unwrap_or_default(),
        author: args.author.unwrap_or(defaults.author),
    };
    let request = form.create_request()?;
    Ok(client.create_todo(&request)?)
}

fn edit_todo<T: Transport>(client: &QueryClient<T>, args: EditTodoArgs) -> Result<()> {
    let todo = client.todo(args.id)?;
    let mut editor = TodoEditor::default();
    editor.edit(&todo);
    let form = editor
        .form_mut()
        .context("editor did not open the form")?;
    if let Some(title) = args.title {
        form.title = title;
    }
    if let Some(description) = args.description {
        form.description = description;
    }
    if let Some(priority) = args.priority {
        form.priority = priority;
    }
    if let Some(due) = args.due {
        form.due_date = due;
    }
    editor.submit(client)?;
    Ok(())
}

fn projects<T: Transport>(
    client: &QueryClient<T>,
    command: ProjectCommand,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        ProjectCommand::List => {
            let projects = client.projects()?;
            if projects.is_empty() {
                writeln!(out, "No projects yet")?;
            }
            for project in projects.iter() {
                render::project_row(out, project)?;
            }
        }
        ProjectCommand::Show { slug } => {
            let project = client.project(&slug)?;
            render::project_detail(out, &project)?;
        }
        ProjectCommand::Add {
            slug,
            name,
            description,
            color,
        } => {
            let project = client.create_project(&CreateProjectRequest {
                slug,
                name,
                description,
                color,
            })?;
            write!(out, "Created ")?;
            render::project_row(out, &project)?;
        }
        ProjectCommand::Edit {
            slug,
            new_slug,
            name,
            description,
            color,
        } => {
            let update = UpdateProjectRequest {
                slug: new_slug,
                name,
                description,
                color,
            };
            if update == UpdateProjectRequest::default() {
                bail!("nothing to update; pass --slug, --name, --description or --color");
            }
            client.update_project(&slug, &update)?;
            writeln!(out, "Updated project {slug}")?;
        }
        ProjectCommand::Delete { slug } => {
            client.delete_project(&slug)?;
            writeln!(out, "Deleted project {slug}")?;
        }
        ProjectCommand::Stats { slug } => {
            let stats = client.project_stats(&slug)?;
            render::stats(out, &stats)?;
        }
    }
    Ok(())
}

fn comments<T: Transport>(
    client: &QueryClient<T>,
    command: CommentCommand,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        CommentCommand::List { todo_id } => {
            let comments = client.comments(todo_id)?;
            if comments.is_empty() {
                writeln!(out, "No comments")?;
            }
            for comment in comments.iter() {
                render::comment_row(out, comment)?;
            }
        }
        CommentCommand::Add {
            todo_id,
            content,
            author,
        } => {
            let comment = client.create_comment(&CreateCommentRequest {
                todo_id,
                content,
                author,
            })?;
            writeln!(out, "Added comment #{} to todo #{todo_id}", comment.id)?;
        }
        CommentCommand::Delete { id } => {
            client.delete_comment(id)?;
            writeln!(out, "Deleted comment #{id}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use todo_core::{
        ApiError, CacheConfig, HttpRequest, HttpResponse, QueryCache, TodoClient,
    };

    use super::*;
    use crate::args::Cli;
    use clap::Parser;

    /// Answers every request with one canned response and records the URLs.
    struct Canned {
        status: u16,
        body: &'static str,
        seen: Mutex<Vec<String>>,
    }

    impl Transport for Canned {
        fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
            self.seen
                .lock()
                .unwrap()
                .push(format!("{} {}", request.method, request.url));
            Ok(HttpResponse::new(self.status, self.body))
        }
    }

    fn run_args(canned: &Canned, argv: &[&str]) -> (Result<()>, String) {
        let cli = Cli::try_parse_from(argv).unwrap();
        let client = QueryClient::new(
            TodoClient::new("http://api.test/api"),
            canned,
            Arc::new(QueryCache::new(CacheConfig::default())),
        );
        let mut out = Vec::new();
        let result = run(&client, cli.command, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    const ONE_TODO: &str = r#"[{"id":1,"project_id":1,"title":"Buy milk","description":"",
        "completed":false,"priority":"low","created_at":"2024-06-01T00:00:00Z",
        "updated_at":"2024-06-01T00:00:00Z","author":"Ann"}]"#;

    #[test]
    fn list_sends_filter_and_renders_rows() {
        let canned = Canned {
            status: 200,
            body: ONE_TODO,
            seen: Mutex::new(Vec::new()),
        };
        let (result, out) = run_args(
            &canned,
            &["todo", "todos", "list", "--author", "Ann", "--limit", "1", "--pages", "3"],
        );
        result.unwrap();
        assert!(out.contains("#1 Buy milk (Low Priority) by Ann"));
        assert_eq!(
            canned.seen.lock().unwrap().as_slice(),
            [
                "GET http://api.test/api/todos?author=Ann&limit=1",
                "GET http://api.test/api/todos?author=Ann&limit=1&offset=1",
                "GET http://api.test/api/todos?author=Ann&limit=1&offset=2",
            ]
        );
    }

    #[test]
    fn server_error_text_is_the_error_message() {
        let canned = Canned {
            status: 404,
            body: "Todo not found",
            seen: Mutex::new(Vec::new()),
        };
        let (result, _) = run_args(&canned, &["todo", "todos", "delete", "9"]);
        assert_eq!(result.unwrap_err().to_string(), "Todo not found");
    }

    #[test]
    fn invalid_form_never_reaches_the_server() {
        let canned = Canned {
            status: 201,
            body: "{}",
            seen: Mutex::new(Vec::new()),
        };
        let (result, _) = run_args(&canned, &["todo", "todos", "add", "x", "--due", "tomorrow"]);
        assert!(result.is_err());
        assert!(canned.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn empty_project_edit_is_rejected() {
        let canned = Canned {
            status: 200,
            body: "",
            seen: Mutex::new(Vec::new()),
        };
        let (result, _) = run_args(&canned, &["todo", "projects", "edit", "home"]);
        assert!(result.is_err());
        assert!(canned.seen.lock().unwrap().is_empty());
    }
}
