use clap::{ArgAction, Args, Parser, Subcommand};
use todo_core::{Priority, TodoFilter};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:3000/api";

#[derive(Debug, Parser)]
#[command(name = "todo")]
#[command(about = "Manage todos, projects and comments over the todo API")]
pub struct Cli {
    /// Base URL of the API, including the `/api` prefix.
    #[arg(long, global = true, env = "TODO_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,
    /// Repeat for more log output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Overview of your todos and projects
    Dashboard,
    Todos {
        #[command(subcommand)]
        command: TodoCommand,
    },
    Projects {
        #[command(subcommand)]
        command: ProjectCommand,
    },
    Comments {
        #[command(subcommand)]
        command: CommentCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum TodoCommand {
    List(ListArgs),
    /// One todo with its project and comments
    Show { id: i64 },
    Add(AddTodoArgs),
    Edit(EditTodoArgs),
    Complete { id: i64 },
    Uncomplete { id: i64 },
    /// Complete a pending todo or reopen a completed one
    Toggle { id: i64 },
    Delete { id: i64 },
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(long)]
    pub project_id: Option<i64>,
    /// `true` for completed, `false` for pending; omit for all.
    #[arg(long)]
    pub completed: Option<bool>,
    #[arg(long)]
    pub priority: Option<Priority>,
    #[arg(long)]
    pub author: Option<String>,
    #[arg(long)]
    pub search: Option<String>,
    #[arg(long)]
    pub limit: Option<u32>,
    #[arg(long)]
    pub offset: Option<u32>,
    /// Number of pages to fetch, following "load more".
    #[arg(long, default_value_t = 1)]
    pub pages: u32,
}

impl ListArgs {
    /// Empty text fields count as "no filter", like a cleared input.
    pub fn filter(&self) -> TodoFilter {
        let text = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
        TodoFilter {
            project_id: self.project_id,
            completed: self.completed,
            priority: self.priority,
            author: text(&self.author),
            search: text(&self.search),
            limit: self.limit,
            offset: self.offset,
        }
    }
}

#[derive(Debug, Args)]
pub struct AddTodoArgs {
    pub title: String,
    #[arg(long)]
    pub project_id: Option<i64>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub priority: Option<Priority>,
    /// Due date as YYYY-MM-DD or RFC 3339.
    #[arg(long)]
    pub due: Option<String>,
    #[arg(long)]
    pub author: Option<String>,
}

#[derive(Debug, Args)]
pub struct EditTodoArgs {
    pub id: i64,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub priority: Option<Priority>,
    #[arg(long)]
    pub due: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum ProjectCommand {
    List,
    Show {
        slug: String,
    },
    Add {
        slug: String,
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Hex color; the server picks one when omitted.
        #[arg(long, default_value = "")]
        color: String,
    },
    Edit {
        slug: String,
        #[arg(long = "slug")]
        new_slug: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// Delete a project together with its todos
    Delete {
        slug: String,
    },
    Stats {
        slug: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum CommentCommand {
    List {
        todo_id: i64,
    },
    Add {
        todo_id: i64,
        content: String,
        #[arg(long, default_value = "Student")]
        author: String,
    },
    Delete {
        id: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_flags() {
        let cli = Cli::try_parse_from(["todo", "dashboard"]).unwrap();
        assert_eq!(cli.verbose, 0);
        assert!(matches!(cli.command, Command::Dashboard));
    }

    #[test]
    fn list_flags_build_a_filter() {
        let cli = Cli::try_parse_from([
            "todo",
            "todos",
            "list",
            "--completed",
            "false",
            "--priority",
            "high",
            "--search",
            "",
            "--limit",
            "10",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Command::Todos {
            command: TodoCommand::List(args),
        } = cli.command
        else {
            panic!("expected todos list");
        };
        let filter = args.filter();
        assert_eq!(filter.completed, Some(false));
        assert_eq!(filter.priority, Some(Priority::High));
        assert_eq!(filter.search, None);
        assert_eq!(filter.limit, Some(10));
        assert_eq!(args.pages, 1);
    }

    #[test]
    fn unknown_priority_is_rejected() {
        let result = Cli::try_parse_from(["todo", "todos", "add", "x", "--priority", "urgent"]);
        assert!(result.is_err());
    }

    #[test]
    fn project_edit_renames_with_slug_flag() {
        let cli =
            Cli::try_parse_from(["todo", "projects", "edit", "home", "--slug", "house"]).unwrap();
        let Command::Projects {
            command: ProjectCommand::Edit { slug, new_slug, .. },
        } = cli.command
        else {
            panic!("expected projects edit");
        };
        assert_eq!(slug, "home");
        assert_eq!(new_slug.as_deref(), Some("house"));
    }

    #[test]
    fn api_url_flag_overrides_default() {
        let cli = Cli::try_parse_from(["todo", "--api-url", "http://h:1/api", "projects", "list"])
            .unwrap();
        assert_eq!(cli.api_url, "http://h:1/api");
    }
}
