//! Plain-text rendering of core values.

use std::io::{self, Write};

use chrono::{DateTime, Utc};
use todo_core::view::{completion_percent, DashboardSummary};
use todo_core::{Comment, Project, Todo, TodoStats};

fn date(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

pub fn todo_row(out: &mut impl Write, todo: &Todo, now: DateTime<Utc>) -> io::Result<()> {
    let mark = if todo.completed { "x" } else { " " };
    write!(out, "[{mark}] #{} {} ({})", todo.id, todo.title, todo.priority.label())?;
    if let Some(due) = todo.due_date {
        write!(out, " due {}", date(due))?;
        if todo.is_overdue(now) {
            write!(out, " OVERDUE")?;
        }
    }
    if let Some(project) = &todo.project {
        write!(out, " [{}]", project.name)?;
    }
    writeln!(out, " by {}", todo.author)
}

pub fn todo_detail(out: &mut impl Write, todo: &Todo, now: DateTime<Utc>) -> io::Result<()> {
    todo_row(out, todo, now)?;
    if !todo.description.is_empty() {
        writeln!(out, "    {}", todo.description)?;
    }
    writeln!(
        out,
        "    created {} updated {}",
        date(todo.created_at),
        date(todo.updated_at)
    )?;
    let comments = todo.comments.as_deref().unwrap_or_default();
    if !comments.is_empty() {
        writeln!(out, "Comments:")?;
        for comment in comments {
            comment_row(out, comment)?;
        }
    }
    Ok(())
}

pub fn todo_list(out: &mut impl Write, todos: &[Todo], now: DateTime<Utc>) -> io::Result<()> {
    if todos.is_empty() {
        return writeln!(out, "No todos found");
    }
    for todo in todos {
        todo_row(out, todo, now)?;
    }
    Ok(())
}

pub fn project_row(out: &mut impl Write, project: &Project) -> io::Result<()> {
    writeln!(
        out,
        "{} ({}) {} todos {}",
        project.name,
        project.slug,
        project.todo_count_or_zero(),
        project.color
    )
}

pub fn project_detail(out: &mut impl Write, project: &Project) -> io::Result<()> {
    project_row(out, project)?;
    if !project.description.is_empty() {
        writeln!(out, "    {}", project.description)?;
    }
    writeln!(out, "    created {}", date(project.created_at))
}

pub fn comment_row(out: &mut impl Write, comment: &Comment) -> io::Result<()> {
    writeln!(
        out,
        "  #{} {} ({}): {}",
        comment.id,
        comment.author,
        date(comment.created_at),
        comment.content
    )
}

pub fn stats(out: &mut impl Write, stats: &TodoStats) -> io::Result<()> {
    writeln!(out, "Total Todos    {}", stats.total)?;
    writeln!(out, "Completed      {}", stats.completed)?;
    writeln!(out, "Pending        {}", stats.pending)?;
    writeln!(out, "High Priority  {}", stats.high_priority)?;
    writeln!(out, "Overdue        {}", stats.overdue)?;
    if let Some(percent) = completion_percent(stats) {
        writeln!(out, "Completion Rate {percent}%")?;
    }
    Ok(())
}

pub fn dashboard(out: &mut impl Write, summary: &DashboardSummary) -> io::Result<()> {
    writeln!(out, "Dashboard")?;
    writeln!(out)?;
    stats(out, &summary.stats)?;
    writeln!(out)?;
    writeln!(out, "Projects")?;
    if summary.projects.is_empty() {
        writeln!(out, "  none yet")?;
    }
    for project in summary.projects.iter() {
        write!(out, "  ")?;
        project_row(out, project)?;
    }
    Ok(())
}
