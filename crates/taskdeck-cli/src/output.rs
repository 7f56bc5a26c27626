//! Plain-text rendering of tasks for the terminal.

use taskdeck_core::models::{Task, TasksPage};

const TITLE_WIDTH: usize = 48;

/// Truncate a string to a maximum number of characters, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a timestamp from the backend as a short date
pub fn format_date(date: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date) {
        dt.format("%b %d, %Y").to_string()
    } else if date.len() >= 10 {
        date.chars().take(10).collect()
    } else {
        date.to_string()
    }
}

fn marker(task: &Task) -> &'static str {
    if task.is_completed() {
        "[x]"
    } else {
        "[ ]"
    }
}

/// One-line summary: `[x] <id>  <title>`
pub fn task_line(task: &Task) -> String {
    format!("{} {}  {}", marker(task), task.id, truncate_string(&task.title, TITLE_WIDTH))
}

pub fn print_tasks_page(page: &TasksPage) {
    if page.tasks.is_empty() {
        println!("No tasks found.");
    }
    for task in &page.tasks {
        println!("{}", task_line(task));
    }

    let p = &page.pagination;
    println!();
    println!("Page {} of {} ({} tasks)", p.page, p.total_pages.max(1), p.total);
    if p.has_next() {
        println!("Next: --page {}", p.page + 1);
    }
}

pub fn print_task(task: &Task) {
    println!("{} {}", marker(task), task.title);
    println!("  id:      {}", task.id);
    println!("  status:  {}", task.status);
    if let Some(description) = task.description.as_deref().filter(|d| !d.is_empty()) {
        println!("  notes:   {}", description);
    }
    println!("  created: {}", format_date(&task.created_at));
    println!("  updated: {}", format_date(&task.updated_at));
}
