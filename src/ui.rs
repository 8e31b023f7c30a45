use colored::*;
use jiff::{Timestamp, tz::TimeZone};

use crate::models::{due_date::DueDate, priority::Priority, project::Project, todo::ToDo};

const MINUTES_IN_DAY: i64 = 1_440;
const MINUTES_IN_MONTH: i64 = 43_200;
const MINUTES_IN_TWO_MONTHS: i64 = 86_400;

/// Get the terminal width, defaulting to 80 if unavailable
fn get_terminal_width() -> usize {
    term_size::dimensions().map(|(w, _)| w).unwrap_or(80)
}

/// Get the appropriate status glyph for a todo
pub fn get_status_glyph(todo: &ToDo, is_overdue: bool) -> ColoredString {
    if todo.completed {
        "✓".dimmed()
    } else if is_overdue {
        "●".red()
    } else {
        "○".normal()
    }
}

fn colorize_priority(text: &str, priority: Priority) -> ColoredString {
    match priority {
        Priority::High => text.red(),
        Priority::Medium => text.yellow(),
        Priority::Low => text.green(),
    }
}

/// Approximate distance between two instants in words, e.g. "about 3 hours".
pub fn format_distance(from: Timestamp, to: Timestamp) -> String {
    let seconds = (to.as_second() - from.as_second()).abs();
    let minutes = (seconds as f64 / 60.0).round() as i64;

    let plural = |n: i64, unit: &str| {
        if n == 1 {
            format!("1 {}", unit)
        } else {
            format!("{} {}s", n, unit)
        }
    };

    if minutes < 2 {
        if minutes == 0 {
            "less than a minute".to_string()
        } else {
            "1 minute".to_string()
        }
    } else if minutes < 45 {
        plural(minutes, "minute")
    } else if minutes < 90 {
        "about 1 hour".to_string()
    } else if minutes < MINUTES_IN_DAY {
        let hours = (minutes as f64 / 60.0).round() as i64;
        format!("about {}", plural(hours, "hour"))
    } else if minutes < 2_520 {
        "1 day".to_string()
    } else if minutes < MINUTES_IN_MONTH {
        let days = (minutes as f64 / MINUTES_IN_DAY as f64).round() as i64;
        plural(days, "day")
    } else if minutes < MINUTES_IN_TWO_MONTHS {
        let months = (minutes as f64 / MINUTES_IN_MONTH as f64).round() as i64;
        format!("about {}", plural(months, "month"))
    } else {
        let months = minutes / MINUTES_IN_MONTH;
        if months < 12 {
            plural(months, "month")
        } else {
            let years = months / 12;
            match months % 12 {
                0..=2 => format!("about {}", plural(years, "year")),
                3..=8 => format!("over {}", plural(years, "year")),
                _ => format!("almost {}", plural(years + 1, "year")),
            }
        }
    }
}

/// Caption shown next to a todo: "2 days left", "3 hours ago".
pub fn due_caption(due: &DueDate, now: Timestamp, tz: &TimeZone) -> String {
    let Ok(due_at) = due.to_timestamp(tz) else {
        return due.to_string();
    };

    let distance = format_distance(now, due_at);
    match due_at.cmp(&now) {
        std::cmp::Ordering::Greater => format!("{} left", distance),
        std::cmp::Ordering::Less => format!("{} ago", distance),
        std::cmp::Ordering::Equal => distance,
    }
}

/// Check if a todo is overdue
pub fn is_overdue(todo: &ToDo, now: Timestamp, tz: &TimeZone) -> bool {
    if todo.completed {
        return false;
    }

    todo.due_date
        .to_timestamp(tz)
        .map(|due_at| due_at < now)
        .unwrap_or(false)
}

/// Render a single todo line with position, glyph, title, and right-aligned caption
pub fn render_todo_line(position: usize, todo: &ToDo, now: Timestamp, tz: &TimeZone) {
    let terminal_width = get_terminal_width();
    let overdue = is_overdue(todo, now, tz);

    let id_str = format!("{:>3}", position);
    let glyph = get_status_glyph(todo, overdue);
    let left_section = format!("  {}  {}  {}", id_str, glyph, todo.title);

    let styled_left = if todo.completed {
        left_section.dimmed()
    } else {
        left_section.bold()
    };

    let caption = format!("{} · {}", todo.priority, due_caption(&todo.due_date, now, tz));
    let styled_caption = if todo.completed {
        caption.dimmed()
    } else {
        colorize_priority(&caption, todo.priority)
    };

    let left_visible_len = format!("  {}  {}  {}", id_str, " ", todo.title).chars().count();
    let total_content = left_visible_len + caption.chars().count();

    if total_content + 4 < terminal_width {
        let padding = terminal_width - total_content - 2;
        println!("{}{}{}", styled_left, " ".repeat(padding), styled_caption);
    } else {
        // Not enough space for right alignment, just print normally
        println!("{}", styled_left);
        println!("       {}", styled_caption);
    }
}

/// Render a view header with title and count
pub fn render_view_header(title: &str, count: usize) {
    let todo_word = if count == 1 { "todo" } else { "todos" };
    println!("\n  {} ({} {})\n", title.cyan().bold(), count, todo_word);
}

/// Render the todos of the current project, or a hint when there is none
pub fn render_todos(project: Option<&Project>, now: Timestamp, tz: &TimeZone) {
    let Some(project) = project else {
        println!("No project selected");
        return;
    };

    render_view_header(&project.name, project.todos.len());
    if project.todos.is_empty() {
        println!("  {}", "Nothing to do".dimmed());
        return;
    }

    for (index, todo) in project.todos.iter().enumerate() {
        render_todo_line(index + 1, todo, now, tz);
    }
}

/// Render all projects, marking the current one
pub fn render_project_list(projects: &[Project], current: Option<usize>) {
    if projects.is_empty() {
        println!("No projects");
        return;
    }

    println!();
    for (index, project) in projects.iter().enumerate() {
        let open = project.todos.iter().filter(|t| !t.completed).count();
        let line = format!("{} ({} open)", project.name, open);
        if current == Some(index) {
            println!("  {} {}", "▸".cyan(), line.cyan().bold());
        } else {
            println!("    {}", line);
        }
    }
    println!();
}
