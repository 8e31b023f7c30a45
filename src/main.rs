use std::{path::PathBuf, thread, time::Duration};

use clap::{Parser, Subcommand};
use colored::*;
use jiff::{Timestamp, tz::TimeZone};
use log::{info, warn};
use slug::slugify;
use thiserror::Error;
use uuid::Uuid;

use projdo::{
    config::{Config, ConfigError},
    manager::{ManagerError, ProjectManager, RestoreOutcome},
    models::{
        due_date::DueDate,
        priority::Priority,
        project::Project,
        todo::{ToDo, ToDoEdit},
    },
    storage::{KeyValueStore, StorageError, json::JsonFileStore},
    ui,
};

#[derive(Parser)]
#[command(name = "projdo", about = "Projects and their todos, kept in a local store")]
struct Cli {
    /// Path to the config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data file to use instead of the configured one
    #[arg(long, global = true)]
    data_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the todos of the current project
    List,

    /// Add a todo
    Add {
        /// Todo title
        title: String,

        /// low, medium or high
        #[arg(short, long, default_value = "medium")]
        priority: Priority,

        /// Due date (e.g. "2025-03-01", "2025-03-01T14:30", "2025-03-01T14:30:00Z")
        #[arg(short, long)]
        due: DueDate,

        /// Add to this project instead of the current one
        #[arg(long)]
        project: Option<String>,
    },

    /// Toggle completion of a todo
    Done {
        /// Position of the todo in the current project
        position: usize,
    },

    /// Edit a todo
    Edit {
        /// Position of the todo in the current project
        position: usize,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        priority: Option<Priority>,

        #[arg(short, long)]
        due: Option<DueDate>,

        /// Project name recorded on the todo
        #[arg(long)]
        project: Option<String>,
    },

    /// Delete a todo
    Delete {
        /// Position of the todo in the current project
        position: usize,
    },

    /// Manage projects
    #[command(subcommand)]
    Project(ProjectCommands),

    /// Keep showing the current project, refreshing periodically
    Watch,
}

#[derive(Debug, Subcommand)]
enum ProjectCommands {
    /// Create a project and switch to it
    New { name: Option<String> },
    /// Delete a project
    Delete { name: String },
    /// Rename a project
    Rename { name: String, new_name: String },
    /// Switch the current project
    Use { name: String },
    /// List all projects
    List,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Manager(#[from] ManagerError),

    #[error("Could not compute a due date: {0}")]
    Time(#[from] jiff::Error),

    #[error("Project '{0}' not found")]
    ProjectNotFound(String),

    #[error("No todo at position {0} in the current project")]
    NoTodoAt(usize),
}

pub fn initialize_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_secs()
        .format_module_path(true)
        .init();
}

fn main() {
    initialize_logger();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = match cli.config.clone().or_else(Config::default_path) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    if let Some(data_file) = cli.data_file {
        config.data_file = data_file;
    }
    info!("Using data file {}", config.data_file.display());

    let storage =
        JsonFileStore::new(config.data_file.clone()).with_max_backups(config.max_backups);
    let mut manager = ProjectManager::new(storage)
        .with_storage_key(config.storage_key.clone())
        .with_id_policy(config.id_policy());

    load_or_seed(&mut manager)?;

    let tz = TimeZone::system();

    match cli.command.unwrap_or(Commands::List) {
        Commands::List => {
            ui::render_todos(manager.current_project(), Timestamp::now(), &tz);
        }
        Commands::Add {
            title,
            priority,
            due,
            project,
        } => {
            let todo_project = match &project {
                Some(query) => {
                    let index = resolve_project(&manager, query)?;
                    manager.projects()[index].name.clone()
                }
                None => manager
                    .current_project()
                    .map(|p| p.name.clone())
                    .ok_or(ManagerError::NoCurrentProject)?,
            };

            let todo = ToDo::new(title, priority, todo_project.clone(), due);
            if project.is_some() {
                manager.add_todo_to_project(&todo_project, todo)?;
            } else {
                manager.add_todo(todo)?;
            }
            println!("{} Added to {}", "✓".green(), todo_project.bold());
        }
        Commands::Done { position } => {
            let id = todo_id_at(&manager, position)?;
            let completed = manager.toggle_todo(id)?;
            let state = if completed { "done" } else { "open" };
            println!("{} Todo {} marked {}", "✓".green(), position, state);
        }
        Commands::Edit {
            position,
            title,
            priority,
            due,
            project,
        } => {
            let id = todo_id_at(&manager, position)?;
            let edit = {
                let current = manager
                    .current_project()
                    .and_then(|p| p.get_todo(id))
                    .ok_or(CliError::NoTodoAt(position))?;
                ToDoEdit {
                    title: title.unwrap_or_else(|| current.title.clone()),
                    priority: priority.unwrap_or(current.priority),
                    project: project.unwrap_or_else(|| current.project.clone()),
                    due_date: due.unwrap_or(current.due_date),
                }
            };
            manager.edit_todo(id, edit)?;
            println!("{} Todo {} updated", "✓".green(), position);
        }
        Commands::Delete { position } => {
            let id = todo_id_at(&manager, position)?;
            let todo = manager.delete_todo(id)?;
            println!("{} Deleted \"{}\"", "✓".green(), todo.title);
        }
        Commands::Project(command) => run_project_command(&mut manager, command)?,
        Commands::Watch => watch(&mut manager, &tz, config.refresh_interval_secs),
    }

    Ok(())
}

fn run_project_command<S: KeyValueStore>(
    manager: &mut ProjectManager<S>,
    command: ProjectCommands,
) -> Result<(), CliError> {
    match command {
        ProjectCommands::New { name } => {
            let index = manager.add_project(Project::new(name.unwrap_or_default()))?;
            println!(
                "{} Created project {}",
                "✓".green(),
                manager.projects()[index].name.bold()
            );
        }
        ProjectCommands::Delete { name } => {
            let index = resolve_project(manager, &name)?;
            let removed = manager.remove_project(index)?;
            println!("{} Deleted project {}", "✓".green(), removed.name.bold());
            if removed.todos.iter().any(|t| !t.completed) {
                println!("  {}", "Its open todos were deleted with it".dimmed());
            }
        }
        ProjectCommands::Rename { name, new_name } => {
            let index = resolve_project(manager, &name)?;
            manager.rename_project(index, &new_name)?;
            println!(
                "{} Renamed to {}",
                "✓".green(),
                manager.projects()[index].name.bold()
            );
        }
        ProjectCommands::Use { name } => {
            let index = resolve_project(manager, &name)?;
            manager.set_current_project(index)?;
            println!(
                "{} Now on {}",
                "✓".green(),
                manager.projects()[index].name.bold()
            );
        }
        ProjectCommands::List => {
            ui::render_project_list(manager.projects(), manager.current_project_index());
        }
    }

    Ok(())
}

/// Restores saved state and seeds the starter project when nothing usable
/// was saved.
fn load_or_seed<S: KeyValueStore>(manager: &mut ProjectManager<S>) -> Result<(), CliError> {
    match manager.restore()? {
        RestoreOutcome::Restored { projects } => info!("Loaded {} project(s)", projects),
        RestoreOutcome::NoSavedState => info!("Starting with no saved state"),
        RestoreOutcome::Discarded { reason } => {
            eprintln!(
                "{} Saved data could not be read and was ignored: {}",
                "Warning:".yellow().bold(),
                reason
            );
        }
    }

    if manager.projects_size() == 0 {
        manager.seed_default(DueDate::days_after(Timestamp::now(), 2)?)?;
    }
    Ok(())
}

/// Finds a project by exact name, falling back to a slug match so that
/// `work-stuff` finds "Work Stuff".
fn resolve_project<S: KeyValueStore>(
    manager: &ProjectManager<S>,
    query: &str,
) -> Result<usize, CliError> {
    if let Some(index) = manager.position_of(query) {
        return Ok(index);
    }

    let wanted = slugify(query);
    manager
        .projects()
        .iter()
        .position(|project| slugify(&project.name) == wanted)
        .ok_or_else(|| CliError::ProjectNotFound(query.to_string()))
}

fn todo_id_at<S: KeyValueStore>(
    manager: &ProjectManager<S>,
    position: usize,
) -> Result<Uuid, CliError> {
    let project = manager
        .current_project()
        .ok_or(ManagerError::NoCurrentProject)?;
    position
        .checked_sub(1)
        .and_then(|index| project.todos.get(index))
        .map(ToDo::id)
        .ok_or(CliError::NoTodoAt(position))
}

fn watch<S: KeyValueStore>(manager: &mut ProjectManager<S>, tz: &TimeZone, interval_secs: u64) {
    let interval = Duration::from_secs(interval_secs.max(1));

    loop {
        // Pick up changes written by other invocations.
        if let Err(e) = manager.restore() {
            warn!("Could not reload saved state: {}", e);
        }

        print!("\x1B[2J\x1B[H");
        ui::render_todos(manager.current_project(), Timestamp::now(), tz);

        thread::sleep(interval);
    }
}
