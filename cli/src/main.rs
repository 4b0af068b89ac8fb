mod commands;
mod config;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use crate::commands::{
    cmd_analytics_categories, cmd_analytics_habits, cmd_analytics_tasks, cmd_block_add,
    cmd_block_delete, cmd_block_list, cmd_block_update, cmd_category_add, cmd_category_delete,
    cmd_category_list, cmd_category_update, cmd_export_habits, cmd_export_timeblocks,
    cmd_habit_add, cmd_habit_delete, cmd_habit_list, cmd_habit_progress, cmd_import_habits,
    cmd_import_timeblocks, cmd_log_add, cmd_log_delete, cmd_log_list, cmd_log_update,
    cmd_task_add, cmd_task_delete, cmd_task_list, cmd_task_update,
};
use crate::config::Config;
use ontrack_core::db::Database;

#[derive(Parser)]
#[command(
    name = "ontrack",
    version,
    about = "A simple, local-first habit & time tracker",
    long_about = "Track daily habits, categorize your time in blocks, and pull\n\
                  analytics over any date range. Data lives in a local SQLite file."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage habits
    Habit {
        #[command(subcommand)]
        command: HabitCommands,
    },
    /// Record and review daily habit logs
    Log {
        #[command(subcommand)]
        command: LogCommands,
    },
    /// Manage time categories
    Category {
        #[command(subcommand)]
        command: CategoryCommands,
    },
    /// Manage tasks within categories
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Manage time blocks
    Block {
        #[command(subcommand)]
        command: BlockCommands,
    },
    /// Date-range rollups over tracked time and habits
    Analytics {
        #[command(subcommand)]
        command: AnalyticsCommands,
    },
    /// Export data to CSV
    Export {
        #[command(subcommand)]
        command: ExportCommands,
    },
    /// Import data from CSV
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
    },
}

#[derive(Subcommand)]
enum HabitCommands {
    /// Add a habit
    Add {
        /// Habit name
        name: String,
        /// Habit kind, e.g. daily or project
        #[arg(short = 't', long, default_value = "daily")]
        habit_type: String,
        /// Total hours target (for project habits)
        #[arg(long)]
        target_hours: Option<i64>,
        /// Numeric daily target (for value-tracked habits)
        #[arg(long)]
        target_value: Option<i64>,
        /// How completion is measured: binary, hours, value, percentage
        #[arg(long, default_value = "binary")]
        target_type: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all habits, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a habit and all of its logs
    Delete {
        /// Habit ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show accumulated hours against the habit's target
    Progress {
        /// Habit ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum LogCommands {
    /// Log a habit for a day
    Add {
        /// Habit name
        habit: String,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Hours spent
        #[arg(long)]
        hours: Option<f64>,
        /// Recorded value (for value-tracked habits)
        #[arg(long)]
        value: Option<i64>,
        /// Mark the habit completed
        #[arg(short, long)]
        completed: bool,
        /// Completion percentage (0-100)
        #[arg(long)]
        percent: Option<i64>,
        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List logs for a day (default: today)
    List {
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace a log entry's fields (unset flags reset to defaults)
    Update {
        /// Log ID
        id: i64,
        /// Hours spent
        #[arg(long)]
        hours: Option<f64>,
        /// Recorded value
        #[arg(long)]
        value: Option<i64>,
        /// Mark the habit completed
        #[arg(short, long)]
        completed: bool,
        /// Completion percentage (0-100)
        #[arg(long)]
        percent: Option<i64>,
        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a log entry
    Delete {
        /// Log ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum CategoryCommands {
    /// Add a category
    Add {
        /// Category name (unique)
        name: String,
        /// Display color, e.g. "#667eea"
        #[arg(long)]
        color: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all categories
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rename or recolor a category
    Update {
        /// Category ID
        id: i64,
        /// New name
        name: String,
        /// New display color
        #[arg(long)]
        color: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a category (refused while time blocks use it)
    Delete {
        /// Category ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum TaskCommands {
    /// Add a task
    Add {
        /// Task name (unique)
        name: String,
        /// Category to file it under
        #[arg(long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List tasks, optionally filtered by category
    List {
        /// Category name filter
        #[arg(long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rename or recategorize a task
    Update {
        /// Task ID
        id: i64,
        /// New name
        name: String,
        /// New category
        #[arg(long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a task (refused while time blocks use it)
    Delete {
        /// Task ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum BlockCommands {
    /// Add a time block
    Add {
        /// Start time (HH:MM)
        start: String,
        /// End time (HH:MM)
        end: String,
        /// What the time was spent on
        activity: String,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Category name
        #[arg(long)]
        category: Option<String>,
        /// Task name
        #[arg(long)]
        task: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List a day's blocks with the tracked-time total
    List {
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace a block's times, activity, and links (the date is fixed)
    Update {
        /// Block ID
        id: i64,
        /// Start time (HH:MM)
        start: String,
        /// End time (HH:MM)
        end: String,
        /// What the time was spent on
        activity: String,
        /// Category name
        #[arg(long)]
        category: Option<String>,
        /// Task name
        #[arg(long)]
        task: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a time block
    Delete {
        /// Block ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum AnalyticsCommands {
    /// Tracked time per category over a date range
    Categories {
        /// Range start (YYYY-MM-DD, default: today)
        #[arg(long)]
        start: Option<String>,
        /// Range end (YYYY-MM-DD, default: today)
        #[arg(long)]
        end: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Tracked time per task over a date range
    Tasks {
        /// Range start (YYYY-MM-DD, default: today)
        #[arg(long)]
        start: Option<String>,
        /// Range end (YYYY-MM-DD, default: today)
        #[arg(long)]
        end: Option<String>,
        /// Category name filter
        #[arg(long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Habit completion stats over a date range
    Habits {
        /// Range start (YYYY-MM-DD, default: today)
        #[arg(long)]
        start: Option<String>,
        /// Range end (YYYY-MM-DD, default: today)
        #[arg(long)]
        end: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ExportCommands {
    /// Export all habit logs to CSV
    Habits {
        /// Output path (default: timestamped file in the data directory)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Export all time blocks to CSV
    Timeblocks {
        /// Output path (default: timestamped file in the data directory)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ImportCommands {
    /// Import habit logs from a CSV export
    Habits {
        /// Path to the CSV file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import time blocks from a CSV export
    Timeblocks {
        /// Path to the CSV file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[allow(clippy::too_many_lines)]
async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let db = Database::open(&config.db_path)?;

    match cli.command {
        Commands::Habit { command } => match command {
            HabitCommands::Add {
                name,
                habit_type,
                target_hours,
                target_value,
                target_type,
                json,
            } => cmd_habit_add(
                &db,
                &name,
                &habit_type,
                target_hours,
                target_value,
                &target_type,
                json,
            ),
            HabitCommands::List { json } => cmd_habit_list(&db, json),
            HabitCommands::Delete { id, json } => cmd_habit_delete(&db, id, json),
            HabitCommands::Progress { id, json } => cmd_habit_progress(&db, id, json),
        },
        Commands::Log { command } => match command {
            LogCommands::Add {
                habit,
                date,
                hours,
                value,
                completed,
                percent,
                notes,
                json,
            } => cmd_log_add(
                &db, &habit, date, hours, value, completed, percent, notes, json,
            ),
            LogCommands::List { date, json } => cmd_log_list(&db, date, json),
            LogCommands::Update {
                id,
                hours,
                value,
                completed,
                percent,
                notes,
                json,
            } => cmd_log_update(&db, id, hours, value, completed, percent, notes, json),
            LogCommands::Delete { id, json } => cmd_log_delete(&db, id, json),
        },
        Commands::Category { command } => match command {
            CategoryCommands::Add { name, color, json } => {
                cmd_category_add(&db, &name, color.as_deref(), json)
            }
            CategoryCommands::List { json } => cmd_category_list(&db, json),
            CategoryCommands::Update {
                id,
                name,
                color,
                json,
            } => cmd_category_update(&db, id, &name, color.as_deref(), json),
            CategoryCommands::Delete { id, json } => cmd_category_delete(&db, id, json),
        },
        Commands::Task { command } => match command {
            TaskCommands::Add {
                name,
                category,
                json,
            } => cmd_task_add(&db, &name, category.as_deref(), json),
            TaskCommands::List { category, json } => cmd_task_list(&db, category.as_deref(), json),
            TaskCommands::Update {
                id,
                name,
                category,
                json,
            } => cmd_task_update(&db, id, &name, category.as_deref(), json),
            TaskCommands::Delete { id, json } => cmd_task_delete(&db, id, json),
        },
        Commands::Block { command } => match command {
            BlockCommands::Add {
                start,
                end,
                activity,
                date,
                category,
                task,
                json,
            } => cmd_block_add(
                &db,
                date,
                &start,
                &end,
                &activity,
                category.as_deref(),
                task.as_deref(),
                json,
            ),
            BlockCommands::List { date, json } => cmd_block_list(&db, date, json),
            BlockCommands::Update {
                id,
                start,
                end,
                activity,
                category,
                task,
                json,
            } => cmd_block_update(
                &db,
                id,
                &start,
                &end,
                &activity,
                category.as_deref(),
                task.as_deref(),
                json,
            ),
            BlockCommands::Delete { id, json } => cmd_block_delete(&db, id, json),
        },
        Commands::Analytics { command } => match command {
            AnalyticsCommands::Categories { start, end, json } => {
                cmd_analytics_categories(&db, start, end, json)
            }
            AnalyticsCommands::Tasks {
                start,
                end,
                category,
                json,
            } => cmd_analytics_tasks(&db, start, end, category.as_deref(), json),
            AnalyticsCommands::Habits { start, end, json } => {
                cmd_analytics_habits(&db, start, end, json)
            }
        },
        Commands::Export { command } => match command {
            ExportCommands::Habits { out } => cmd_export_habits(&db, &config.data_dir, out),
            ExportCommands::Timeblocks { out } => {
                cmd_export_timeblocks(&db, &config.data_dir, out)
            }
        },
        Commands::Import { command } => match command {
            ImportCommands::Habits { file, json } => cmd_import_habits(&db, &file, json),
            ImportCommands::Timeblocks { file, json } => cmd_import_timeblocks(&db, &file, json),
        },
        Commands::Serve { port, bind } => {
            server::start_server(db, port, &bind, config.data_dir).await
        }
    }
}
