use anyhow::Result;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use ontrack_core::db::Database;

use super::helpers::{format_minutes, parse_range, resolve_category};

pub(crate) fn cmd_analytics_categories(
    db: &Database,
    start: Option<String>,
    end: Option<String>,
    json: bool,
) -> Result<()> {
    let (start, end) = parse_range(start, end)?;
    let analytics = db.category_analytics(&start, &end)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analytics)?);
        return Ok(());
    }

    if analytics.categories.is_empty() {
        eprintln!("No categories for {start}..{end}");
        process::exit(2);
    }

    #[derive(Tabled)]
    struct CategoryRow {
        #[tabled(rename = "Category")]
        name: String,
        #[tabled(rename = "Time")]
        time: String,
        #[tabled(rename = "Hours")]
        hours: String,
        #[tabled(rename = "Blocks")]
        blocks: i64,
    }

    let rows: Vec<CategoryRow> = analytics
        .categories
        .iter()
        .map(|c| CategoryRow {
            name: c.name.clone(),
            time: format_minutes(c.total_minutes),
            hours: format!("{:.2}", c.total_hours),
            blocks: c.block_count,
        })
        .collect();

    println!("=== {start} .. {end} ===\n");
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    let total = format_minutes(analytics.total_minutes);
    println!("\nTotal: {total}");
    Ok(())
}

pub(crate) fn cmd_analytics_tasks(
    db: &Database,
    start: Option<String>,
    end: Option<String>,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    let (start, end) = parse_range(start, end)?;
    let category_id = resolve_category(db, category)?;
    let analytics = db.task_analytics(&start, &end, category_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analytics)?);
        return Ok(());
    }

    if analytics.tasks.is_empty() {
        eprintln!("No task activity for {start}..{end}");
        process::exit(2);
    }

    #[derive(Tabled)]
    struct TaskRow {
        #[tabled(rename = "Task")]
        name: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Time")]
        time: String,
        #[tabled(rename = "Blocks")]
        blocks: i64,
    }

    let rows: Vec<TaskRow> = analytics
        .tasks
        .iter()
        .map(|t| TaskRow {
            name: t.name.clone(),
            category: t.category_name.clone().unwrap_or_else(|| "-".to_string()),
            time: format_minutes(t.total_minutes),
            blocks: t.block_count,
        })
        .collect();

    println!("=== {start} .. {end} ===\n");
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    let total = format_minutes(analytics.total_minutes);
    println!("\nTotal: {total}");
    Ok(())
}

pub(crate) fn cmd_analytics_habits(
    db: &Database,
    start: Option<String>,
    end: Option<String>,
    json: bool,
) -> Result<()> {
    let (start, end) = parse_range(start, end)?;
    let analytics = db.habit_analytics(&start, &end)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analytics)?);
        return Ok(());
    }

    if analytics.habits.is_empty() {
        eprintln!("No habits yet");
        process::exit(2);
    }

    #[derive(Tabled)]
    struct HabitRow {
        #[tabled(rename = "Habit")]
        name: String,
        #[tabled(rename = "Logs")]
        logs: i64,
        #[tabled(rename = "Done")]
        done: i64,
        #[tabled(rename = "Rate")]
        rate: String,
        #[tabled(rename = "Avg %")]
        avg: String,
        #[tabled(rename = "Hours")]
        hours: String,
    }

    let rows: Vec<HabitRow> = analytics
        .habits
        .iter()
        .map(|h| HabitRow {
            name: h.name.clone(),
            logs: h.log_count,
            done: h.completed_count,
            rate: format!("{:.1}%", h.completion_rate),
            avg: format!("{:.1}", h.avg_completion),
            hours: format!("{:.2}", h.total_hours),
        })
        .collect();

    println!("=== {start} .. {end} ===\n");
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..6)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}
