use anyhow::Result;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use ontrack_core::db::Database;
use ontrack_core::models::{NewTimeBlock, UpdateTimeBlock};

use super::helpers::{format_minutes, parse_date, resolve_category, resolve_task};

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_block_add(
    db: &Database,
    date: Option<String>,
    start: &str,
    end: &str,
    activity: &str,
    category: Option<&str>,
    task: Option<&str>,
    json: bool,
) -> Result<()> {
    let block_date = parse_date(date)?;
    let category_id = resolve_category(db, category)?;
    let task_id = resolve_task(db, task)?;

    let id = db.insert_block(&NewTimeBlock {
        block_date,
        start_time: start.to_string(),
        end_time: end.to_string(),
        activity: activity.to_string(),
        category_id,
        task_id,
    })?;

    if json {
        println!("{}", serde_json::json!({"id": id, "success": true}));
    } else {
        let date = block_date.format("%Y-%m-%d");
        println!("Added block '{activity}' {start}-{end} on {date} (id {id})");
    }
    Ok(())
}

pub(crate) fn cmd_block_list(db: &Database, date: Option<String>, json: bool) -> Result<()> {
    let date = parse_date(date)?;
    let day = db.blocks_for_date(date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&day)?);
        return Ok(());
    }

    if day.blocks.is_empty() {
        let date = date.format("%Y-%m-%d");
        eprintln!("No time blocks for {date}");
        process::exit(2);
    }

    #[derive(Tabled)]
    struct BlockRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Start")]
        start: String,
        #[tabled(rename = "End")]
        end: String,
        #[tabled(rename = "Activity")]
        activity: String,
        #[tabled(rename = "Duration")]
        duration: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Task")]
        task: String,
    }

    let rows: Vec<BlockRow> = day
        .blocks
        .iter()
        .map(|b| BlockRow {
            id: b.id,
            start: b.start_time.clone(),
            end: b.end_time.clone(),
            activity: b.activity.clone(),
            duration: format_minutes(b.duration_minutes),
            category: b.category_name.clone().unwrap_or_else(|| "-".to_string()),
            task: b.task_name.clone().unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(4..5)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    let total = format_minutes(day.total_minutes);
    println!("\nTotal tracked: {total}");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_block_update(
    db: &Database,
    id: i64,
    start: &str,
    end: &str,
    activity: &str,
    category: Option<&str>,
    task: Option<&str>,
    json: bool,
) -> Result<()> {
    let category_id = resolve_category(db, category)?;
    let task_id = resolve_task(db, task)?;

    db.update_block(
        id,
        &UpdateTimeBlock {
            start_time: start.to_string(),
            end_time: end.to_string(),
            activity: activity.to_string(),
            category_id,
            task_id,
        },
    )?;

    if json {
        println!("{}", serde_json::json!({"success": true}));
    } else {
        println!("Updated block {id}");
    }
    Ok(())
}

pub(crate) fn cmd_block_delete(db: &Database, id: i64, json: bool) -> Result<()> {
    db.delete_block(id)?;
    if json {
        println!("{}", serde_json::json!({"success": true}));
    } else {
        println!("Deleted block {id}");
    }
    Ok(())
}
