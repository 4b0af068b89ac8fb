use anyhow::{Result, bail};
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use ontrack_core::db::Database;
use ontrack_core::models::{NewHabitLog, UpdateHabitLog};

use super::helpers::parse_date;

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_log_add(
    db: &Database,
    habit: &str,
    date: Option<String>,
    hours: Option<f64>,
    value: Option<i64>,
    completed: bool,
    percent: Option<i64>,
    notes: Option<String>,
    json: bool,
) -> Result<()> {
    let Some(habit_id) = db.habit_id_by_name(habit)? else {
        bail!("No habit named '{habit}'. Create it with `ontrack habit add`.");
    };
    let log_date = parse_date(date)?;

    let id = db.insert_log(&NewHabitLog {
        habit_id,
        log_date,
        hours_spent: hours,
        value,
        completed,
        completion_percentage: percent,
        notes: notes.unwrap_or_default(),
    })?;

    if json {
        println!("{}", serde_json::json!({"id": id, "success": true}));
    } else {
        let date = log_date.format("%Y-%m-%d");
        println!("Logged '{habit}' for {date} (id {id})");
    }
    Ok(())
}

pub(crate) fn cmd_log_list(db: &Database, date: Option<String>, json: bool) -> Result<()> {
    let date = parse_date(date)?;
    let logs = db.logs_for_date(date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&logs)?);
        return Ok(());
    }

    if logs.is_empty() {
        let date = date.format("%Y-%m-%d");
        eprintln!("No logs for {date}");
        process::exit(2);
    }

    #[derive(Tabled)]
    struct LogRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Habit")]
        habit: String,
        #[tabled(rename = "Hours")]
        hours: String,
        #[tabled(rename = "Done")]
        completed: String,
        #[tabled(rename = "%")]
        percent: String,
        #[tabled(rename = "Notes")]
        notes: String,
    }

    let rows: Vec<LogRow> = logs
        .iter()
        .map(|l| LogRow {
            id: l.id,
            habit: l.name.clone().unwrap_or_default(),
            hours: l.hours_spent.map_or("-".into(), |v| format!("{v:.1}")),
            completed: if l.completed { "yes" } else { "no" }.to_string(),
            percent: l
                .completion_percentage
                .map_or("-".into(), |v| v.to_string()),
            notes: l.notes.clone(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..3)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_log_update(
    db: &Database,
    id: i64,
    hours: Option<f64>,
    value: Option<i64>,
    completed: bool,
    percent: Option<i64>,
    notes: Option<String>,
    json: bool,
) -> Result<()> {
    // Whole-row replace, same defaults as insert.
    db.update_log(
        id,
        &UpdateHabitLog {
            hours_spent: hours,
            value,
            completed,
            completion_percentage: percent,
            notes: notes.unwrap_or_default(),
        },
    )?;

    if json {
        println!("{}", serde_json::json!({"success": true}));
    } else {
        println!("Updated log {id}");
    }
    Ok(())
}

pub(crate) fn cmd_log_delete(db: &Database, id: i64, json: bool) -> Result<()> {
    db.delete_log(id)?;
    if json {
        println!("{}", serde_json::json!({"success": true}));
    } else {
        println!("Deleted log {id}");
    }
    Ok(())
}
