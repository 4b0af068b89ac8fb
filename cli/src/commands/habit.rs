use anyhow::Result;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use ontrack_core::db::Database;
use ontrack_core::models::NewHabit;

pub(crate) fn cmd_habit_add(
    db: &Database,
    name: &str,
    habit_type: &str,
    target_hours: Option<i64>,
    target_value: Option<i64>,
    target_type: &str,
    json: bool,
) -> Result<()> {
    let id = db.insert_habit(&NewHabit {
        name: name.to_string(),
        habit_type: habit_type.to_string(),
        target_hours,
        target_value,
        target_type: target_type.to_string(),
    })?;

    if json {
        println!("{}", serde_json::json!({"id": id, "success": true}));
    } else {
        println!("Added habit '{name}' (id {id})");
    }
    Ok(())
}

pub(crate) fn cmd_habit_list(db: &Database, json: bool) -> Result<()> {
    let habits = db.list_habits()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&habits)?);
        return Ok(());
    }

    if habits.is_empty() {
        eprintln!("No habits yet");
        process::exit(2);
    }

    #[derive(Tabled)]
    struct HabitRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Type")]
        habit_type: String,
        #[tabled(rename = "Target")]
        target: String,
        #[tabled(rename = "Tracking")]
        target_type: String,
    }

    let rows: Vec<HabitRow> = habits
        .iter()
        .map(|h| HabitRow {
            id: h.id,
            name: h.name.clone(),
            habit_type: h.habit_type.clone(),
            target: match (h.target_hours, h.target_value) {
                (Some(hours), _) => format!("{hours}h"),
                (None, Some(value)) => value.to_string(),
                (None, None) => "-".to_string(),
            },
            target_type: h.target_type.clone(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(0..1)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_habit_delete(db: &Database, id: i64, json: bool) -> Result<()> {
    db.delete_habit(id)?;
    if json {
        println!("{}", serde_json::json!({"success": true}));
    } else {
        println!("Deleted habit {id} and its logs");
    }
    Ok(())
}

pub(crate) fn cmd_habit_progress(db: &Database, id: i64, json: bool) -> Result<()> {
    let progress = db.habit_progress(id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&progress)?);
        return Ok(());
    }

    let name = &progress.name;
    let total = progress.total_hours;
    match progress.target_hours {
        Some(target) => {
            #[allow(clippy::cast_precision_loss)]
            let pct = if target > 0 {
                total / target as f64 * 100.0
            } else {
                0.0
            };
            println!("{name}: {total:.1}h of {target}h ({pct:.0}%)");
        }
        None => println!("{name}: {total:.1}h logged (no target set)"),
    }
    Ok(())
}
