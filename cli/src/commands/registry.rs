use anyhow::Result;
use std::process;
use tabled::{Table, Tabled, settings::Style};

use ontrack_core::db::Database;
use ontrack_core::models::DEFAULT_CATEGORY_COLOR;

use super::helpers::resolve_category;

pub(crate) fn cmd_category_add(
    db: &Database,
    name: &str,
    color: Option<&str>,
    json: bool,
) -> Result<()> {
    let id = db.insert_category(name, color.unwrap_or(DEFAULT_CATEGORY_COLOR))?;
    if json {
        println!("{}", serde_json::json!({"id": id, "success": true}));
    } else {
        println!("Added category '{name}' (id {id})");
    }
    Ok(())
}

pub(crate) fn cmd_category_list(db: &Database, json: bool) -> Result<()> {
    let categories = db.list_categories()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&categories)?);
        return Ok(());
    }

    if categories.is_empty() {
        eprintln!("No categories yet");
        process::exit(2);
    }

    #[derive(Tabled)]
    struct CategoryRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Color")]
        color: String,
    }

    let rows: Vec<CategoryRow> = categories
        .iter()
        .map(|c| CategoryRow {
            id: c.id,
            name: c.name.clone(),
            color: c.color.clone(),
        })
        .collect();

    println!("{}", Table::new(&rows).with(Style::rounded()));
    Ok(())
}

pub(crate) fn cmd_category_update(
    db: &Database,
    id: i64,
    name: &str,
    color: Option<&str>,
    json: bool,
) -> Result<()> {
    db.update_category(id, name, color.unwrap_or(DEFAULT_CATEGORY_COLOR))?;
    if json {
        println!("{}", serde_json::json!({"success": true}));
    } else {
        println!("Updated category {id}");
    }
    Ok(())
}

pub(crate) fn cmd_category_delete(db: &Database, id: i64, json: bool) -> Result<()> {
    db.delete_category(id)?;
    if json {
        println!("{}", serde_json::json!({"success": true}));
    } else {
        println!("Deleted category {id}");
    }
    Ok(())
}

pub(crate) fn cmd_task_add(
    db: &Database,
    name: &str,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    let category_id = resolve_category(db, category)?;
    let id = db.insert_task(name, category_id)?;
    if json {
        println!("{}", serde_json::json!({"id": id, "success": true}));
    } else {
        println!("Added task '{name}' (id {id})");
    }
    Ok(())
}

pub(crate) fn cmd_task_list(db: &Database, category: Option<&str>, json: bool) -> Result<()> {
    let category_id = resolve_category(db, category)?;
    let tasks = db.list_tasks(category_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }

    if tasks.is_empty() {
        eprintln!("No tasks yet");
        process::exit(2);
    }

    #[derive(Tabled)]
    struct TaskRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Category")]
        category: String,
    }

    let rows: Vec<TaskRow> = tasks
        .iter()
        .map(|t| TaskRow {
            id: t.id,
            name: t.name.clone(),
            category: t.category_name.clone().unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    println!("{}", Table::new(&rows).with(Style::rounded()));
    Ok(())
}

pub(crate) fn cmd_task_update(
    db: &Database,
    id: i64,
    name: &str,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    let category_id = resolve_category(db, category)?;
    db.update_task(id, name, category_id)?;
    if json {
        println!("{}", serde_json::json!({"success": true}));
    } else {
        println!("Updated task {id}");
    }
    Ok(())
}

pub(crate) fn cmd_task_delete(db: &Database, id: i64, json: bool) -> Result<()> {
    db.delete_task(id)?;
    if json {
        println!("{}", serde_json::json!({"success": true}));
    } else {
        println!("Deleted task {id}");
    }
    Ok(())
}
