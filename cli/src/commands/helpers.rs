use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};

use ontrack_core::db::Database;

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            "tomorrow" => Ok(Local::now().date_naive() + chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

/// Resolve an analytics range from optional CLI args; both ends default to
/// today and are returned as ISO strings.
pub(crate) fn parse_range(start: Option<String>, end: Option<String>) -> Result<(String, String)> {
    let start = parse_date(start)?.format("%Y-%m-%d").to_string();
    let end = parse_date(end)?.format("%Y-%m-%d").to_string();
    Ok((start, end))
}

pub(crate) fn resolve_category(db: &Database, name: Option<&str>) -> Result<Option<i64>> {
    match name {
        None => Ok(None),
        Some(name) => match db.category_id_by_name(name)? {
            Some(id) => Ok(Some(id)),
            None => bail!("No category named '{name}'"),
        },
    }
}

pub(crate) fn resolve_task(db: &Database, name: Option<&str>) -> Result<Option<i64>> {
    match name {
        None => Ok(None),
        Some(name) => match db.task_id_by_name(name)? {
            Some(id) => Ok(Some(id)),
            None => bail!("No task named '{name}'"),
        },
    }
}

/// "135" -> "2h 15m" for human-readable durations.
pub(crate) fn format_minutes(minutes: i64) -> String {
    let sign = if minutes < 0 { "-" } else { "" };
    let abs = minutes.abs();
    let h = abs / 60;
    let m = abs % 60;
    if h == 0 {
        format!("{sign}{m}m")
    } else {
        format!("{sign}{h}h {m:02}m")
    }
}
